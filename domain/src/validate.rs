//! Field-level validation. Each check appends to a violation list instead of
//! failing fast, so callers can report every broken field at once.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::{Adresse, Interesse, Umsatz, Violation, MAX_KATEGORIE, MIN_KATEGORIE};

/// Postal code: exactly five digits, leading zeros allowed.
pub const PLZ_PATTERN: &str = r"^\d{5}$";

static PLZ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(PLZ_PATTERN).expect("valid plz regex"));

static CURRENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"));

/// Entities that can check their own constraints.
pub trait Validate {
    /// Collect all constraint violations. `today` anchors `Past` checks.
    fn validate(&self, today: NaiveDate) -> Vec<Violation>;
}

/// Accumulates violations across several checks.
#[derive(Debug, Default)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: &str, constraint: &'static str, message: impl Into<String>) {
        self.0.push(Violation {
            path: path.to_string(),
            constraint,
            message: message.into(),
        });
    }

    pub fn not_empty(&mut self, path: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(path, "NotEmpty", "must not be empty");
        }
    }

    pub fn pattern(&mut self, path: &str, value: &str, re: &Regex) {
        if !re.is_match(value) {
            self.push(path, "Pattern", format!("must match \"{}\"", re.as_str()));
        }
    }

    /// Lightweight email check: one `@`, non-empty local part, dotted domain
    /// without whitespace. Full RFC 5322 compliance is not attempted.
    pub fn email(&mut self, path: &str, value: &str) {
        if value.is_empty() {
            self.push(path, "NotNull", "must not be null");
            return;
        }
        if !is_well_formed_email(value) {
            self.push(path, "Email", "must be a well-formed email address");
        }
    }

    pub fn range(&mut self, path: &str, value: i32, min: i32, max: i32) {
        if value < min {
            self.push(path, "Min", format!("must be greater than or equal to {}", min));
        }
        if value > max {
            self.push(path, "Max", format!("must be less than or equal to {}", max));
        }
    }

    pub fn kategorie(&mut self, value: i32) {
        self.range("kategorie", value, MIN_KATEGORIE, MAX_KATEGORIE);
    }

    pub fn past(&mut self, path: &str, value: Option<NaiveDate>, today: NaiveDate) {
        if let Some(date) = value {
            if date >= today {
                self.push(path, "Past", "must be a past date");
            }
        }
    }

    pub fn adresse(&mut self, value: Option<&Adresse>) {
        let Some(adresse) = value else {
            self.push("adresse", "NotNull", "must not be null");
            return;
        };
        self.pattern("adresse.plz", &adresse.plz, &PLZ_RE);
        self.not_empty("adresse.ort", &adresse.ort);
    }

    pub fn umsatz(&mut self, value: Option<&Umsatz>) {
        let Some(umsatz) = value else {
            return;
        };
        if umsatz.betrag < Decimal::ZERO {
            self.push("umsatz.betrag", "PositiveOrZero", "must be greater than or equal to 0");
        }
        self.pattern("umsatz.waehrung", &umsatz.waehrung, &CURRENCY_RE);
    }

    pub fn unique_interessen(&mut self, value: Option<&[Interesse]>) {
        let Some(interessen) = value else {
            return;
        };
        let has_duplicates = interessen
            .iter()
            .enumerate()
            .any(|(i, a)| interessen[i + 1..].contains(a));
        if has_duplicates {
            self.push("interessen", "UniqueElements", "must only contain unique elements");
        }
    }

    pub fn into_vec(self) -> Vec<Violation> {
        self.0
    }
}

fn is_well_formed_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    // Every label of the domain must be non-empty, e.g. rejects "a@.com" and "a@b."
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn email_validation_basic() {
        assert!(is_well_formed_email("alpha@acme.de"));
        assert!(is_well_formed_email("first.last@sub.acme.com"));
        assert!(!is_well_formed_email("not-an-email"));
        assert!(!is_well_formed_email("a@b"));
        assert!(!is_well_formed_email("a@.com"));
        assert!(!is_well_formed_email("@acme.com"));
        assert!(!is_well_formed_email("a b@acme.com"));
        assert!(!is_well_formed_email("a@b@acme.com"));
    }

    #[test]
    fn empty_email_is_not_null_violation() {
        let mut v = Violations::new();
        v.email("email", "");
        let v = v.into_vec();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].constraint, "NotNull");
    }

    #[test]
    fn kategorie_range() {
        let mut v = Violations::new();
        v.kategorie(0);
        v.kategorie(9);
        assert!(v.into_vec().is_empty());

        let mut v = Violations::new();
        v.kategorie(-1);
        v.kategorie(10);
        let v = v.into_vec();
        assert_eq!(v[0].constraint, "Min");
        assert_eq!(v[1].constraint, "Max");
    }

    #[test]
    fn past_rejects_today_and_future() {
        let mut v = Violations::new();
        v.past("geburtsdatum", NaiveDate::from_ymd_opt(2024, 5, 31), today());
        v.past("geburtsdatum", None, today());
        assert!(v.into_vec().is_empty());

        let mut v = Violations::new();
        v.past("geburtsdatum", Some(today()), today());
        assert_eq!(v.into_vec()[0].constraint, "Past");
    }

    #[test]
    fn adresse_checks_plz_and_ort() {
        let mut v = Violations::new();
        v.adresse(Some(&Adresse::new("01234", "Aachen")));
        assert!(v.into_vec().is_empty());

        let mut v = Violations::new();
        v.adresse(Some(&Adresse::new("1234", "")));
        let v = v.into_vec();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].path, "adresse.plz");
        assert_eq!(v[1].path, "adresse.ort");

        let mut v = Violations::new();
        v.adresse(None);
        assert_eq!(v.into_vec()[0].constraint, "NotNull");
    }

    #[test]
    fn umsatz_checks_amount_and_currency() {
        let mut v = Violations::new();
        v.umsatz(Some(&Umsatz::new(Decimal::ZERO, "EUR")));
        assert!(v.into_vec().is_empty());

        let mut v = Violations::new();
        v.umsatz(Some(&Umsatz::new(Decimal::from(-5), "euro")));
        let v = v.into_vec();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].path, "umsatz.betrag");
        assert_eq!(v[1].path, "umsatz.waehrung");
    }

    #[test]
    fn duplicate_interessen_rejected() {
        let mut v = Violations::new();
        v.unique_interessen(Some(&[Interesse::Sport, Interesse::Lesen]));
        assert!(v.into_vec().is_empty());

        let mut v = Violations::new();
        v.unique_interessen(Some(&[Interesse::Sport, Interesse::Lesen, Interesse::Sport]));
        assert_eq!(v.into_vec()[0].constraint, "UniqueElements");
    }
}
