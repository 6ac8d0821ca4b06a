//! The customer entity.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::patch::Patchable;
use crate::validate::{Validate, Violations};
use crate::{Adresse, Entity, Familienstand, Geschlecht, Interesse, Umsatz, Violation};

/// Surname with optional nobility prefix and an optional second part,
/// e.g. `Alpha`, `von Beta`, `Gamma-Delta`.
pub const NACHNAME_PATTERN: &str =
    r"^(o'|von |von der |von und zu |van )?[A-ZÄÖÜ][a-zäöüß]+(-[A-ZÄÖÜ][a-zäöüß]+)?$";

static NACHNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(NACHNAME_PATTERN).expect("valid nachname regex"));

/// Customer record. Missing JSON properties fall back to empty values so
/// that validation, not deserialization, reports them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kunde {
    /// Assigned by the repository; never read from request bodies.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub nachname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub kategorie: i32,
    #[serde(default)]
    pub has_newsletter: bool,
    #[serde(default)]
    pub geburtsdatum: Option<NaiveDate>,
    #[serde(default)]
    pub homepage: Option<Url>,
    #[serde(default)]
    pub geschlecht: Option<Geschlecht>,
    #[serde(default)]
    pub familienstand: Option<Familienstand>,
    #[serde(default)]
    pub interessen: Option<Vec<Interesse>>,
    #[serde(default)]
    pub umsatz: Option<Umsatz>,
    #[serde(default)]
    pub adresse: Option<Adresse>,
}

impl Kunde {
    /// Create a customer with the required fields; everything else is unset.
    pub fn new<N: Into<String>, E: Into<String>>(nachname: N, email: E, adresse: Adresse) -> Self {
        Self {
            id: None,
            nachname: nachname.into(),
            email: email.into(),
            kategorie: 0,
            has_newsletter: false,
            geburtsdatum: None,
            homepage: None,
            geschlecht: None,
            familienstand: None,
            interessen: None,
            umsatz: None,
            adresse: Some(adresse),
        }
    }
}

impl Entity for Kunde {
    const KIND: &'static str = "Kunde";
    const NAME_CRITERION: &'static str = "nachname";

    fn id(&self) -> Option<Uuid> {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = Some(id);
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn name(&self) -> &str {
        &self.nachname
    }
}

impl Validate for Kunde {
    fn validate(&self, today: NaiveDate) -> Vec<Violation> {
        let mut v = Violations::new();
        v.pattern("nachname", &self.nachname, &NACHNAME_RE);
        v.email("email", &self.email);
        v.kategorie(self.kategorie);
        v.past("geburtsdatum", self.geburtsdatum, today);
        v.unique_interessen(self.interessen.as_deref());
        v.umsatz(self.umsatz.as_ref());
        v.adresse(self.adresse.as_ref());
        v.into_vec()
    }
}

impl Patchable for Kunde {
    const NAME_PATH: &'static str = "/nachname";

    fn set_name(&mut self, name: String) {
        self.nachname = name;
    }

    fn set_email(&mut self, email: String) {
        self.email = email;
    }

    fn set_kategorie(&mut self, kategorie: i32) {
        self.kategorie = kategorie;
    }

    fn set_has_newsletter(&mut self, has_newsletter: bool) {
        self.has_newsletter = has_newsletter;
    }

    fn set_homepage(&mut self, homepage: Option<Url>) {
        self.homepage = homepage;
    }

    fn interessen_mut(&mut self) -> &mut Option<Vec<Interesse>> {
        &mut self.interessen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn nachname_pattern() {
        for ok in ["Alpha", "von Beta", "Gamma-Delta", "o'Hara", "Müller"] {
            assert!(NACHNAME_RE.is_match(ok), "{ok} should match");
        }
        for bad in ["alpha", "", "ALPHA", "Alpha Beta", "Alpha1"] {
            assert!(!NACHNAME_RE.is_match(bad), "{bad} should not match");
        }
    }

    #[test]
    fn valid_kunde_has_no_violations() {
        let mut k = Kunde::new("Alpha", "alpha@acme.de", Adresse::new("11111", "Augsburg"));
        k.kategorie = 1;
        k.geburtsdatum = NaiveDate::from_ymd_opt(2022, 1, 1);
        k.interessen = Some(vec![Interesse::Sport, Interesse::Lesen]);
        assert!(k.validate(today()).is_empty());
    }

    #[test]
    fn every_broken_field_is_reported() {
        let mut k = Kunde::new("alpha", "kein-email", Adresse::new("123", ""));
        k.kategorie = 11;
        k.geburtsdatum = NaiveDate::from_ymd_opt(2030, 1, 1);
        k.interessen = Some(vec![Interesse::Sport, Interesse::Sport]);
        let paths: Vec<_> = k.validate(today()).into_iter().map(|v| v.path).collect();
        assert_eq!(
            paths,
            vec![
                "nachname",
                "email",
                "kategorie",
                "geburtsdatum",
                "interessen",
                "adresse.plz",
                "adresse.ort"
            ]
        );
    }

    #[test]
    fn json_uses_camel_case_and_codes() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000099",
            "nachname": "Alpha",
            "email": "alpha@acme.de",
            "kategorie": 1,
            "hasNewsletter": true,
            "geburtsdatum": "2022-01-01",
            "homepage": "https://www.acme.de",
            "geschlecht": "M",
            "familienstand": "L",
            "interessen": ["S", "L"],
            "umsatz": {"betrag": 10, "waehrung": "EUR"},
            "adresse": {"plz": "11111", "ort": "Augsburg"}
        }"#;
        let k: Kunde = serde_json::from_str(json).unwrap();
        assert_eq!(k.id, None, "id is never taken from the body");
        assert!(k.has_newsletter);
        assert_eq!(k.geschlecht, Some(Geschlecht::Maennlich));
        assert_eq!(k.interessen, Some(vec![Interesse::Sport, Interesse::Lesen]));

        let out = serde_json::to_value(&k).unwrap();
        assert_eq!(out["hasNewsletter"], true);
        assert_eq!(out["familienstand"], "L");
        assert!(out.get("id").is_none());
    }

    #[test]
    fn missing_fields_default_for_validation() {
        let k: Kunde = serde_json::from_str("{}").unwrap();
        let constraints: Vec<_> = k.validate(today()).into_iter().map(|v| v.constraint).collect();
        assert_eq!(constraints, vec!["Pattern", "NotNull", "NotNull"]);
    }
}
