//! Domain library for the Kunde/Verein service.
//!
//! Holds the entity and value types, the repository port, the error taxonomy,
//! validation, search dispatch, the read/write services and the PATCH applier.
//! HTTP and GraphQL concerns stay out of this crate.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod adapters;
pub mod kunde;
pub mod patch;
pub mod search;
pub mod seed;
pub mod service;
pub mod validate;
pub mod verein;

pub use kunde::Kunde;
pub use verein::Verein;

/// Smallest allowed value for `kategorie`.
pub const MIN_KATEGORIE: i32 = 0;
/// Largest allowed value for `kategorie`.
pub const MAX_KATEGORIE: i32 = 9;

/// Postal address. `plz` is a 5-digit code with leading zeros.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adresse {
    #[serde(default)]
    pub plz: String,
    #[serde(default)]
    pub ort: String,
}

impl Adresse {
    pub fn new<P: Into<String>, O: Into<String>>(plz: P, ort: O) -> Self {
        Self {
            plz: plz.into(),
            ort: ort.into(),
        }
    }
}

/// Revenue: an amount with its ISO-4217 currency code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Umsatz {
    pub betrag: Decimal,
    pub waehrung: String,
}

impl Umsatz {
    pub fn new<W: Into<String>>(betrag: Decimal, waehrung: W) -> Self {
        Self {
            betrag,
            waehrung: waehrung.into(),
        }
    }
}

/// Interests, encoded on the wire by a one-letter code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interesse {
    Sport,
    Lesen,
    Reisen,
}

impl Interesse {
    pub const ALL: [Interesse; 3] = [Interesse::Sport, Interesse::Lesen, Interesse::Reisen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interesse::Sport => "S",
            Interesse::Lesen => "L",
            Interesse::Reisen => "R",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "S" => Some(Interesse::Sport),
            "L" => Some(Interesse::Lesen),
            "R" => Some(Interesse::Reisen),
            _ => None,
        }
    }
}

/// Marital status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Familienstand {
    Ledig,
    Verheiratet,
    Geschieden,
    Verwitwet,
}

impl Familienstand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Familienstand::Ledig => "L",
            Familienstand::Verheiratet => "VH",
            Familienstand::Geschieden => "G",
            Familienstand::Verwitwet => "VW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "L" => Some(Familienstand::Ledig),
            "VH" => Some(Familienstand::Verheiratet),
            "G" => Some(Familienstand::Geschieden),
            "VW" => Some(Familienstand::Verwitwet),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Geschlecht {
    Maennlich,
    Weiblich,
    Divers,
}

impl Geschlecht {
    pub fn as_str(&self) -> &'static str {
        match self {
            Geschlecht::Maennlich => "M",
            Geschlecht::Weiblich => "W",
            Geschlecht::Divers => "D",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "M" => Some(Geschlecht::Maennlich),
            "W" => Some(Geschlecht::Weiblich),
            "D" => Some(Geschlecht::Divers),
            _ => None,
        }
    }
}

macro_rules! string_encoded {
    ($($ty:ident),+) => {$(
        impl From<$ty> for String {
            fn from(v: $ty) -> Self {
                v.as_str().to_string()
            }
        }

        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                $ty::parse(&s)
                    .ok_or_else(|| format!("unknown {} value: {}", stringify!($ty), s))
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )+};
}

string_encoded!(Interesse, Familienstand, Geschlecht);

/// Common view on the stored records so that repository, search and
/// services can be written once for both entity kinds.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Human readable kind, used in log lines and error details.
    const KIND: &'static str;
    /// Search criterion that maps to a substring match on the name field.
    const NAME_CRITERION: &'static str;

    fn id(&self) -> Option<Uuid>;
    fn set_id(&mut self, id: Uuid);
    fn email(&self) -> &str;
    fn name(&self) -> &str;
}

/// Time source abstraction to make date checks testable.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock in UTC.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

/// Repository port for storing and loading one entity kind.
pub trait Repository<E: Entity>: Send + Sync {
    fn find_by_id(&self, id: &Uuid) -> Result<Option<E>, CoreError>;
    fn find_by_email(&self, email: &str) -> Result<Option<E>, CoreError>;
    /// All entities in insertion order.
    fn find_all(&self) -> Result<Vec<E>, CoreError>;
    /// Case-sensitive substring match on the name field.
    fn find_by_name(&self, fragment: &str) -> Result<Vec<E>, CoreError>;
    /// Distinct names starting with `prefix`, in first-seen order.
    fn find_names_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError>;
    /// Store a new entity under a freshly generated id.
    fn create(&self, entity: E) -> Result<E, CoreError>;
    /// Replace the entity with the same id. Unknown ids are ignored.
    fn update(&self, entity: E) -> Result<(), CoreError>;
    fn delete_by_id(&self, id: &Uuid) -> Result<(), CoreError>;
    fn is_email_existing(&self, email: &str) -> Result<bool, CoreError>;
}

impl<E: Entity, R: Repository<E> + ?Sized> Repository<E> for std::sync::Arc<R> {
    fn find_by_id(&self, id: &Uuid) -> Result<Option<E>, CoreError> {
        (**self).find_by_id(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<E>, CoreError> {
        (**self).find_by_email(email)
    }

    fn find_all(&self) -> Result<Vec<E>, CoreError> {
        (**self).find_all()
    }

    fn find_by_name(&self, fragment: &str) -> Result<Vec<E>, CoreError> {
        (**self).find_by_name(fragment)
    }

    fn find_names_by_prefix(&self, prefix: &str) -> Result<Vec<String>, CoreError> {
        (**self).find_names_by_prefix(prefix)
    }

    fn create(&self, entity: E) -> Result<E, CoreError> {
        (**self).create(entity)
    }

    fn update(&self, entity: E) -> Result<(), CoreError> {
        (**self).update(entity)
    }

    fn delete_by_id(&self, id: &Uuid) -> Result<(), CoreError> {
        (**self).delete_by_id(id)
    }

    fn is_email_existing(&self, email: &str) -> Result<bool, CoreError> {
        (**self).is_email_existing(email)
    }
}

/// Search criteria: criterion name to the values given for it.
///
/// Keys are kept sorted so log output and error payloads are stable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Criteria(BTreeMap<String, Vec<String>>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build criteria from key/value pairs, e.g. parsed query parameters.
    /// Repeated keys collect all their values.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut criteria = Self::new();
        for (k, v) in pairs {
            criteria.insert(k, v);
        }
        criteria
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl Display for Criteria {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, values) in &self.0 {
            for value in values {
                if !first {
                    f.write_str("&")?;
                }
                write!(f, "{}={}", key, value)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// What a failed lookup was looking for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Id(Uuid),
    Criteria(Criteria),
}

impl Display for Lookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "no entity found with id {}", id),
            Lookup::Criteria(c) => write!(f, "no entities found for criteria {}", c),
        }
    }
}

/// One failed field constraint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Property path, e.g. `adresse.plz`.
    pub path: String,
    /// Name of the failed rule, e.g. `Pattern`.
    pub constraint: &'static str,
    pub message: String,
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} {}", self.path, self.constraint, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    NotFound(Lookup),
    #[error("constraint violations: {}", join_violations(.0))]
    ConstraintViolations(Vec<Violation>),
    #[error("email address {0} already exists")]
    EmailExists(String),
    #[error("invalid patch operation: {0}")]
    InvalidPatchOperation(String),
    #[error("repository error: {0}")]
    Repository(String),
}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - domain library loaded", pkg, ver)
}
