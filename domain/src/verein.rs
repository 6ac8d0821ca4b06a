//! The club entity.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::patch::Patchable;
use crate::validate::{Validate, Violations};
use crate::{Adresse, Entity, Interesse, Umsatz, Violation};

/// Club name: upper-case first letter, then letters, digits and a few
/// punctuation marks, e.g. `Alpha`, `SV Beta 04`, `Gamma & Delta e.V.`.
pub const NAME_PATTERN: &str = r"^[A-ZÄÖÜ][A-Za-zÄÖÜäöüß0-9 .&'-]*$";

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(NAME_PATTERN).expect("valid name regex"));

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verein {
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub kategorie: i32,
    #[serde(default)]
    pub has_newsletter: bool,
    #[serde(default)]
    pub gruendungsdatum: Option<NaiveDate>,
    #[serde(default)]
    pub homepage: Option<Url>,
    #[serde(default)]
    pub interessen: Option<Vec<Interesse>>,
    #[serde(default)]
    pub umsatz: Option<Umsatz>,
    #[serde(default)]
    pub adresse: Option<Adresse>,
}

impl Verein {
    pub fn new<N: Into<String>, E: Into<String>>(name: N, email: E, adresse: Adresse) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            kategorie: 0,
            has_newsletter: false,
            gruendungsdatum: None,
            homepage: None,
            interessen: None,
            umsatz: None,
            adresse: Some(adresse),
        }
    }
}

impl Entity for Verein {
    const KIND: &'static str = "Verein";
    const NAME_CRITERION: &'static str = "name";

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
        &self.name
    }
}

impl Validate for Verein {
    fn validate(&self, today: NaiveDate) -> Vec<Violation> {
        let mut v = Violations::new();
        v.pattern("name", &self.name, &NAME_RE);
        v.email("email", &self.email);
        v.kategorie(self.kategorie);
        v.past("gruendungsdatum", self.gruendungsdatum, today);
        v.unique_interessen(self.interessen.as_deref());
        v.umsatz(self.umsatz.as_ref());
        v.adresse(self.adresse.as_ref());
        v.into_vec()
    }
}

impl Patchable for Verein {
    const NAME_PATH: &'static str = "/name";

    fn set_name(&mut self, name: String) {
        self.name = name;
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
