//! Fixed dataset loaded into the stores at startup.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use url::Url;
use uuid::Uuid;

use crate::{Adresse, Familienstand, Geschlecht, Interesse, Kunde, Umsatz, Verein};

use crate::Interesse::{Lesen, Reisen, Sport};

struct Row {
    id: u128,
    name: &'static str,
    email: &'static str,
    kategorie: i32,
    datum: Option<(i32, u32, u32)>,
    homepage: &'static str,
    umsatz: i64,
    geschlecht: Geschlecht,
    familienstand: Familienstand,
    interessen: &'static [Interesse],
    plz: &'static str,
    ort: &'static str,
}

static ROWS: [Row; 7] = [
    Row {
        id: 0x00,
        name: "Admin",
        email: "admin@acme.com",
        kategorie: 0,
        datum: Some((2022, 1, 31)),
        homepage: "https://www.acme.com",
        umsatz: 0,
        geschlecht: Geschlecht::Weiblich,
        familienstand: Familienstand::Verheiratet,
        interessen: &[Lesen],
        plz: "00000",
        ort: "Aachen",
    },
    Row {
        id: 0x01,
        name: "Alpha",
        email: "alpha@acme.de",
        kategorie: 1,
        datum: Some((2022, 1, 1)),
        homepage: "https://www.acme.de",
        umsatz: 10,
        geschlecht: Geschlecht::Maennlich,
        familienstand: Familienstand::Ledig,
        interessen: &[Sport, Lesen],
        plz: "11111",
        ort: "Augsburg",
    },
    Row {
        id: 0x02,
        name: "Alpha",
        email: "alpha@acme.edu",
        kategorie: 2,
        datum: None,
        homepage: "https://www.acme.edu",
        umsatz: 20,
        geschlecht: Geschlecht::Weiblich,
        familienstand: Familienstand::Geschieden,
        interessen: &[],
        plz: "22222",
        ort: "Aalen",
    },
    Row {
        id: 0x30,
        name: "Alpha",
        email: "alpha@acme.ch",
        kategorie: 3,
        datum: None,
        homepage: "https://www.acme.ch",
        umsatz: 30,
        geschlecht: Geschlecht::Maennlich,
        familienstand: Familienstand::Verwitwet,
        interessen: &[Sport, Reisen],
        plz: "33333",
        ort: "Ahlen",
    },
    Row {
        id: 0x40,
        name: "Delta",
        email: "delta@acme.uk",
        kategorie: 4,
        datum: None,
        homepage: "https://www.acme.uk",
        umsatz: 40,
        geschlecht: Geschlecht::Weiblich,
        familienstand: Familienstand::Verheiratet,
        interessen: &[Lesen, Reisen],
        plz: "44444",
        ort: "Dortmund",
    },
    Row {
        id: 0x50,
        name: "Epsilon",
        email: "epsilon@acme.jp",
        kategorie: 5,
        datum: None,
        homepage: "https://www.acme.jp",
        umsatz: 50,
        geschlecht: Geschlecht::Maennlich,
        familienstand: Familienstand::Ledig,
        interessen: &[],
        plz: "55555",
        ort: "Essen",
    },
    Row {
        id: 0x60,
        name: "Phi",
        email: "phi@acme.cn",
        kategorie: 6,
        datum: None,
        homepage: "https://www.acme.cn",
        umsatz: 60,
        geschlecht: Geschlecht::Divers,
        familienstand: Familienstand::Ledig,
        interessen: &[],
        plz: "66666",
        ort: "Freiburg",
    },
];

impl Row {
    fn datum(&self) -> Option<NaiveDate> {
        self.datum.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
    }

    fn homepage(&self) -> Option<Url> {
        Url::parse(self.homepage).ok()
    }

    fn umsatz(&self) -> Umsatz {
        Umsatz::new(Decimal::from(self.umsatz), "EUR")
    }
}

/// Seed customers, ids `…000` to `…060`.
pub fn kunden() -> Vec<Kunde> {
    ROWS.iter()
        .map(|row| Kunde {
            id: Some(Uuid::from_u128(row.id)),
            nachname: row.name.to_string(),
            email: row.email.to_string(),
            kategorie: row.kategorie,
            has_newsletter: true,
            geburtsdatum: row.datum(),
            homepage: row.homepage(),
            geschlecht: Some(row.geschlecht),
            familienstand: Some(row.familienstand),
            interessen: Some(row.interessen.to_vec()),
            umsatz: Some(row.umsatz()),
            adresse: Some(Adresse::new(row.plz, row.ort)),
        })
        .collect()
}

/// Seed clubs; same names, emails and ids as the customers.
pub fn vereine() -> Vec<Verein> {
    ROWS.iter()
        .map(|row| Verein {
            id: Some(Uuid::from_u128(row.id)),
            name: row.name.to_string(),
            email: row.email.to_string(),
            kategorie: row.kategorie,
            has_newsletter: true,
            gruendungsdatum: row.datum(),
            homepage: row.homepage(),
            interessen: Some(row.interessen.to_vec()),
            umsatz: Some(row.umsatz()),
            adresse: Some(Adresse::new(row.plz, row.ort)),
        })
        .collect()
}
