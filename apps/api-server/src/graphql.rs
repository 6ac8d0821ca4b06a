//! GraphQL adapter: lookups and searches for both entity kinds plus create
//! mutations. Domain errors surface as GraphQL errors with a
//! `classification` extension.

use async_graphql::http::GraphiQLSource;
use async_graphql::{
    Context, EmptySubscription, Enum, ErrorExtensions, InputObject, Object, Schema, SimpleObject,
    ID,
};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use domain::{Adresse, CoreError, Criteria, Kunde, Lookup, Umsatz, Verein};
use rust_decimal::Decimal;
use tracing::{debug, error};
use url::Url;
use uuid::Uuid;

use crate::rest::EntityState;

pub type ApiSchema = Schema<Query, Mutation, EmptySubscription>;

pub fn build_schema(kunden: EntityState<Kunde>, vereine: EntityState<Verein>) -> ApiSchema {
    Schema::build(Query, Mutation, EmptySubscription)
        .data(kunden)
        .data(vereine)
        .finish()
}

/// `POST /graphql`, plus the GraphiQL page on `GET /graphql` when enabled.
pub fn router(schema: ApiSchema, graphiql: bool) -> Router {
    let endpoint = if graphiql {
        get(graphiql_page).post(graphql_handler)
    } else {
        post(graphql_handler)
    };
    Router::new().route("/graphql", endpoint).with_state(schema)
}

async fn graphql_handler(State(schema): State<ApiSchema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql_page() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

// ============================================================================
// Errors
// ============================================================================

fn to_gql_error(err: CoreError) -> async_graphql::Error {
    let message = err.to_string();
    match err {
        CoreError::NotFound(Lookup::Id(id)) => {
            async_graphql::Error::new(message).extend_with(|_, e| {
                e.set("classification", "NOT_FOUND");
                e.set("id", id.to_string());
            })
        }
        CoreError::NotFound(Lookup::Criteria(criteria)) => {
            async_graphql::Error::new(message).extend_with(|_, e| {
                e.set("classification", "NOT_FOUND");
                e.set("suchkriterien", criteria.to_string());
            })
        }
        CoreError::ConstraintViolations(violations) => {
            let list = async_graphql::to_value(&violations).unwrap_or(async_graphql::Value::Null);
            async_graphql::Error::new(message).extend_with(|_, e| {
                e.set("classification", "BAD_REQUEST");
                e.set("violations", list);
            })
        }
        CoreError::EmailExists(email) => async_graphql::Error::new(message).extend_with(|_, e| {
            e.set("classification", "BAD_REQUEST");
            e.set("email", email);
        }),
        CoreError::InvalidPatchOperation(_) => {
            async_graphql::Error::new(message).extend_with(|_, e| e.set("classification", "BAD_REQUEST"))
        }
        CoreError::Repository(_) => {
            error!(%message, "repository failure");
            async_graphql::Error::new("internal error")
                .extend_with(|_, e| e.set("classification", "INTERNAL"))
        }
    }
}

fn bad_request(message: String) -> async_graphql::Error {
    async_graphql::Error::new(message).extend_with(|_, e| e.set("classification", "BAD_REQUEST"))
}

fn parse_id(id: &ID) -> async_graphql::Result<Uuid> {
    Uuid::parse_str(id.as_str()).map_err(|_| bad_request(format!("invalid id: {}", id.as_str())))
}

fn parse_date(raw: Option<&str>) -> async_graphql::Result<Option<NaiveDate>> {
    raw.map(|s| {
        s.parse::<NaiveDate>().map_err(|_| {
            async_graphql::Error::new(format!("invalid date: {}", s)).extend_with(|_, e| {
                e.set("classification", "BAD_REQUEST");
                e.set("type", "DateTimeParse");
                e.set("parsedString", s);
            })
        })
    })
    .transpose()
}

// ============================================================================
// Types
// ============================================================================

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "Interesse", remote = "domain::Interesse")]
pub enum InteresseGql {
    Sport,
    Lesen,
    Reisen,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "Familienstand", remote = "domain::Familienstand")]
pub enum FamilienstandGql {
    Ledig,
    Verheiratet,
    Geschieden,
    Verwitwet,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq, Debug)]
#[graphql(name = "Geschlecht", remote = "domain::Geschlecht")]
pub enum GeschlechtGql {
    Maennlich,
    Weiblich,
    Divers,
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Adresse")]
pub struct AdresseGql {
    pub plz: String,
    pub ort: String,
}

impl From<Adresse> for AdresseGql {
    fn from(a: Adresse) -> Self {
        Self { plz: a.plz, ort: a.ort }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Umsatz")]
pub struct UmsatzGql {
    pub betrag: Decimal,
    pub waehrung: String,
}

impl From<Umsatz> for UmsatzGql {
    fn from(u: Umsatz) -> Self {
        Self {
            betrag: u.betrag,
            waehrung: u.waehrung,
        }
    }
}

fn id_of(id: Option<Uuid>) -> ID {
    ID::from(id.map(|id| id.to_string()).unwrap_or_default())
}

fn interessen_of(interessen: Option<Vec<domain::Interesse>>) -> Vec<InteresseGql> {
    interessen
        .unwrap_or_default()
        .into_iter()
        .map(Into::into)
        .collect()
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Kunde")]
pub struct KundeGql {
    pub id: ID,
    pub nachname: String,
    pub email: String,
    pub kategorie: i32,
    pub has_newsletter: bool,
    pub geburtsdatum: Option<String>,
    pub homepage: Option<Url>,
    pub geschlecht: Option<GeschlechtGql>,
    pub familienstand: Option<FamilienstandGql>,
    pub interessen: Vec<InteresseGql>,
    pub umsatz: Option<UmsatzGql>,
    pub adresse: Option<AdresseGql>,
}

impl From<Kunde> for KundeGql {
    fn from(k: Kunde) -> Self {
        Self {
            id: id_of(k.id),
            nachname: k.nachname,
            email: k.email,
            kategorie: k.kategorie,
            has_newsletter: k.has_newsletter,
            geburtsdatum: k.geburtsdatum.map(|d| d.to_string()),
            homepage: k.homepage,
            geschlecht: k.geschlecht.map(Into::into),
            familienstand: k.familienstand.map(Into::into),
            interessen: interessen_of(k.interessen),
            umsatz: k.umsatz.map(Into::into),
            adresse: k.adresse.map(Into::into),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Verein")]
pub struct VereinGql {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub kategorie: i32,
    pub has_newsletter: bool,
    pub gruendungsdatum: Option<String>,
    pub homepage: Option<Url>,
    pub interessen: Vec<InteresseGql>,
    pub umsatz: Option<UmsatzGql>,
    pub adresse: Option<AdresseGql>,
}

impl From<Verein> for VereinGql {
    fn from(v: Verein) -> Self {
        Self {
            id: id_of(v.id),
            name: v.name,
            email: v.email,
            kategorie: v.kategorie,
            has_newsletter: v.has_newsletter,
            gruendungsdatum: v.gruendungsdatum.map(|d| d.to_string()),
            homepage: v.homepage,
            interessen: interessen_of(v.interessen),
            umsatz: v.umsatz.map(Into::into),
            adresse: v.adresse.map(Into::into),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct CreatePayload {
    pub id: ID,
}

#[derive(InputObject, Debug, Default)]
pub struct Suchkriterien {
    pub name: Option<String>,
    pub nachname: Option<String>,
    pub email: Option<String>,
}

impl Suchkriterien {
    fn to_criteria(&self) -> Criteria {
        let mut criteria = Criteria::new();
        let fields = [
            ("name", &self.name),
            ("nachname", &self.nachname),
            ("email", &self.email),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                criteria.insert(key, value.as_str());
            }
        }
        criteria
    }
}

#[derive(InputObject, Debug)]
pub struct AdresseInput {
    pub plz: String,
    pub ort: String,
}

#[derive(InputObject, Debug)]
pub struct UmsatzInput {
    pub betrag: Decimal,
    pub waehrung: String,
}

#[derive(InputObject, Debug)]
pub struct KundeInput {
    pub nachname: String,
    pub email: String,
    #[graphql(default)]
    pub kategorie: i32,
    #[graphql(default)]
    pub has_newsletter: bool,
    /// ISO date, e.g. `2022-01-31`.
    pub geburtsdatum: Option<String>,
    pub homepage: Option<Url>,
    pub geschlecht: Option<GeschlechtGql>,
    pub familienstand: Option<FamilienstandGql>,
    pub interessen: Option<Vec<InteresseGql>>,
    pub umsatz: Option<UmsatzInput>,
    pub adresse: AdresseInput,
}

impl KundeInput {
    fn into_kunde(self) -> async_graphql::Result<Kunde> {
        let geburtsdatum = parse_date(self.geburtsdatum.as_deref())?;
        Ok(Kunde {
            id: None,
            nachname: self.nachname,
            email: self.email,
            kategorie: self.kategorie,
            has_newsletter: self.has_newsletter,
            geburtsdatum,
            homepage: self.homepage,
            geschlecht: self.geschlecht.map(Into::into),
            familienstand: self.familienstand.map(Into::into),
            interessen: self
                .interessen
                .map(|list| list.into_iter().map(Into::into).collect()),
            umsatz: self.umsatz.map(|u| Umsatz::new(u.betrag, u.waehrung)),
            adresse: Some(Adresse::new(self.adresse.plz, self.adresse.ort)),
        })
    }
}

#[derive(InputObject, Debug)]
pub struct VereinInput {
    pub name: String,
    pub email: String,
    #[graphql(default)]
    pub kategorie: i32,
    #[graphql(default)]
    pub has_newsletter: bool,
    /// ISO date, e.g. `2022-01-31`.
    pub gruendungsdatum: Option<String>,
    pub homepage: Option<Url>,
    pub interessen: Option<Vec<InteresseGql>>,
    pub umsatz: Option<UmsatzInput>,
    pub adresse: AdresseInput,
}

impl VereinInput {
    fn into_verein(self) -> async_graphql::Result<Verein> {
        let gruendungsdatum = parse_date(self.gruendungsdatum.as_deref())?;
        Ok(Verein {
            id: None,
            name: self.name,
            email: self.email,
            kategorie: self.kategorie,
            has_newsletter: self.has_newsletter,
            gruendungsdatum,
            homepage: self.homepage,
            interessen: self
                .interessen
                .map(|list| list.into_iter().map(Into::into).collect()),
            umsatz: self.umsatz.map(|u| Umsatz::new(u.betrag, u.waehrung)),
            adresse: Some(Adresse::new(self.adresse.plz, self.adresse.ort)),
        })
    }
}

// ============================================================================
// Resolvers
// ============================================================================

pub struct Query;

#[Object]
impl Query {
    async fn kunde(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<KundeGql>> {
        let state = ctx.data::<EntityState<Kunde>>()?;
        let id = parse_id(&id)?;
        debug!(%id, "graphql kunde");
        let kunde = state.read.find_by_id(id).map_err(to_gql_error)?;
        Ok(Some(kunde.into()))
    }

    async fn kunden(
        &self,
        ctx: &Context<'_>,
        input: Option<Suchkriterien>,
    ) -> async_graphql::Result<Vec<KundeGql>> {
        let state = ctx.data::<EntityState<Kunde>>()?;
        let criteria = input.unwrap_or_default().to_criteria();
        debug!(%criteria, "graphql kunden");
        let kunden = state.read.find(&criteria).map_err(to_gql_error)?;
        Ok(kunden.into_iter().map(Into::into).collect())
    }

    async fn verein(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Option<VereinGql>> {
        let state = ctx.data::<EntityState<Verein>>()?;
        let id = parse_id(&id)?;
        debug!(%id, "graphql verein");
        let verein = state.read.find_by_id(id).map_err(to_gql_error)?;
        Ok(Some(verein.into()))
    }

    async fn vereine(
        &self,
        ctx: &Context<'_>,
        input: Option<Suchkriterien>,
    ) -> async_graphql::Result<Vec<VereinGql>> {
        let state = ctx.data::<EntityState<Verein>>()?;
        let criteria = input.unwrap_or_default().to_criteria();
        debug!(%criteria, "graphql vereine");
        let vereine = state.read.find(&criteria).map_err(to_gql_error)?;
        Ok(vereine.into_iter().map(Into::into).collect())
    }
}

pub struct Mutation;

#[Object]
impl Mutation {
    async fn create_kunde(
        &self,
        ctx: &Context<'_>,
        input: KundeInput,
    ) -> async_graphql::Result<CreatePayload> {
        let state = ctx.data::<EntityState<Kunde>>()?;
        let kunde = input.into_kunde()?;
        debug!(email = %kunde.email, "graphql createKunde");
        let created = state.write.create(kunde).map_err(to_gql_error)?;
        Ok(CreatePayload {
            id: id_of(created.id),
        })
    }

    async fn create_verein(
        &self,
        ctx: &Context<'_>,
        input: VereinInput,
    ) -> async_graphql::Result<CreatePayload> {
        let state = ctx.data::<EntityState<Verein>>()?;
        let verein = input.into_verein()?;
        debug!(email = %verein.email, "graphql createVerein");
        let created = state.write.create(verein).map_err(to_gql_error)?;
        Ok(CreatePayload {
            id: id_of(created.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use domain::adapters::memory_repo::InMemoryRepo;
    use domain::seed;

    fn schema() -> ApiSchema {
        build_schema(
            EntityState::new(Arc::new(InMemoryRepo::with_seed(seed::kunden()))),
            EntityState::new(Arc::new(InMemoryRepo::with_seed(seed::vereine()))),
        )
    }

    async fn run(schema: &ApiSchema, query: &str) -> serde_json::Value {
        let resp = schema.execute(query).await;
        serde_json::to_value(&resp).unwrap()
    }

    #[tokio::test]
    async fn kunde_by_id() {
        let json = run(
            &schema(),
            r#"{ kunde(id: "00000000-0000-0000-0000-000000000001") { nachname interessen geschlecht adresse { plz } } }"#,
        )
        .await;
        assert_eq!(json["data"]["kunde"]["nachname"], "Alpha");
        assert_eq!(json["data"]["kunde"]["interessen"], serde_json::json!(["SPORT", "LESEN"]));
        assert_eq!(json["data"]["kunde"]["geschlecht"], "MAENNLICH");
        assert_eq!(json["data"]["kunde"]["adresse"]["plz"], "11111");
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let json = run(
            &schema(),
            r#"{ verein(id: "00000000-0000-0000-0000-000000000099") { name } }"#,
        )
        .await;
        let ext = &json["errors"][0]["extensions"];
        assert_eq!(ext["classification"], "NOT_FOUND");
        assert_eq!(ext["id"], "00000000-0000-0000-0000-000000000099");
    }

    #[tokio::test]
    async fn search_by_criteria() {
        let schema = schema();
        let json = run(&schema, r#"{ vereine(input: { name: "Alpha" }) { email } }"#).await;
        assert_eq!(json["data"]["vereine"].as_array().unwrap().len(), 3);

        let json = run(&schema, r#"{ kunden { nachname } }"#).await;
        assert_eq!(json["data"]["kunden"].as_array().unwrap().len(), 7);

        let json = run(&schema, r#"{ kunden(input: { nachname: "Zeta" }) { nachname } }"#).await;
        assert_eq!(json["errors"][0]["extensions"]["classification"], "NOT_FOUND");
        assert_eq!(json["errors"][0]["extensions"]["suchkriterien"], "nachname=Zeta");
    }

    #[tokio::test]
    async fn create_verein_then_read() {
        let schema = schema();
        let json = run(
            &schema,
            r#"mutation { createVerein(input: {
                name: "Zeta", email: "zeta@acme.test", kategorie: 1,
                interessen: [REISEN], adresse: { plz: "12345", ort: "Linz" }
            }) { id } }"#,
        )
        .await;
        let id = json["data"]["createVerein"]["id"].as_str().unwrap().to_string();

        let json = run(&schema, &format!(r#"{{ verein(id: "{}") {{ name interessen }} }}"#, id)).await;
        assert_eq!(json["data"]["verein"]["name"], "Zeta");
        assert_eq!(json["data"]["verein"]["interessen"], serde_json::json!(["REISEN"]));
    }

    #[tokio::test]
    async fn create_with_existing_email_or_violations() {
        let schema = schema();
        let json = run(
            &schema,
            r#"mutation { createKunde(input: {
                nachname: "Neu", email: "alpha@acme.de", adresse: { plz: "12345", ort: "Linz" }
            }) { id } }"#,
        )
        .await;
        let ext = &json["errors"][0]["extensions"];
        assert_eq!(ext["classification"], "BAD_REQUEST");
        assert_eq!(ext["email"], "alpha@acme.de");

        let json = run(
            &schema,
            r#"mutation { createKunde(input: {
                nachname: "neu", email: "neu@acme.de", kategorie: 12, adresse: { plz: "1", ort: "Linz" }
            }) { id } }"#,
        )
        .await;
        let violations = json["errors"][0]["extensions"]["violations"].as_array().unwrap().clone();
        let paths: Vec<_> = violations.iter().map(|v| v["path"].as_str().unwrap()).collect();
        assert_eq!(paths, vec!["nachname", "kategorie", "adresse.plz"]);
    }

    #[tokio::test]
    async fn bad_date_is_reported() {
        let json = run(
            &schema(),
            r#"mutation { createKunde(input: {
                nachname: "Neu", email: "neu@acme.de", geburtsdatum: "31.01.2022",
                adresse: { plz: "12345", ort: "Linz" }
            }) { id } }"#,
        )
        .await;
        let ext = &json["errors"][0]["extensions"];
        assert_eq!(ext["classification"], "BAD_REQUEST");
        assert_eq!(ext["type"], "DateTimeParse");
        assert_eq!(ext["parsedString"], "31.01.2022");
    }
}
