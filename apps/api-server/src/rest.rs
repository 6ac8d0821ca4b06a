//! REST adapter: one generic router, mounted once per entity kind.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::patch::{PatchOperation, Patchable};
use domain::service::{ReadService, WriteService};
use domain::validate::Validate;
use domain::{CoreError, Criteria, Entity, SystemClock, Violation};
use http_common::{ProblemType, RequestParts};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub type Repo<E> = Arc<InMemoryRepo<E>>;

/// Services for one entity kind, shared by the REST router and the GraphQL schema.
pub struct EntityState<E: Entity> {
    pub read: Arc<ReadService<E, Repo<E>>>,
    pub write: Arc<WriteService<E, Repo<E>, SystemClock>>,
}

impl<E: Entity + Validate> EntityState<E> {
    pub fn new(repo: Repo<E>) -> Self {
        Self {
            read: Arc::new(ReadService::new(repo.clone())),
            write: Arc::new(WriteService::new(repo, SystemClock)),
        }
    }
}

impl<E: Entity> Clone for EntityState<E> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
            write: self.write.clone(),
        }
    }
}

/// Everything a REST handler needs from an entity type.
pub trait RestEntity: Patchable + Validate + Serialize + DeserializeOwned {}

impl<E: Patchable + Validate + Serialize + DeserializeOwned> RestEntity for E {}

pub fn router<E: RestEntity>(state: EntityState<E>) -> Router {
    Router::new()
        .route("/", get(find::<E>).post(create::<E>))
        .route("/name/:prefix", get(names::<E>))
        .route(
            "/:id",
            get(find_by_id::<E>)
                .put(update::<E>)
                .patch(patch::<E>)
                .delete(delete_by_id::<E>),
        )
        .with_state(state)
}

// ============================================================================
// Request context and problem responses
// ============================================================================

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn request_parts<'a>(uri: &'a Uri, headers: &'a HeaderMap) -> RequestParts<'a> {
    RequestParts {
        path: uri.path(),
        query: uri.query(),
        host: header_str(headers, "host"),
        envoy_original_path: header_str(headers, "x-envoy-original-path"),
        forwarded_host: header_str(headers, "x-forwarded-host"),
        forwarded_proto: header_str(headers, "x-forwarded-proto"),
        forwarded_prefix: header_str(headers, "x-forwarded-prefix"),
    }
}

pub(crate) fn problem(kind: ProblemType, detail: &str, instance: &str) -> Response {
    let status = StatusCode::from_u16(kind.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(http_common::PROBLEM_CONTENT_TYPE),
        )],
        Json(http_common::problem_json(kind, detail, instance)),
    )
        .into_response()
}

fn violations_detail(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a domain error onto its problem response.
pub(crate) fn into_problem(err: &CoreError, instance: &str) -> Response {
    let (kind, detail) = match err {
        CoreError::NotFound(_) => (ProblemType::NotFound, err.to_string()),
        CoreError::ConstraintViolations(violations) => {
            (ProblemType::Constraints, violations_detail(violations))
        }
        CoreError::EmailExists(_) => (ProblemType::Constraints, err.to_string()),
        CoreError::InvalidPatchOperation(_) => (ProblemType::Unprocessable, err.to_string()),
        CoreError::Repository(_) => {
            error!(err = ?err, %instance, "repository failure");
            (ProblemType::Internal, "internal error".to_string())
        }
    };
    debug!(status = kind.status(), %detail, "problem response");
    problem(kind, &detail, instance)
}

fn bad_id(raw: &str, instance: &str) -> Response {
    warn!(id = raw, "bad id in path");
    problem(ProblemType::BadRequest, &format!("invalid id: {}", raw), instance)
}

fn bad_body(rejection: &JsonRejection, instance: &str) -> Response {
    warn!(err = %rejection.body_text(), "unreadable request body");
    problem(ProblemType::BadRequest, &rejection.body_text(), instance)
}

fn parse_id(raw: &str) -> Option<Uuid> {
    if !http_common::is_id_pattern(raw) {
        return None;
    }
    Uuid::parse_str(raw).ok()
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Serialize)]
struct Link {
    href: String,
}

impl Link {
    fn new(href: &str) -> Self {
        Self {
            href: href.to_string(),
        }
    }
}

#[derive(Serialize)]
struct Links {
    #[serde(rename = "self")]
    self_link: Link,
    #[serde(skip_serializing_if = "Option::is_none")]
    list: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    add: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remove: Option<Link>,
}

impl Links {
    fn self_only(href: &str) -> Self {
        Self {
            self_link: Link::new(href),
            list: None,
            add: None,
            update: None,
            remove: None,
        }
    }

    fn single(base: &str, href: &str) -> Self {
        Self {
            self_link: Link::new(href),
            list: Some(Link::new(base)),
            add: Some(Link::new(base)),
            update: Some(Link::new(href)),
            remove: Some(Link::new(href)),
        }
    }
}

#[derive(Serialize)]
struct WithLinks<E> {
    #[serde(flatten)]
    entity: E,
    #[serde(rename = "_links")]
    links: Links,
}

// ============================================================================
// Handlers
// ============================================================================

async fn find_by_id<E: RestEntity>(
    State(state): State<EntityState<E>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(raw): Path<String>,
) -> impl IntoResponse {
    let parts = request_parts(&uri, &headers);
    let instance = http_common::request_uri(&parts);
    let Some(id) = parse_id(&raw) else {
        return bad_id(&raw, &instance);
    };

    match state.read.find_by_id(id) {
        Ok(entity) => {
            let base = http_common::base_uri(&parts, Some(&raw));
            let href = http_common::location(&base, &raw);
            debug!(kind = E::KIND, %id, "found");
            let body = WithLinks {
                entity,
                links: Links::single(&base, &href),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => into_problem(&e, &instance),
    }
}

async fn find<E: RestEntity>(
    State(state): State<EntityState<E>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> impl IntoResponse {
    let parts = request_parts(&uri, &headers);
    let instance = http_common::request_uri(&parts);
    let criteria = Criteria::from_pairs(params);

    match state.read.find(&criteria) {
        Ok(found) => {
            let base = http_common::base_uri(&parts, None);
            let body: Vec<_> = found
                .into_iter()
                .map(|entity| {
                    let href = entity
                        .id()
                        .map(|id| http_common::location(&base, &id.to_string()))
                        .unwrap_or_else(|| base.clone());
                    WithLinks {
                        entity,
                        links: Links::self_only(&href),
                    }
                })
                .collect();
            debug!(kind = E::KIND, %criteria, count = body.len(), "search ok");
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => into_problem(&e, &instance),
    }
}

async fn names<E: RestEntity>(
    State(state): State<EntityState<E>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(prefix): Path<String>,
) -> impl IntoResponse {
    match state.read.find_names_by_prefix(&prefix) {
        Ok(names) => (StatusCode::OK, Json(names)).into_response(),
        Err(e) => into_problem(&e, &http_common::request_uri(&request_parts(&uri, &headers))),
    }
}

async fn create<E: RestEntity>(
    State(state): State<EntityState<E>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Result<Json<E>, JsonRejection>,
) -> impl IntoResponse {
    let parts = request_parts(&uri, &headers);
    let instance = http_common::request_uri(&parts);
    let entity = match body {
        Ok(Json(entity)) => entity,
        Err(rejection) => return bad_body(&rejection, &instance),
    };

    match state.write.create(entity) {
        Ok(created) => {
            let id = created.id().map(|id| id.to_string()).unwrap_or_default();
            let location = http_common::location(&http_common::base_uri(&parts, None), &id);
            info!(kind = E::KIND, %location, "created");
            (StatusCode::CREATED, [(header::LOCATION, location)]).into_response()
        }
        Err(e) => into_problem(&e, &instance),
    }
}

async fn update<E: RestEntity>(
    State(state): State<EntityState<E>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(raw): Path<String>,
    body: Result<Json<E>, JsonRejection>,
) -> impl IntoResponse {
    let parts = request_parts(&uri, &headers);
    let instance = http_common::request_uri(&parts);
    let Some(id) = parse_id(&raw) else {
        return bad_id(&raw, &instance);
    };
    let entity = match body {
        Ok(Json(entity)) => entity,
        Err(rejection) => return bad_body(&rejection, &instance),
    };

    match state.write.update(entity, id) {
        Ok(()) => {
            info!(kind = E::KIND, %id, "updated");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => into_problem(&e, &instance),
    }
}

async fn patch<E: RestEntity>(
    State(state): State<EntityState<E>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(raw): Path<String>,
    body: Result<Json<Vec<PatchOperation>>, JsonRejection>,
) -> impl IntoResponse {
    let parts = request_parts(&uri, &headers);
    let instance = http_common::request_uri(&parts);
    let Some(id) = parse_id(&raw) else {
        return bad_id(&raw, &instance);
    };
    let operations = match body {
        Ok(Json(operations)) => operations,
        Err(rejection) => return bad_body(&rejection, &instance),
    };

    match state.write.patch(id, &operations) {
        Ok(_) => {
            info!(kind = E::KIND, %id, count = operations.len(), "patched");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => into_problem(&e, &instance),
    }
}

async fn delete_by_id<E: RestEntity>(
    State(state): State<EntityState<E>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Path(raw): Path<String>,
) -> impl IntoResponse {
    let parts = request_parts(&uri, &headers);
    let instance = http_common::request_uri(&parts);
    let Some(id) = parse_id(&raw) else {
        return bad_id(&raw, &instance);
    };

    match state.write.delete_by_id(id) {
        Ok(()) => {
            info!(kind = E::KIND, %id, "deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => into_problem(&e, &instance),
    }
}
