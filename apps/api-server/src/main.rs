//! api-server: HTTP API for the Kunde/Verein workspace.
//!
//! Serves both entity kinds over REST (`/kunden`, `/vereine`) and GraphQL
//! (`/graphql`) from in-memory stores seeded at startup:
//! - Errors: REST answers with `application/problem+json`, GraphQL with
//!   errors carrying a `classification` extension.
//! - CORS: Configurable via CORS_ALLOW_ORIGIN (origin string) for browser clients.
//! - Logs: pretty or JSON via LOG_FORMAT, filtered by RUST_LOG.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # JSON logs, empty stores, no GraphiQL page
//! LOG_FORMAT=json SEED_DATA=false GRAPHIQL=false cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;
mod graphql;
mod rest;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use domain::adapters::memory_repo::InMemoryRepo;
use domain::{seed, Kunde, Verein};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rest::EntityState;

#[derive(Clone)]
struct AppState {
    kunden: EntityState<Kunde>,
    vereine: EntityState<Verein>,
}

impl AppState {
    fn new(seed_data: bool) -> Self {
        let (kunden, vereine) = if seed_data {
            (
                InMemoryRepo::with_seed(seed::kunden()),
                InMemoryRepo::with_seed(seed::vereine()),
            )
        } else {
            (InMemoryRepo::new(), InMemoryRepo::new())
        };
        info!(
            kunden = kunden.len().unwrap_or(0),
            vereine = vereine.len().unwrap_or(0),
            "stores ready"
        );
        Self {
            kunden: EntityState::new(Arc::new(kunden)),
            vereine: EntityState::new(Arc::new(vereine)),
        }
    }
}

/// All routes without the cross-cutting layers.
fn build_app(state: AppState, graphiql: bool) -> Router {
    let schema = graphql::build_schema(state.kunden.clone(), state.vereine.clone());
    Router::new()
        .route("/health", get(health))
        .nest("/kunden", rest::router(state.kunden))
        .nest("/vereine", rest::router(state.vereine))
        .merge(graphql::router(schema, graphiql))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_insecure();
    info!("{}", domain::about());

    let state = AppState::new(cfg.seed_data);

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = build_app(state, cfg.graphiql)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::PUT,
                axum::http::Method::PATCH,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                axum::http::header::IF_MATCH,
                axum::http::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([axum::http::header::LOCATION])
    };
    app = app.layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "bind failed");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}
