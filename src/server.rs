use crate::config::Config;
use crate::constants;
use crate::enrich::{enrich_images, PhotoSearch, UnsplashClient};
use crate::pipeline::{Pipeline, RunOptions};
use crate::sources::create_source;
use crate::storage::ListingStore;
use axum::{
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Extension, Json as AxumJson, Router,
};
use hyper::Server;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ListingStore>,
    pub config: Config,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "faf-scraper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Both trigger routes are guarded by a bearer-token comparison against
/// the shared CRON_SECRET.
fn authorized(headers: &HeaderMap) -> bool {
    let Ok(secret) = std::env::var("CRON_SECRET") else {
        return false;
    };
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(|value| value == format!("Bearer {}", secret))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize, Default)]
struct IngestParams {
    sources: Option<Vec<String>>,
    dry_run: Option<bool>,
    limit: Option<usize>,
}

async fn trigger_ingest(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    params: Option<AxumJson<IngestParams>>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    let params = params.map(|AxumJson(p)| p).unwrap_or_default();

    let source_names: Vec<String> = params
        .sources
        .unwrap_or_else(|| {
            constants::get_supported_sources()
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
    let options = RunOptions {
        dry_run: params.dry_run.unwrap_or(false),
        limit: params.limit,
        delay: Duration::from_millis(state.config.ingest.delay_ms),
    };

    let mut summaries = Vec::new();
    for name in &source_names {
        let Some(adapter) = create_source(name, &state.config) else {
            summaries.push(json!({"source": name, "error": "unknown source"}));
            continue;
        };
        match Pipeline::run_for_source(adapter.as_ref(), state.store.clone(), &options).await {
            Ok(summary) => {
                info!(
                    "Ingest run for {} finished: {} created, {} updated",
                    name, summary.created, summary.updated
                );
                summaries.push(json!({
                    "source": summary.source_name,
                    "total": summary.total_items,
                    "created": summary.created,
                    "updated": summary.updated,
                    "skipped": summary.skipped,
                    "errors": summary.errors.len(),
                }));
            }
            Err(e) => {
                error!("Ingest run for {} failed: {}", name, e);
                summaries.push(json!({"source": name, "error": e.to_string()}));
            }
        }
    }

    (StatusCode::OK, Json(json!({ "results": summaries })))
}

#[derive(Debug, Deserialize, Default)]
struct EnrichParams {
    dry_run: Option<bool>,
    limit: Option<usize>,
}

async fn trigger_enrich(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    params: Option<AxumJson<EnrichParams>>,
) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})));
    }
    let params = params.map(|AxumJson(p)| p).unwrap_or_default();

    let photos: Arc<dyn PhotoSearch> = match UnsplashClient::from_env() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("photo client: {}", e)})),
            );
        }
    };
    let options = RunOptions {
        dry_run: params.dry_run.unwrap_or(false),
        limit: params.limit,
        delay: Duration::from_millis(state.config.ingest.delay_ms),
    };

    match enrich_images(state.store.clone(), photos, &options).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(json!({
                "total": summary.total,
                "assigned": summary.assigned,
                "skipped": summary.skipped,
                "errors": summary.errors.len(),
            })),
        ),
        Err(e) => {
            error!("Enrichment run failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/ingest", post(trigger_ingest))
        .route("/api/enrich", post(trigger_enrich))
        .layer(ServiceBuilder::new().layer(cors).layer(Extension(state)))
}

pub async fn run_server(
    addr: SocketAddr,
    state: AppState,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);
    info!("Listening on {}", addr);
    println!("🌐 Listening on http://{}", addr);
    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}
