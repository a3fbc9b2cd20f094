//! Application wiring: database pool, migrations, storage, services, router,
//! and background sweeps.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use doorstep_core::Config;
use doorstep_db::{
    AgentLocationRepository, DocumentRepository, GeoIndex, RequestRepository, MIGRATOR,
};
use doorstep_services::{
    DocumentLifecycleManager, ExpirySweeper, Geocoder, LifecycleController, MatchingEngine,
};
use doorstep_storage::create_storage;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

/// Build the database pool, run migrations, assemble services, and return
/// the shared state plus the router. Background sweeps are spawned here.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await?;

    MIGRATOR.run(&pool).await?;
    tracing::info!("Database migrations applied");

    let storage = create_storage(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize storage backend: {}", e))?;

    let requests = RequestRepository::new(pool.clone());
    let documents_repo = DocumentRepository::new(pool.clone());
    let geo = GeoIndex::new(pool.clone());
    let agent_locations = AgentLocationRepository::new(pool.clone());
    let geocoder = Arc::new(Geocoder::new(config.geocoder_base_url.clone()));

    let lifecycle = Arc::new(LifecycleController::new(
        requests.clone(),
        config.platform_fee_percent,
    ));

    let matching = MatchingEngine::new(
        requests.clone(),
        geo,
        agent_locations,
        geocoder,
        config.base_fee,
        config.default_search_radius_km,
        config.max_search_radius_km,
    );

    let documents = Arc::new(DocumentLifecycleManager::new(
        documents_repo,
        requests,
        storage,
        lifecycle.clone(),
        config.document_ttl_hours,
        config.upload_grant_ttl_secs,
        config.download_grant_ttl_secs,
        config.document_allowed_content_types.clone(),
        config.cleanup_interval_secs,
    ));

    // Both sweeps are idempotent conditional operations; any number of
    // instances may run them concurrently.
    documents.clone().start();
    Arc::new(ExpirySweeper::new(
        lifecycle.clone(),
        config.expiry_sweep_interval_secs,
    ))
    .start();

    let state = Arc::new(AppState {
        config: config.clone(),
        pool,
        matching,
        lifecycle,
        documents,
    });

    let router = build_router(state.clone(), &config);

    Ok((state, router))
}

pub fn build_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api = Router::new()
        .route(
            "/requests",
            post(handlers::requests::create_request).get(handlers::requests::list_requests),
        )
        .route("/requests/nearby", get(handlers::requests::find_nearby))
        .route("/requests/{id}", get(handlers::requests::get_request))
        .route(
            "/requests/{id}/claim",
            post(handlers::requests::claim_request),
        )
        .route(
            "/requests/{id}/transition",
            post(handlers::requests::transition_request),
        )
        .route(
            "/requests/{id}/regeocode",
            post(handlers::requests::regeocode_request),
        )
        .route(
            "/requests/{id}/documents",
            get(handlers::documents::list_request_documents),
        )
        .route(
            "/documents/upload-grant",
            post(handlers::documents::issue_upload_grant),
        )
        .route(
            "/documents/{id}/download-grant",
            get(handlers::documents::issue_download_grant),
        )
        .route("/documents/{id}", delete(handlers::documents::delete_document))
        .route("/documents/sweep", post(handlers::documents::sweep_documents))
        .route("/payments/events", post(handlers::payments::payment_event))
        .route("/agents/location", put(handlers::agents::update_location))
        .route("/agents/nearby", get(handlers::agents::find_nearby_agents))
        .route("/openapi.json", get(openapi_json));

    Router::new()
        .nest(doorstep_core::constants::API_PREFIX, api)
        .route("/health", get(handlers::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    use utoipa::OpenApi;
    axum::Json(ApiDoc::openapi())
}

/// Bind and serve until shutdown.
pub async fn start_server(config: &Config, router: Router) -> Result<(), anyhow::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!(%addr, "Starting doorstep API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
