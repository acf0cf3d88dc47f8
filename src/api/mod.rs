mod handlers;

use axum::{
    http::{header, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::events::Broadcaster;
use crate::store::FileStore;

/// Shared handler state: the on-disk store and the live-update registry.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: FileStore,
    pub broadcaster: Broadcaster,
}

impl AppState {
    pub fn new(store: FileStore, broadcaster: Broadcaster) -> Self {
        Self { store, broadcaster }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Live updates
        .route("/events", get(handlers::events))
        // Vaults
        .route("/vaults", get(handlers::list_vaults))
        .route("/vault/{name}", get(handlers::get_vault))
        .route("/vault/{name}/seeds", get(handlers::list_seeds))
        .route("/vault/{name}/seeds/{seed}", get(handlers::get_seed))
        // Decisions
        .route("/decisions", get(handlers::list_decisions))
        .route("/decision/{*id}", get(handlers::get_decision))
        // Health
        .route("/health", get(handlers::health));

    // Read-only dashboard: any origin, GET only.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", api)
        .fallback(handlers::fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
