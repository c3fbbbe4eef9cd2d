pub mod config;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod workers;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PolicyConfig;
use crate::state::AppState;

pub fn build_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app() -> axum::Router {
    build_app(AppState::new(PolicyConfig::from_env()))
}
