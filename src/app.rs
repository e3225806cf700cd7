use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{api, state::AppState, ws};

/// Full application router: WebSocket, JSON API, and static files as fallback
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/games", post(api::create_game))
        .route("/api/games/{id}", get(api::get_game))
        .route("/api/games/{id}/results", get(api::export_results));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(api_routes)
        .fallback_service(ServeDir::new(&state.config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
