use axum::Router;
use axum::routing::{delete, get, post};

use crate::state::AppState;

mod cloud;
mod recognition;
mod render;
mod segment;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(cloud::upload))
        .route("/api/sessions/{id}", delete(cloud::delete_session))
        .route("/api/sessions/{id}/download-results", get(cloud::download_results))
        .route("/api/sessions/{id}/pre_segmentation", post(segment::pre_segmentation))
        .route("/api/sessions/{id}/infer", post(segment::infer))
        .route(
            "/api/sessions/{id}/mask_obj_recognition",
            post(recognition::mask_obj_recognition),
        )
        .route("/api/sessions/{id}/render_and_segment", post(render::render_and_segment))
}
