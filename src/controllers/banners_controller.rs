use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, services::sponsor_banner_service};

use super::server_error;

// GET /banners
pub async fn list_banners(State(state): State<AppState>) -> Response {
    match sponsor_banner_service::active_banners(&state).await {
        Ok(banners) => {
            let items: Vec<_> = banners
                .iter()
                .map(|b| {
                    json!({
                        "id": b.id.to_hex(),
                        "title": b.title,
                        "image_url": b.image_url,
                        "link_url": b.link_url,
                        "weight": b.weight,
                    })
                })
                .collect();

            Json(json!({ "banners": items })).into_response()
        }
        Err(e) => server_error(e),
    }
}
