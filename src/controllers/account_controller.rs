use axum::{
    Json,
    extract::{Extension, State},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{AppState, models::CurrentUser, services::account_service};

use super::{server_error, unauthorized};

// GET /account
pub async fn get_account(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match account_service::get_or_create_account(&state, u.id).await {
        Ok(acc) => Json(json!({
            "cash": acc.cash,
            "updated_at": acc.updated_at,
        }))
        .into_response(),
        Err(e) => server_error(e),
    }
}

// POST /account/reset
pub async fn reset_account(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match account_service::reset_account(&state, u.id).await {
        Ok(acc) => Json(json!({
            "cash": acc.cash,
            "updated_at": acc.updated_at,
        }))
        .into_response(),
        Err(e) => server_error(e),
    }
}
