use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::auth_service::FieldErrors;

pub mod home_controller;
pub mod auth_controller;
pub mod account_controller;
pub mod orders_controller;
pub mod portfolio_controller;
pub mod market_controller;
pub mod banners_controller;
pub mod whales_controller;
pub mod realtime_controller;

pub(crate) fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

pub(crate) fn field_errors(errs: FieldErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": errs })),
    )
        .into_response()
}

pub(crate) fn server_error(e: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e })),
    )
        .into_response()
}

pub(crate) fn single_field_error(field: &str, message: &str) -> Response {
    let mut errs = FieldErrors::new();
    errs.insert(field.to_string(), message.to_string());
    field_errors(errs)
}
