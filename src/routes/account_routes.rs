use axum::{Router, routing::{get, post}};

use crate::{AppState, controllers::account_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/account", get(account_controller::get_account))
        .route("/account/reset", post(account_controller::reset_account))
}
