use axum::{Router, routing::get};

use crate::{AppState, controllers::whales_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/whales", get(whales_controller::list_whales))
}
