use axum::{Router, routing::{get, post}};

use crate::{AppState, controllers::orders_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/orders", get(orders_controller::list_orders).post(orders_controller::place_order))
        .route("/orders/:id/cancel", post(orders_controller::cancel_order))
}
