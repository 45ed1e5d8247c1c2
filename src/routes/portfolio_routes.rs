use axum::{Router, routing::{get, post}};

use crate::{AppState, controllers::portfolio_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/portfolio/trades", get(portfolio_controller::list_open_trades))
        .route("/portfolio/history", get(portfolio_controller::trade_history))
        .route("/trades/:id/close", post(portfolio_controller::close_trade))
}
