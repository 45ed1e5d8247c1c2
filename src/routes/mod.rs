use axum::Router;
use axum::middleware::from_fn_with_state;
use tower_http::cors::CorsLayer;

use crate::{AppState, controllers::home_controller};

pub mod home_routes;
pub mod auth_routes;
pub mod account_routes;
pub mod orders_routes;
pub mod portfolio_routes;
pub mod market_routes;
pub mod banners_routes;
pub mod whales_routes;
pub mod realtime_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = auth_routes::add_routes(router);
    let router = account_routes::add_routes(router);
    let router = orders_routes::add_routes(router);
    let router = portfolio_routes::add_routes(router);
    let router = market_routes::add_routes(router);
    let router = banners_routes::add_routes(router);
    let router = whales_routes::add_routes(router);
    let router = realtime_routes::add_routes(router);

    router
        .fallback(home_controller::not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::require_auth))
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
