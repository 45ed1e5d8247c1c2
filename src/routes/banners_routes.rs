use axum::{Router, routing::get};

use crate::{AppState, controllers::banners_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/banners", get(banners_controller::list_banners))
}
