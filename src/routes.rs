use std::convert::Infallible;
use warp::Filter;

use crate::handlers_collage::build_collage_routes;
use crate::handlers_health::build_health_routes;
use crate::handlers_resize::build_resize_routes;
use crate::handlers_results::build_results_routes;
use crate::warp_helpers::{cors, handle_rejection, AppState};

/// Every route the service answers, with CORS, request logging and
/// rejection handling applied.
pub fn build_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    build_health_routes()
        .or(build_collage_routes(state.clone()))
        .or(build_resize_routes(state.clone()))
        .or(build_results_routes(state))
        .with(cors())
        .with(warp::log("photo_collage"))
        .recover(handle_rejection)
}
