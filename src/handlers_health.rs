use serde_json::json;
use std::convert::Infallible;
use warp::{Filter, Reply};

pub async fn index() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "message": "Photo collage service",
        "version": env!("CARGO_PKG_VERSION")
    })))
}

pub async fn health_check() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub fn build_health_routes() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let index = warp::path::end().and(warp::get()).and_then(index);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_check);

    index.or(health)
}
