//! JSON HTTP front-end for the resolver.

mod handlers;
mod state;

use axum::routing::get;
use axum::Router;
use log::info;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::location::LocationResolver;

pub fn build_router(resolver: LocationResolver) -> Router {
    let state = Arc::new(AppState { resolver });

    Router::new()
        .route("/api/coordinate", get(handlers::coordinate))
        .route("/api/elevation", get(handlers::elevation))
        .route("/api/fix", get(handlers::fix))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(resolver: LocationResolver, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(resolver);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("geofix server listening on http://{}", addr);
    eprintln!("  geofix server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}
