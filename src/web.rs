use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::{self, ApiState};
use crate::catalog::RouteCatalog;

pub fn app(catalog: Arc<RouteCatalog>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(ApiState { catalog }))
        .layer(cors)
}

pub async fn run(port: u16, catalog: Arc<RouteCatalog>) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://localhost:{}", port);
    axum::serve(listener, app(catalog))
        .await
        .context("Web server stopped unexpectedly")?;
    Ok(())
}
