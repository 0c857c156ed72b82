use std::env;

use anyhow::Result;
use denta_api::build_app;
use denta_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("denta_api");

    let bind = env::var("DENTA_BIND").unwrap_or_else(|_| "0.0.0.0:3978".to_string());

    let app = match build_app().await {
        Ok(app) => app,
        Err(err) => {
            tracing::error!(error = ?err, "startup failed; check DENTA_* configuration");
            return Err(err);
        }
    };

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "denta bot api started");

    axum::serve(listener, app).await?;
    Ok(())
}
