#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Context;
use axum::{Router, routing::get};
use lens_api::{construct_router, repository::StudentRepository, state::State};
use lens_inference::Pipeline;
use sea_orm::Database;
use std::sync::Arc;

mod config;
mod metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    metrics::init_telemetry()?;

    tracing::info!("Starting Lens API Service");

    let config = config::Config::from_env()?;
    tracing::info!(
        "Loaded configuration: port={}, labels={}, model={}",
        config.port,
        config.pipeline.labels_source,
        config.pipeline.model.path.display()
    );

    let pipeline = Pipeline::bootstrap(&config.pipeline)
        .await
        .context("Failed to initialize the classification pipeline")?;
    tracing::info!("Pipeline ready with {} labels", pipeline.labels().len());

    let db = Database::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database_url))?;
    let students = StudentRepository::new(db);
    students
        .ensure_schema()
        .await
        .context("Failed to create the students table")?;

    let state = Arc::new(State::new(Arc::new(pipeline), students));

    let app = Router::new()
        .route("/metrics", get(metrics::handler))
        .merge(construct_router(state));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Lens API Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Received shutdown signal, draining connections");
}
