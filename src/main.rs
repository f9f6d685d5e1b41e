use actix_web::rt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sales_api::config::Config;
use sales_api::db::Database;
use sales_api::schema;
use sales_api::server::{self, Server, ShutdownSignals};
use sales_api::services::ProductService;
use sales_api::state::AppState;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    sales_api::telemetry::init()?;

    info!("main: started");
    info!("main: config {}", config);

    let db = Database::connect(&config.db).await.map_err(|e| {
        error!("main: connecting to db: {}", e);
        e
    })?;
    info!("Database connected");

    let result = serve(&config, &db).await;
    db.close().await;

    match result {
        Ok(outcome) => {
            info!("main: completed ({:?} shutdown)", outcome);
            Ok(())
        }
        Err(e) => {
            error!("main: {:#}", e);
            Err(e)
        }
    }
}

async fn serve(config: &Config, db: &Database) -> anyhow::Result<server::ShutdownOutcome> {
    let signals = ShutdownSignals::register().map_err(|e| {
        error!("main: cannot listen for shutdown signals: {}", e);
        e
    })?;

    let report = schema::migrate(db.pool()).await?;
    info!("Database migrations completed, {} applied", report.applied.len());

    let state = AppState::new(ProductService::new(db.clone()));
    let api = Server::bind(&config.web, state)?;

    let shutdown = CancellationToken::new();
    rt::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = signals.recv().await {
                error!("main: waiting for shutdown signal: {}", e);
            }
            info!("main: start shutdown");
            shutdown.cancel();
        }
    });

    Ok(api.run(shutdown).await?)
}
