use clap::{Parser, Subcommand};
use tracing::info;

use sales_api::config::DbConfig;
use sales_api::db::Database;
use sales_api::schema;

/// Operational tasks against the sales database.
#[derive(Parser)]
#[command(name = "sales-admin", about = "Sales API administration", version)]
struct Cli {
    #[command(flatten)]
    db: DbConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate,
    /// Insert the sample products
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    sales_api::telemetry::init()?;

    let db = Database::connect(&cli.db).await?;

    let result = match cli.command {
        Command::Migrate => schema::migrate(db.pool()).await.map(|report| {
            info!(
                "Migrations complete: applied {:?}, already applied {:?}",
                report.applied, report.skipped
            );
        }),
        Command::Seed => schema::seed(db.pool())
            .await
            .map(|rows| info!("Seed data complete: {} rows inserted", rows))
            .map_err(schema::MigrationError::from),
    };

    db.close().await;
    Ok(result?)
}
