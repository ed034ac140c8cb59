use dotenvy::dotenv;
use loyalty_ledger::api;
use loyalty_ledger::config::settings::{self, StaticBranchDirectory};
use loyalty_ledger::config::database;
use loyalty_ledger::errors::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration and branch directory
    let config = settings::load_default_config()?;
    let branches = Arc::new(StaticBranchDirectory::from_config(&config.branches));
    info!(
        branches = config.branches.len(),
        "Configuration loaded"
    );

    // 4. Initialize the database
    let db = database::create_connection().await?;
    database::create_tables(&db).await?;
    info!("Database initialized");

    // 5. Serve the REST API until stopped
    api::serve(&config, db, branches).await
}
