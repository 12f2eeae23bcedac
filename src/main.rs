use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use rulegate::authz::RulesMiddleware;
use rulegate::registry::{self, BuiltinBundles, OperationRegistry};
use rulegate::{admin, settings, storage, web};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "rulegate",
    version,
    about = "Rule-based operation authorization service"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(?settings, "Loaded configuration");

    // init storage (database + migrations)
    let db = storage::init(&settings.database).await.into_diagnostic()?;

    // operations: administrative surface plus configured bundles
    let operations = Arc::new(OperationRegistry::new());
    let loader = Arc::new(BuiltinBundles::new());
    admin::register_admin_operations(&operations, &db, loader.clone());
    registry::sync_bundles(&db, &operations, loader.as_ref(), &settings.bundles)
        .await
        .into_diagnostic()?;
    tracing::info!(operations = operations.len(), "Operation registry ready");

    let rules = RulesMiddleware::new(db, Some(operations))?;

    web::serve(settings, rules).await?;
    Ok(())
}
