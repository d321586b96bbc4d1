use std::path::PathBuf;

use anyhow::Context;
use booksearch_app::modules::books::catalog::Catalog;
use booksearch_db::QueryExecutor;
use booksearch_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "booksearch", version, about = "Browse a book catalog over HTTP")]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true, env = "BOOKSEARCH_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (local, staging, production)
    #[arg(long, global = true, env = "BOOKSEARCH_ENV", default_value = "local")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Port to listen on, overriding the configured one
        #[arg(long)]
        port: Option<u16>,
    },
    /// Check that the catalog store is reachable
    Ping,
    /// Print one page of titles starting with PREFIX as JSON
    Search {
        prefix: String,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        let mut settings = Settings::load_from(&config_dir, &self.env)
            .with_context(|| format!("failed to load settings from {}", config_dir.display()))?;
        settings.apply_port_env();
        Ok(settings)
    }
}

async fn catalog(settings: &Settings) -> anyhow::Result<Catalog> {
    let executor = QueryExecutor::connect(&settings.database)
        .await
        .context("failed to configure catalog connection pool")?;
    Catalog::new(executor, &settings.catalog).context("invalid catalog table configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing `.env` is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let mut settings = cli.settings()?;
    booksearch_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            tracing::info!(
                env = ?settings.environment,
                port = settings.server.port,
                "booksearch serve"
            );
            booksearch_app::run(settings).await
        }
        Command::Ping => {
            let catalog = catalog(&settings).await?;
            catalog
                .executor()
                .ping()
                .await
                .context("catalog store did not answer ping")?;
            catalog.executor().close().await;
            println!("ok");
            Ok(())
        }
        Command::Search { prefix, offset } => {
            let catalog = catalog(&settings).await?;
            let page = catalog
                .search(&prefix, offset)
                .await
                .context("catalog search failed")?;
            catalog.executor().close().await;
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
    }
}
