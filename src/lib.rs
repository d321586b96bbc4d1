//! Booksearch application library
//!
//! Wires the book catalog module into the kernel registry and runs the
//! HTTP server around it.

pub mod modules;
pub mod utils;

use anyhow::Context;
use booksearch_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build the registry, run every module through its lifecycle, and serve
/// until shutdown is requested.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, &settings)
        .await
        .context("failed to register modules")?;

    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = booksearch_http::start_server(&registry, &settings).await;

    // Modules are stopped even if the server failed
    let stopped = registry.stop_all().await;
    served?;
    stopped
}
