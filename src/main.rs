use anyhow::Context;
use booksearch_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load booksearch settings")?;
    booksearch_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        port = settings.server.port,
        base_path = %settings.server.root(),
        "booksearch starting"
    );

    booksearch_app::run(settings).await
}
