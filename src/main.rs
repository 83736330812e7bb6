use anyhow::Context;
use bookstore_app::{app::shutdown_signal, App};
use bookstore_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;
    bookstore_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookstore-app bootstrap starting"
    );

    let app = App::bootstrap(settings).await?;

    tracing::info!("bookstore-app bootstrap complete");
    app.run(shutdown_signal()).await
}
