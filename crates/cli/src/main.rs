use anyhow::Context;
use bookstore_app::{app::shutdown_signal, App};
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookstore catalog service
#[derive(Debug, Parser)]
#[command(name = "bookstore", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve {
        /// Override the configured listen port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Apply pending schema migrations and exit
    Migrate,
    /// Print the resolved configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookstore settings")?;

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Command::Migrate => {
            bookstore_telemetry::init(&settings.telemetry);
            let app = App::bootstrap(settings).await?;
            let applied = app.migrate().await?;
            tracing::info!(applied, "migrations complete");
            println!("applied {applied} migration(s)");
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            bookstore_telemetry::init(&settings.telemetry);
            tracing::info!(env = ?settings.environment, "bookstore CLI starting server");
            App::bootstrap(settings).await?.run(shutdown_signal()).await?;
        }
    }

    Ok(())
}
