//! Tracing bootstrap shared by every bookstore binary.

use bookstore_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Calling this twice is harmless:
/// the second subscriber is dropped and `false` is returned.
pub fn init(settings: &TelemetrySettings) -> bool {
    let env_filter = build_filter(settings);

    let installed = match settings.log_format {
        LogFormat::Pretty => fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .try_init(),
        LogFormat::Json => fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .try_init(),
    }
    .is_ok();

    if installed {
        tracing::info!(
            target: "bookstore-telemetry",
            format = ?settings.log_format,
            "telemetry initialized"
        );
    }

    installed
}

fn build_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
