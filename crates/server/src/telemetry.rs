use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingSection};

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. Returns `false` when a subscriber was already set.
pub fn init(config: &LoggingSection) -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).try_init(),
        LogFormat::Bunyan => registry
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new(
                env!("CARGO_PKG_NAME").to_string(),
                std::io::stdout,
            ))
            .try_init(),
    };
    if let Err(e) = installed {
        tracing::warn!("Keeping the existing tracing subscriber: {e}");
        return false;
    }
    true
}
