use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// Filter used by the binaries when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "diamond_search=info,actix_web=info,reqwest=warn";

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Returns an error if a subscriber is already installed, which binaries treat as fatal
/// and tests may ignore.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
