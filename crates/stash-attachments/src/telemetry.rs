use stash_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for a host that does not install its own subscriber.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_telemetry(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.log_filter)?;
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!(
        environment = %config.environment,
        conflict_policy = %config.conflict_policy,
        "Tracing initialized"
    );
    Ok(())
}
