//! Tracing subscriber setup shared by the service and the trainer

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` directives are kept; the library
/// and the calling binary log at the configured level.
pub fn init(config: &LoggingConfig, binary: &str) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("fraud_threshold_service={}", config.level).parse()?)
        .add_directive(format!("{}={}", binary, config.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}
