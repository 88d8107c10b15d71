//! Log subscriber setup
//!
//! Logs go to stderr so stdout carries only the dispatch response.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "faultline=info,faultline_core=info,faultline_infra_system=info";

/// Install the global subscriber
///
/// `RUST_LOG` overrides the default filter. `format` is `json` or `pretty`;
/// anything else falls back to pretty.
pub fn init_logging(format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| anyhow!("invalid log filter: {}", e))?;

    match format {
        "json" => {
            // Machine-readable: one JSON object per event
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
