//! Diagnostics for the `tierbed` binary.
//!
//! Stdout belongs to [`OutputWriter`](crate::output::OutputWriter): reports
//! and `--output json` payloads go there and must stay parseable. Every log
//! line is therefore written to stderr, in both formats.
//!
//! Level precedence: `RUST_LOG`, then `--log-level`, then `[general].log_level`.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tierbed_core::config::GeneralConfig;

/// Installs the stderr subscriber.
///
/// `validate` calls this with defaults before the file is read, so a broken
/// config is still reported; every other command calls it once after loading.
/// A second call fails and the caller keeps the first subscriber.
///
/// `log_format` is `"json"` (one object per line, for CI log collectors) or
/// `"pretty"` (for a terminal).
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize JSON tracing subscriber: {}", e)
                })?;
        }
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| {
                    anyhow::anyhow!("failed to initialize pretty tracing subscriber: {}", e)
                })?;
        }
        _ => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                config.log_format
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        let config = GeneralConfig {
            log_level: "info".to_owned(),
            log_format: "xml".to_owned(),
        };
        let err = init_tracing(&config).expect_err("xml is not a log format");
        assert!(err.to_string().contains("xml"));
    }
}
