//! Tracing subscriber setup

use crate::config::InstrumentationConfig;
use crate::error::{Error, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber
///
/// `RUST_LOG` wins over `config.log_level`; an unparsable filter falls back
/// to `info`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
///
/// # Examples
///
/// ```no_run
/// use portal_core::telemetry::init_tracing;
/// use portal_core::{PortalConfig, SessionState, SystemClock};
/// use std::sync::Arc;
///
/// fn main() -> portal_core::Result<()> {
///     let config = PortalConfig::from_env()?;
///     init_tracing(&config.instrumentation)?;
///
///     let mut session = SessionState::with_config(&config.session, Arc::new(SystemClock));
///     session.establish(session.issue_grant("abc"));
///     assert!(session.is_logged_in());
///     Ok(())
/// }
/// ```
pub fn init_tracing(config: &InstrumentationConfig) -> Result<()> {
    let env_filter = build_filter(config);

    let result = if config.json {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(env_filter)
            .try_init()
    };
    result.map_err(|e| Error::TracingInit(e.to_string()))?;

    tracing::info!(service = %config.service_name, "tracing initialized");
    Ok(())
}

fn build_filter(config: &InstrumentationConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
