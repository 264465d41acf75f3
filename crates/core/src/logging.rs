//! Logging for the `groundwork` binary.
//!
//! Everything goes to stderr. `groundwork ask` streams the answer text to
//! stdout and `groundwork serve` writes nothing there, so the two never mix.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

/// Used when neither a level nor `RUST_LOG` is given. The HTTP stack logs
/// every connection at info, so it is held back to warnings.
pub const DEFAULT_FILTER: &str = "info,hyper=warn,hyper_util=warn,reqwest=warn,h2=warn";

/// Install the global subscriber.
///
/// `log_level` is any `EnvFilter` directive (`"debug"`,
/// `"groundwork_retrieval=trace"`); without it `RUST_LOG` applies, then
/// [`DEFAULT_FILTER`]. Fails if the directive does not parse or a subscriber
/// is already installed.
///
/// ```no_run
/// use groundwork_core::logging::init_logging;
///
/// init_logging(Some("debug"), true).expect("logging");
/// ```
pub fn init_logging(log_level: Option<&str>, no_color: bool) -> AppResult<()> {
    let directive = filter_directive(log_level, std::env::var("RUST_LOG").ok());

    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| AppError::Config(format!("Failed to init logging: {}", e)))
}

fn filter_directive(log_level: Option<&str>, rust_log: Option<String>) -> String {
    match (log_level, rust_log) {
        (Some(level), _) => level.to_string(),
        (None, Some(env)) if !env.trim().is_empty() => env,
        _ => DEFAULT_FILTER.to_string(),
    }
}
