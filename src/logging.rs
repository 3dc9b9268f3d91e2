//! Tracing subscriber setup shared by all binaries

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Set to `json` for machine-readable log lines
pub const LOG_FORMAT_ENV: &str = "COMPOUNDER_LOG_FORMAT";

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,compounder=debug,hyper=warn,reqwest=warn"));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
