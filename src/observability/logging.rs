//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config and environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Logs go to stderr so JSON results on stdout stay machine readable

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive for a configured level.
pub fn default_directive(level: &str) -> String {
    let level = match level.to_ascii_lowercase().as_str() {
        l @ ("trace" | "debug" | "info" | "warn" | "error") => l.to_string(),
        "warning" => "warn".to_string(),
        _ => "info".to_string(),
    };
    format!("repo_guardian={level},warn")
}

/// Initialize the global subscriber. Safe to call more than once.
pub fn init_logging(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(level).into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("DEBUG"), "repo_guardian=debug,warn");
        assert_eq!(default_directive("warning"), "repo_guardian=warn,warn");
        assert_eq!(default_directive("verbose"), "repo_guardian=info,warn");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logging("info");
        init_logging("debug");
    }
}
