//! # Logging
//!
//! `tracing` setup for the `seedkey` binary. Everything goes to stderr;
//! stdout is reserved for command output (JSON documents, hex strings).
//!
//! The filter comes from `RUST_LOG` when set. Otherwise `-v` picks one of
//! the directive sets below. Dependencies that chatter at `info` (sled,
//! reqwest, hyper) stay at `warn` until `-vv`.

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// Machine-parseable JSON lines.
    Json,
}

/// Directive sets indexed by `-v` count, capped at the last one.
const DIRECTIVES: [&str; 3] = [
    "seedkey=info,seedkey_core=warn,sled=warn,reqwest=warn,hyper=warn",
    "seedkey=debug,seedkey_core=info,sled=warn,reqwest=warn,hyper=warn",
    "seedkey=trace,seedkey_core=debug,sled=info,reqwest=debug,hyper=info",
];

/// Default directives for a given verbosity.
pub fn default_directives(verbosity: u8) -> &'static str {
    DIRECTIVES[usize::from(verbosity).min(DIRECTIVES.len() - 1)]
}

fn build_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)))
}

/// Install the global subscriber. Call once, early in `main()`.
pub fn init_logging(format: LogFormat, verbosity: u8) {
    let with_location = verbosity >= 2;

    let (pretty, json) = match format {
        LogFormat::Pretty => (
            Some(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(with_location)
                    .with_file(with_location)
                    .with_line_number(with_location),
            ),
            None,
        ),
        LogFormat::Json => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(false),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(build_filter(verbosity))
        .with(pretty)
        .with(json)
        .init();

    tracing::debug!(?format, verbosity, "logging initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_directive_set_parses() {
        for directives in DIRECTIVES {
            assert!(EnvFilter::try_new(directives).is_ok(), "{}", directives);
        }
    }

    #[test]
    fn verbosity_is_capped() {
        assert_eq!(default_directives(0), DIRECTIVES[0]);
        assert!(default_directives(1).starts_with("seedkey=debug"));
        assert_eq!(default_directives(2), default_directives(200));
    }

    #[test]
    fn quiet_default_keeps_dependencies_at_warn() {
        let quiet = default_directives(0);
        for target in ["sled", "reqwest", "hyper"] {
            assert!(quiet.contains(&format!("{}=warn", target)), "{}", target);
        }
    }
}
