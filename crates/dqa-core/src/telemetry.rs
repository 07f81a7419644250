//! Process-wide tracing setup for the `dqa` binary.
//!
//! Audit crates log at the requested level; dependencies stay at `warn` unless
//! `RUST_LOG` says otherwise. Output goes to stderr so that report and event
//! dumps on stdout can be piped.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const AUDIT_TARGETS: [&str; 2] = ["dqa_core", "dqa"];

/// Filter directives used when `RUST_LOG` is unset.
fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    AUDIT_TARGETS
        .iter()
        .fold(String::from("warn"), |mut directives, target| {
            directives.push_str(&format!(",{target}={level}"));
            directives
        })
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber, as JSON lines when `json` is set.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is kept.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let json_layer = json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter(level))
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_raise_only_audit_crates() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,dqa_core=debug,dqa=debug"
        );
        assert!(default_directives(Level::INFO).parse::<EnvFilter>().is_ok());
    }

    #[test]
    fn second_init_keeps_first_subscriber() {
        init_tracing(false, Level::INFO);
        assert!(!init_tracing(true, Level::TRACE));
    }
}
