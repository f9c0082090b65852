//! Tracing setup shared by Mnemos binaries
//!
//! Logs go to stderr so they never interleave with chat output on stdout.
//! Filter comes from `MNEMOS_LOG` (EnvFilter syntax), e.g.
//! `MNEMOS_LOG=mnemos_common=debug`.

use tracing_subscriber::EnvFilter;

/// Env var holding the log filter
pub const LOG_ENV: &str = "MNEMOS_LOG";

/// Default directive when `MNEMOS_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(crate::render::color_enabled(&std::io::stderr()))
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "warn");
        assert_eq!(default_directive(true), "debug");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init(false);
        init(true);
    }
}
