//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` overrides `config.level` when set. Output goes to stderr so
/// commands that print results keep stdout clean. Calling this twice is a
/// no-op.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(
            builder
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .finish(),
        )
    };
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

/// Level string for a CLI verbosity flag.
pub fn level_for(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}
