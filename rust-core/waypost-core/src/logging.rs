//! Tracing subscriber setup.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Output format of the log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human readable, for development
    Pretty,
}

fn default_directive() -> Directive {
    "waypost=info"
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into())
}

/// Install the global subscriber
///
/// `RUST_LOG` refines the default `waypost=info` filter. Calling this twice
/// is harmless; the second call leaves the first subscriber in place.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::from_default_env().add_directive(default_directive());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(LogFormat::Pretty);
        init_tracing(LogFormat::Json);
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }
}
