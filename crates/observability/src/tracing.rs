//! Subscriber construction (filter, format, writer).

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or unparsable.
    pub default_directives: String,
    /// Route output through libtest's capture.
    pub test_writer: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            default_directives: DEFAULT_DIRECTIVES.to_string(),
            test_writer: false,
        }
    }
}

impl LogSettings {
    pub fn for_tests() -> Self {
        Self {
            format: LogFormat::Pretty,
            default_directives: "debug".to_string(),
            test_writer: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_directives))
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(settings: LogSettings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(settings.filter())
        .with_target(false);

    // try_init fails once a subscriber is installed; that is the no-op case.
    let _ = match (settings.format, settings.test_writer) {
        (LogFormat::Json, false) => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init(),
        (LogFormat::Json, true) => builder.json().with_test_writer().try_init(),
        (LogFormat::Pretty, false) => builder.compact().try_init(),
        (LogFormat::Pretty, true) => builder.compact().with_test_writer().try_init(),
    };
}
