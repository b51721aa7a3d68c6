use std::env::var;

use serde::{Deserialize, Serialize};
use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
    util::TryInitError,
};

/// Output format of the log layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Logging section of the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default directive, overridden by `RUST_LOG`
    pub level: String,
    /// Overridden by `RUST_LOG_FORMAT`
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".into(), format: LogFormat::Compact }
    }
}

impl LogSettings {
    fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, falling back to info", self.level);
            LevelFilter::INFO
        })
    }

    /// The env var wins over the configured format
    fn effective_format(&self) -> LogFormat {
        match var("RUST_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok(_) => LogFormat::Compact,
            Err(_) => self.format,
        }
    }
}

pub fn init() {
    init_with(&LogSettings::default());
}

/// Install the global subscriber, ignoring a subscriber that is already set.
pub fn init_with(settings: &LogSettings) {
    if let Err(error) = try_init(settings) {
        warn!("Tracing subscriber already installed: {error}");
    }
}

/// Initialize tracing subscriber from the given settings.
pub fn try_init(settings: &LogSettings) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(settings.level_filter().into())
        .from_env_lossy();

    let log_layer = match settings.effective_format() {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer).try_init()
}
