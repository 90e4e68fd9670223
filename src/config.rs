use std::env;

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line, for CloudWatch.
    #[default]
    Json,
    /// Compact human-readable lines, for local runs.
    Text,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "text" | "pretty" => Some(LogFormat::Text),
            _ => None,
        }
    }
}

// Get log format from LOG_FORMAT, falling back to JSON for unset or unknown values
pub fn get_log_format() -> LogFormat {
    if let Ok(value) = env::var("LOG_FORMAT") {
        if let Some(format) = LogFormat::parse(&value) {
            return format;
        }
    }
    LogFormat::default()
}
