//! Structured Logging
//!
//! Two output modes selected by `LOG_FORMAT`:
//! - `json` for log aggregation in deployed environments
//! - anything else (or unset) for human-readable development output
//!
//! Level filtering follows `RUST_LOG` and falls back to `info`, e.g.
//! `RUST_LOG=ft_platform=debug,tower_http=info`.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const DEFAULT_FILTER: &str = "info";

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    /// Parse the `LOG_FORMAT` value. Unknown values mean text.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    /// Read the format from the `LOG_FORMAT` environment variable.
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("LOG_FORMAT").unwrap_or_default())
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber.
///
/// Must be called once, before any other tracing call.
pub fn init_logging(service_name: &str) {
    let format = LogFormat::from_env();
    match format {
        LogFormat::Json => init_json_logging(env_filter()),
        LogFormat::Text => init_text_logging(env_filter()),
    }

    tracing::info!(service = %service_name, ?format, "Logging initialized");
}

fn init_json_logging(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .flatten_event(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .init();
}

fn init_text_logging(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(true),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }

    #[test]
    fn test_default_filter_builds() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert_eq!(filter.to_string(), "info");
    }
}
