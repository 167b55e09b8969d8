use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineState;
use crate::fetch::FetchError;

/// Errors surfaced by the crawl engine.
///
/// Inside the loops none of these are fatal: they are logged and the affected
/// request or collection is retried on the next pass.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("rule '{0}' is not registered")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(#[from] FetchError),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("sink did not accept collection '{0}'")]
    Sink(String),

    #[error("parse callback failed: {0}")]
    Callback(String),

    #[error("record could not be serialized: {0}")]
    Record(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("engine cannot start while {0}")]
    AlreadyStarted(EngineState),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CrawlError {
    /// Short label used as the `kind` field in logs
    pub fn kind(&self) -> &'static str {
        match self {
            CrawlError::Configuration(_) => "configuration",
            CrawlError::Transport(_) => "transport",
            CrawlError::Parse(_) => "parse",
            CrawlError::Sink(_) => "sink",
            CrawlError::Callback(_) => "callback",
            CrawlError::Record(_) => "record",
            CrawlError::Config(_) => "config",
            CrawlError::AlreadyStarted(_) => "lifecycle",
            CrawlError::Task(_) => "task",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_kinds() {
        assert_eq!(CrawlError::Configuration("x".into()).kind(), "configuration");
        assert_eq!(
            CrawlError::from(FetchError::Timeout(Duration::from_secs(1))).kind(),
            "transport"
        );
        assert_eq!(CrawlError::Parse("bad body".into()).kind(), "parse");
        assert_eq!(CrawlError::Sink("items".into()).kind(), "sink");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CrawlError::Configuration("leaf".into()).to_string(),
            "rule 'leaf' is not registered"
        );
        assert_eq!(
            CrawlError::AlreadyStarted(EngineState::Running).to_string(),
            "engine cannot start while running"
        );
    }
}
