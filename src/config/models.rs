use crate::humanize::HumanDuration;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Crawl engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Name attached to every log line of this engine
    #[serde(default = "default_name")]
    pub name: String,
    /// HTTP method used for requests that don't specify one
    #[serde(default = "default_method")]
    pub default_method: String,
    /// Pause between consecutive fetches in milliseconds, `[min, max]`
    #[serde(default = "default_pause_range")]
    pub pause_range: Vec<u64>,
    /// Stop the engine once both queue and store stay empty
    #[serde(default = "default_auto_stop")]
    pub auto_stop: bool,
    #[serde(default = "default_liveness_interval")]
    pub liveness_interval: HumanDuration,
    #[serde(default = "default_flush_interval")]
    pub flush_interval: HumanDuration,
    /// Upper bound on how long an idle request loop waits before re-checking
    #[serde(default = "default_idle_poll")]
    pub idle_poll: HumanDuration,
    /// Seed for pacing and user-agent selection; random when unset
    pub seed: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            default_method: default_method(),
            pause_range: default_pause_range(),
            auto_stop: default_auto_stop(),
            liveness_interval: default_liveness_interval(),
            flush_interval: default_flush_interval(),
            idle_poll: default_idle_poll(),
            seed: None,
        }
    }
}

impl CrawlerConfig {
    /// Normalized pause range
    pub fn pause(&self) -> PauseRange {
        PauseRange::from_slice(&self.pause_range)
    }
}

fn default_name() -> String {
    "crawlbox".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_pause_range() -> Vec<u64> {
    vec![1000, 3000]
}

fn default_auto_stop() -> bool {
    true
}

fn default_liveness_interval() -> HumanDuration {
    HumanDuration::from_secs(5)
}

fn default_flush_interval() -> HumanDuration {
    HumanDuration::from_secs(1)
}

fn default_idle_poll() -> HumanDuration {
    HumanDuration::from_secs(1)
}

/// Inclusive pause range in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PauseRange {
    pub const DEFAULT: PauseRange = PauseRange {
        min_ms: 1000,
        max_ms: 3000,
    };

    pub const fn constant(ms: u64) -> Self {
        Self { min_ms: ms, max_ms: ms }
    }

    /// Builds a range from configured values.
    ///
    /// An empty slice yields the default `[1000, 3000]`. A single value or an
    /// inverted pair collapses to a constant pause of the first value.
    pub fn from_slice(values: &[u64]) -> Self {
        match values {
            [] => Self::DEFAULT,
            [only] => Self::constant(*only),
            [min, max, ..] if min > max => Self::constant(*min),
            [min, max, ..] => Self {
                min_ms: *min,
                max_ms: *max,
            },
        }
    }

    pub fn is_constant(&self) -> bool {
        self.min_ms == self.max_ms
    }
}

impl Default for PauseRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Timeout for rules that don't set their own
    #[serde(default = "default_timeout")]
    pub default_timeout: HumanDuration,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: HumanDuration,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Pool of user-agent strings, one picked at random per fetch
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            user_agents: default_user_agents(),
        }
    }
}

fn default_timeout() -> HumanDuration {
    HumanDuration::from_secs(30)
}

fn default_connect_timeout() -> HumanDuration {
    HumanDuration::from_secs(10)
}

fn default_max_redirects() -> usize {
    10
}

pub(crate) const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows; U; Windows NT 6.3; en-US) AppleWebKit/532.0 (KHTML, like Gecko) Chrome/3.0.196.2 Safari/532.0",
    "Mozilla/5.0 (Windows NT 6.2; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/32.0.1667.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/52.0.2743.116 Safari/537.36",
    "Mozilla/5.0 (Windows; U; Windows NT 6.3; en-US) AppleWebKit/532.0 (KHTML, like Gecko) Chrome/3.0.197.11 Safari/532.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:29.0) Gecko/20120101 Firefox/29.0",
    "Mozilla/5.0 (Windows; U; Windows NT 6.3; en-US) AppleWebKit/532.0 (KHTML, like Gecko) Chrome/4.0.201.1 Safari/532.0",
    "Mozilla/5.0 (Windows NT 5.1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/31.0.1650.63 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.3; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/43.2357.125 Safari/537.36 OPR/30.0.1835.88",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 10_0 like Mac OS X) AppleWebKit/602.1.50 (KHTML, like Gecko) Version/10.0 Mobile/14A5346a Safari/602.1",
];

fn default_user_agents() -> Vec<String> {
    USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.crawler.name, "crawlbox");
        assert_eq!(config.crawler.default_method, "GET");
        assert_eq!(config.crawler.pause(), PauseRange::DEFAULT);
        assert!(config.crawler.auto_stop);
        assert_eq!(config.http.default_timeout.as_duration(), Duration::from_secs(30));
        assert_eq!(config.http.user_agents.len(), 10);
    }

    #[test]
    fn test_pause_range_normalization() {
        assert_eq!(PauseRange::from_slice(&[]), PauseRange::DEFAULT);
        assert_eq!(PauseRange::from_slice(&[500]), PauseRange::constant(500));
        assert_eq!(PauseRange::from_slice(&[900, 300]), PauseRange::constant(900));
        assert_eq!(
            PauseRange::from_slice(&[300, 900]),
            PauseRange {
                min_ms: 300,
                max_ms: 900
            }
        );
        assert!(PauseRange::from_slice(&[7, 7]).is_constant());
    }
}
