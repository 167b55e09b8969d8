use super::models::Config;
use reqwest::Method;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid default HTTP method '{method}'")]
    InvalidDefaultMethod { method: String },

    #[error("Duration must be positive: {field}")]
    ZeroDuration { field: &'static str },

    #[error("User-agent pool is empty")]
    EmptyUserAgentPool,

    #[error("pause_range takes at most two values, got {count}")]
    PauseRangeTooLong { count: usize },

    #[error("Crawler name must not be empty")]
    EmptyName,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_crawler(config)?;
    validate_http(config)?;
    Ok(())
}

fn validate_crawler(config: &Config) -> Result<(), ValidationError> {
    let crawler = &config.crawler;

    if crawler.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let method = crawler.default_method.to_uppercase();
    if Method::from_bytes(method.as_bytes()).is_err() {
        return Err(ValidationError::InvalidDefaultMethod {
            method: crawler.default_method.clone(),
        });
    }

    // Inverted and single-value ranges are normalized, not rejected
    if crawler.pause_range.len() > 2 {
        return Err(ValidationError::PauseRangeTooLong {
            count: crawler.pause_range.len(),
        });
    }

    for (field, value) in [
        ("crawler.liveness_interval", crawler.liveness_interval),
        ("crawler.flush_interval", crawler.flush_interval),
        ("crawler.idle_poll", crawler.idle_poll),
    ] {
        if value.is_zero() {
            return Err(ValidationError::ZeroDuration { field });
        }
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    let http = &config.http;

    if http.default_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "http.default_timeout",
        });
    }
    if http.connect_timeout.is_zero() {
        return Err(ValidationError::ZeroDuration {
            field: "http.connect_timeout",
        });
    }

    if http.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ValidationError::EmptyUserAgentPool);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::HumanDuration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_lowercase_method_accepted() {
        let mut config = Config::default();
        config.crawler.default_method = "post".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_method_rejected() {
        let mut config = Config::default();
        config.crawler.default_method = "GE T".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidDefaultMethod { .. })
        ));
    }

    #[test]
    fn test_inverted_pause_range_accepted() {
        let mut config = Config::default();
        config.crawler.pause_range = vec![3000, 1000];
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_long_pause_range_rejected() {
        let mut config = Config::default();
        config.crawler.pause_range = vec![1, 2, 3];
        assert!(matches!(
            validate(&config),
            Err(ValidationError::PauseRangeTooLong { count: 3 })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.http.default_timeout = HumanDuration::from_millis(0);
        assert!(matches!(
            validate(&config),
            Err(ValidationError::ZeroDuration {
                field: "http.default_timeout"
            })
        ));
    }

    #[test]
    fn test_empty_user_agents_rejected() {
        let mut config = Config::default();
        config.http.user_agents = vec!["  ".to_string()];
        assert!(matches!(validate(&config), Err(ValidationError::EmptyUserAgentPool)));
    }
}
