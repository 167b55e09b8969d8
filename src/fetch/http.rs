//! HTTP client issuing one call per queued request

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::HttpConfig;
use crate::rules::{OutgoingRequest, Request};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Too many redirects")]
    TooManyRedirects,

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Fetcher with a randomized user-agent per request
pub struct Fetcher {
    client: Client,
    user_agents: Vec<String>,
    rng: Mutex<StdRng>,
}

impl Fetcher {
    pub fn new(config: &HttpConfig, seed: Option<u64>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout.as_duration())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        let user_agents: Vec<String> = config
            .user_agents
            .iter()
            .filter(|ua| !ua.trim().is_empty())
            .cloned()
            .collect();

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            client,
            user_agents,
            rng: Mutex::new(rng),
        })
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agents
            .choose(&mut *self.rng.lock())
            .map(String::as_str)
    }

    /// Turn a queued request into an outgoing call with a random user-agent
    pub fn prepare(&self, request: &Request) -> Result<OutgoingRequest> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(request.method.clone()))?;

        let mut headers = HeaderMap::new();
        if let Some(ua) = self.user_agent() {
            let value = HeaderValue::from_str(ua)
                .map_err(|e| FetchError::InvalidRequest(format!("user-agent {:?}: {}", ua, e)))?;
            headers.insert(USER_AGENT, value);
        }

        Ok(OutgoingRequest {
            method,
            url: request.target.clone(),
            headers,
            body: Default::default(),
        })
    }

    /// Perform the call once, no retry
    pub async fn execute(&self, outgoing: &OutgoingRequest, timeout: Duration) -> Result<reqwest::Response> {
        debug!(method = %outgoing.method, url = %outgoing.url, ?timeout, "Fetching");

        let mut request = self
            .client
            .request(outgoing.method.clone(), &outgoing.url)
            .headers(outgoing.headers.clone())
            .timeout(timeout);

        if !outgoing.body.is_empty() {
            request = request.body(outgoing.body.clone());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(timeout)
            } else if e.is_redirect() {
                FetchError::TooManyRedirects
            } else if e.is_builder() {
                FetchError::InvalidRequest(format!("{}: {}", outgoing.url, e))
            } else if e.is_connect() {
                FetchError::Connect(e.to_string())
            } else {
                FetchError::RequestFailed(e.to_string())
            }
        })?;

        debug!(url = %outgoing.url, status = response.status().as_u16(), "Fetched");

        Ok(response)
    }

    /// `prepare` followed by `execute`
    pub async fn fetch(&self, request: &Request, timeout: Duration) -> Result<reqwest::Response> {
        let outgoing = self.prepare(request)?;
        self.execute(&outgoing, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> Fetcher {
        Fetcher::new(&HttpConfig::default(), Some(3)).unwrap()
    }

    #[test]
    fn test_prepare_sets_method_and_user_agent() {
        let request = Request::new("http://localhost/index").with_method("post");
        let outgoing = fetcher().prepare(&request).unwrap();

        assert_eq!(outgoing.method, Method::POST);
        assert_eq!(outgoing.url, "http://localhost/index");
        assert!(outgoing.body.is_empty());

        let ua = outgoing.headers.get("User-Agent").unwrap().to_str().unwrap();
        assert!(HttpConfig::default().user_agents.iter().any(|pool| pool == ua));
    }

    #[test]
    fn test_lowercase_header_replaces_user_agent() {
        let request = Request::new("http://localhost/");
        let mut outgoing = fetcher().prepare(&request).unwrap();

        outgoing
            .headers
            .insert("user-agent", HeaderValue::from_static("my-bot/1.0"));

        let values: Vec<_> = outgoing.headers.get_all(USER_AGENT).iter().collect();
        assert_eq!(values, vec![&HeaderValue::from_static("my-bot/1.0")]);
    }

    #[test]
    fn test_prepare_rejects_bad_method() {
        let request = Request::new("http://localhost/").with_method("NO SUCH");
        assert!(matches!(
            fetcher().prepare(&request),
            Err(FetchError::InvalidMethod(_))
        ));
    }

    #[test]
    fn test_single_user_agent_pool() {
        let config = HttpConfig {
            user_agents: vec!["only/1.0".to_string(), " ".to_string()],
            ..HttpConfig::default()
        };
        let fetcher = Fetcher::new(&config, None).unwrap();
        for _ in 0..5 {
            assert_eq!(fetcher.user_agent(), Some("only/1.0"));
        }
    }

    #[tokio::test]
    async fn test_execute_invalid_url() {
        let request = Request::new("not a url").with_method("GET");
        let result = fetcher().fetch(&request, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }
}
