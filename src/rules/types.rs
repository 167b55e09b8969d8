use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use scraper::Html;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::engine::Engine;
use crate::error::CrawlError;

/// Parameters a rule carries forward from the request that produced it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store any serializable value under `key`, replacing an existing one
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.0.insert(key.into(), value);
        Ok(())
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Typed lookup; `Ok(None)` when the key is absent
    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, serde_json::Error> {
        self.0
            .get(key)
            .map(|value| T::deserialize(value))
            .transpose()
    }

    /// Typed lookup that treats a type mismatch like a missing key
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.try_get(key).ok().flatten()
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A pending fetch: where to go, how, and which rule handles the answer.
///
/// Empty `method` and `rule` are filled in by [`Engine::enqueue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bon::Builder)]
pub struct Request {
    #[builder(into)]
    pub target: String,
    #[builder(into, default)]
    pub method: String,
    #[builder(into, default)]
    pub rule: String,
    #[builder(default)]
    pub params: Params,
}

impl Request {
    pub fn new(target: impl Into<String>) -> Self {
        Self::builder().target(target).build()
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert_value(key, value);
        self
    }
}

/// The HTTP call about to be made; pre-request hooks may rewrite any part of it.
///
/// Header names are case-insensitive and `headers.insert` replaces every
/// earlier value, so a hook can override the user-agent picked by the fetcher.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully read response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    /// Final URL after redirects
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    /// Read the whole body of a response
    pub async fn read(response: reqwest::Response) -> Result<Self, CrawlError> {
        let status = response.status();
        let url = response.url().to_string();
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| CrawlError::Parse(format!("failed to read body from {}: {}", url, e)))?;

        Ok(Self {
            status,
            url,
            headers,
            body,
        })
    }

    /// Body decoded as UTF-8, invalid sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Everything a parse callback sees for one fetched request.
///
/// Lives for a single callback invocation. Requests and records added through it
/// go to the engine's staging areas and are picked up on later passes.
pub struct FetchContext<'a> {
    engine: &'a Engine,
    rule: &'a str,
    request: &'a OutgoingRequest,
    response: &'a FetchResponse,
    document: &'a Html,
    params: &'a Params,
}

impl<'a> FetchContext<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        rule: &'a str,
        request: &'a OutgoingRequest,
        response: &'a FetchResponse,
        document: &'a Html,
        params: &'a Params,
    ) -> Self {
        Self {
            engine,
            rule,
            request,
            response,
            document,
            params,
        }
    }

    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    pub fn rule(&self) -> &'a str {
        self.rule
    }

    pub fn request(&self) -> &'a OutgoingRequest {
        self.request
    }

    pub fn response(&self) -> &'a FetchResponse {
        self.response
    }

    pub fn status(&self) -> StatusCode {
        self.response.status
    }

    pub fn document(&self) -> &'a Html {
        self.document
    }

    pub fn params(&self) -> &'a Params {
        self.params
    }

    /// Shorthand for `params().get(key)`
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.params.get(key)
    }

    /// Queue a follow-up request
    pub fn enqueue(&self, request: Request) {
        self.engine.enqueue(request);
    }

    /// Append a record to collection `name`
    pub fn record<T: Serialize>(&self, name: &str, value: T) -> Result<(), CrawlError> {
        self.engine.record(name, value)
    }
}
