//! Thin JSON-over-HTTP wrapper that remembers the most recent call.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde_json::Value;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shown in place of any credential-bearing query parameter.
pub const REDACTED: &str = "API_KEY_HIDDEN";

const SECRET_PARAMS: &[&str] = &["appid", "apikey", "api_key", "key", "access_token"];

/// Method, redacted URL, status and body of one HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTrace {
    pub method: Method,
    pub url: String,
    /// `None` when no response arrived.
    pub status: Option<u16>,
    pub body: Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed body, or the raw text as a JSON string when it was not JSON.
    pub data: Value,
    pub is_json: bool,
}

impl HttpResponse {
    /// The body as JSON, for callers that need one.
    pub fn json(self) -> Result<Value> {
        if !self.is_json {
            return Err(Error::Parse("response body is not valid JSON".into()));
        }
        Ok(self.data)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The `message` field a failing endpoint may put in its body.
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }

    pub(crate) fn into_remote_error(self, fallback: &str) -> Error {
        let message = self.message().unwrap_or(fallback).to_string();
        Error::Remote { status: self.status, message }
    }
}

/// Cloning is cheap; clones share the connection pool, trace and call counter.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    trace: Arc<RwLock<Option<RequestTrace>>>,
    calls: Arc<AtomicU64>,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            trace: Arc::new(RwLock::new(None)),
            calls: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Number of requests issued so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// The most recent call, if any.
    pub fn last_trace(&self) -> Option<RequestTrace> {
        self.trace.read().clone()
    }

    pub async fn get(&self, url: Url) -> Result<HttpResponse> {
        self.request(Method::GET, url, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<HttpResponse> {
        self.request(Method::POST, url, Some(to_json(body)?)).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<HttpResponse> {
        self.request(Method::PUT, url, Some(to_json(body)?)).await
    }

    pub async fn delete(&self, url: Url) -> Result<HttpResponse> {
        self.request(Method::DELETE, url, None).await
    }

    /// Issue one request and parse its body as JSON when it is JSON.
    ///
    /// Any status and any body is returned as a response; only a missing
    /// response fails here (`Error::Network`). Callers that need a body go
    /// through [`HttpResponse::json`].
    ///
    /// Never retries. The live trace is overwritten either way.
    pub async fn request(&self, method: Method, url: Url, body: Option<Value>) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let shown_url = redact_url(&url);

        let mut req = self.http.request(method.clone(), url);
        if let Some(body) = &body {
            req = req.json(body);
        }

        let res = match req.send().await {
            Ok(res) => res,
            Err(e) => {
                tracing::warn!(%method, url = %shown_url, "request failed without a response");
                self.record(method, shown_url, None, Value::Null);
                return Err(Error::Network(e.without_url()));
            }
        };

        let status = res.status().as_u16();
        let text = match res.text().await {
            Ok(text) => text,
            Err(e) => {
                self.record(method, shown_url, Some(status), Value::Null);
                return Err(Error::Network(e.without_url()));
            }
        };

        tracing::debug!(%method, url = %shown_url, status, "request completed");

        let (data, is_json) = match parse_body(&text) {
            Ok(data) => (data, true),
            Err(_) => (Value::String(text), false),
        };

        self.record(method, shown_url, Some(status), data.clone());
        Ok(HttpResponse { status, data, is_json })
    }

    fn record(&self, method: Method, url: String, status: Option<u16>, body: Value) {
        *self.trace.write() = Some(RequestTrace { method, url, status, body, timestamp: Utc::now() });
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| Error::Validation(format!("request body: {e}")))
}

/// Empty bodies (e.g. 204) parse as `null`.
fn parse_body(text: &str) -> serde_json::Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
}

/// Render `url` with every credential-bearing query value replaced by [`REDACTED`].
pub fn redact_url(url: &Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_secret_param(&k) { REDACTED.to_string() } else { v.into_owned() };
            (k.into_owned(), value)
        })
        .collect();

    let mut shown = url.clone();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(name))
}
