use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;

/// User agent sent to every upstream provider.
pub const USER_AGENT: &str = "US-Financial-ICS/1.2";

const DEFAULT_TIMEOUT_MS: u64 = 25_000;
const SECRET_PARAMS: [&str; 2] = ["apikey", "token"];

/// Outbound GET request with query parameters kept apart from the base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Full URL with percent-encoded query string.
    pub fn full_url(&self) -> String {
        self.render_url(false)
    }

    /// URL safe to log: credential parameters are masked.
    pub fn redacted_url(&self) -> String {
        self.render_url(true)
    }

    fn render_url(&self, redact: bool) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }

        let pairs = self
            .query
            .iter()
            .map(|(name, value)| {
                let value = if redact && SECRET_PARAMS.contains(&name.as_str()) {
                    String::from("***")
                } else {
                    urlencoding::encode(value).into_owned()
                };
                format!("{}={value}", urlencoding::encode(name))
            })
            .collect::<Vec<_>>()
            .join("&");

        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{pairs}", self.url)
    }
}

/// HTTP response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Connect, timeout or body read failure.
    #[error("{0}")]
    Transport(String),
    /// The request could not be built; sending it again cannot succeed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl HttpError {
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        // reqwest errors embed the URL, which carries the API key.
        let error = error.without_url();
        if error.is_builder() {
            Self::InvalidRequest(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Adapter transport contract.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production transport over a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&request.url)
                .query(&request.query)
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

/// Deterministic offline transport: replies are queued per URL path and
/// every request is recorded.
///
/// A route with an exhausted queue keeps repeating its last reply; an unknown
/// route answers 404.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<HashMap<String, VecDeque<Result<HttpResponse, HttpError>>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply for requests whose base URL ends with `path_suffix`.
    pub fn respond(self, path_suffix: &str, reply: Result<HttpResponse, HttpError>) -> Self {
        self.lock_routes()
            .entry(path_suffix.to_owned())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn respond_json(self, path_suffix: &str, body: &str) -> Self {
        self.respond(path_suffix, Ok(HttpResponse::ok_json(body)))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self, path_suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.url.ends_with(path_suffix))
            .count()
    }

    fn lock_routes(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Result<HttpResponse, HttpError>>>> {
        self.routes
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn next_reply(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let mut routes = self.lock_routes();
        let Some(queue) = routes
            .iter_mut()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, queue)| queue)
        else {
            return Ok(HttpResponse::new(404, "not found"));
        };

        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "not found")))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(404, "not found")))
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let reply = self.next_reply(&request.url);
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
            reply
        })
    }
}
