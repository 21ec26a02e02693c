//! Outbound HTTP: transport contract, cancellation, and the gateway
//! that every pipeline routes its network calls through.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;

use crate::error::FetchError;

/// Default per-call deadline when the caller does not override it.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Minimal HTTP method set needed by the dashboard pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// HTTP request envelope handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: &Value) -> Self {
        self.body = Some(body.to_string());
        self.headers
            .insert(String::from("content-type"), String::from("application/json"));
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// HTTP response envelope returned by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport-level failure class, before gateway normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

/// Transport-level HTTP error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    kind: TransportErrorKind,
    message: String,
}

impl HttpError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Connect,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Other,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract; production uses reqwest, tests script responses.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production HTTP client backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent("sentiboard/0.1.0")
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
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
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }
            builder = builder.timeout(Duration::from_millis(request.timeout_ms));
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    HttpError::timeout(format!("request timeout: {e}"))
                } else if e.is_connect() {
                    HttpError::connect(format!("connection failed: {e}"))
                } else {
                    HttpError::other(format!("request failed: {e}"))
                }
            })?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| HttpError::other(format!("failed to read response body: {e}")))?;

            Ok(HttpResponse { status, body })
        })
    }
}

/// One-shot cooperative cancellation handle. Cloning shares the flag;
/// once fired it can never be reset.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    fired: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.fired.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves when (or immediately after) the token fires.
    pub async fn cancelled(&self) {
        while !self.is_cancelled() {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

type AuthHook = Box<dyn Fn() + Send + Sync>;

/// Single point for all outbound API requests. Resolves paths against
/// the configured base URL, injects the bearer token, enforces the
/// per-call deadline, honors cancellation, and normalizes failures
/// into [`FetchError`]. No retries at this layer.
pub struct Gateway {
    base_url: String,
    token: std::sync::Mutex<Option<String>>,
    client: Arc<dyn HttpClient>,
    auth_hook: std::sync::Mutex<Option<AuthHook>>,
}

impl Gateway {
    pub fn new(base_url: impl Into<String>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            base_url: base_url.into(),
            token: std::sync::Mutex::new(None),
            client,
            auth_hook: std::sync::Mutex::new(None),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        let mut slot = self.token.lock().expect("token lock should not be poisoned");
        *slot = token;
    }

    /// Called once per 401 before the `Auth` error is surfaced.
    pub fn set_auth_invalidation_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        let mut slot = self
            .auth_hook
            .lock()
            .expect("auth hook lock should not be poisoned");
        *slot = Some(Box::new(hook));
    }

    /// GET against an API path with query parameters.
    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
        timeout_ms: u64,
        cancel: &CancelToken,
    ) -> Result<Value, FetchError> {
        let request =
            HttpRequest::get(self.resolve(path, params)).with_timeout_ms(timeout_ms);
        self.dispatch(request, cancel).await
    }

    /// POST a JSON body against an API path.
    pub async fn post(
        &self,
        path: &str,
        body: &Value,
        timeout_ms: u64,
        cancel: &CancelToken,
    ) -> Result<Value, FetchError> {
        let request = HttpRequest::post(self.resolve(path, &[]))
            .with_json_body(body)
            .with_timeout_ms(timeout_ms);
        self.dispatch(request, cancel).await
    }

    /// Raw escape hatch for calls outside the API base (search providers).
    pub async fn execute(
        &self,
        request: HttpRequest,
        cancel: &CancelToken,
    ) -> Result<Value, FetchError> {
        self.dispatch(request, cancel).await
    }

    fn resolve(&self, path: &str, params: &[(&str, &str)]) -> String {
        let base = self.base_url.trim_end_matches('/');
        let mut url = format!("{base}/{}", path.trim_start_matches('/'));
        if !params.is_empty() {
            let query = params
                .iter()
                .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    async fn dispatch(
        &self,
        mut request: HttpRequest,
        cancel: &CancelToken,
    ) -> Result<Value, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::cancelled());
        }

        {
            let token = self.token.lock().expect("token lock should not be poisoned");
            if let Some(token) = token.as_deref() {
                request
                    .headers
                    .entry(String::from("authorization"))
                    .or_insert_with(|| format!("Bearer {token}"));
            }
        }

        let deadline = Duration::from_millis(request.timeout_ms);
        let url = request.url.clone();
        log::debug!("{:?} {url}", request.method);

        let response = tokio::select! {
            outcome = tokio::time::timeout(deadline, self.client.execute(request)) => {
                match outcome {
                    Ok(Ok(response)) => response,
                    Ok(Err(error)) => return Err(Self::map_transport(error)),
                    Err(_) => {
                        return Err(FetchError::timeout(format!(
                            "request to {url} exceeded {} ms",
                            deadline.as_millis()
                        )))
                    }
                }
            }
            _ = cancel.cancelled() => return Err(FetchError::cancelled()),
        };

        self.interpret(response)
    }

    fn map_transport(error: HttpError) -> FetchError {
        match error.kind() {
            TransportErrorKind::Timeout => FetchError::timeout(error.message()),
            TransportErrorKind::Connect => FetchError::network(error.message()),
            TransportErrorKind::Other => FetchError::network(error.message()),
        }
    }

    fn interpret(&self, response: HttpResponse) -> Result<Value, FetchError> {
        if response.status == 401 {
            let hook = self
                .auth_hook
                .lock()
                .expect("auth hook lock should not be poisoned");
            if let Some(hook) = hook.as_ref() {
                hook();
            }
            return Err(FetchError::auth("authentication required"));
        }

        if !response.is_success() {
            let message = Self::upstream_message(&response.body)
                .unwrap_or_else(|| format!("upstream returned status {}", response.status));
            return Err(FetchError::http(response.status, message));
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|e| FetchError::parse(format!("invalid JSON in response: {e}")))
    }

    /// Prefer the provider's own message when the error body carries one.
    fn upstream_message(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        for field in ["error", "message", "detail"] {
            if let Some(text) = value.get(field).and_then(Value::as_str) {
                return Some(text.to_owned());
            }
        }
        None
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchErrorKind;
    use std::sync::atomic::AtomicUsize;

    struct ScriptedClient {
        responses: std::sync::Mutex<Vec<Result<HttpResponse, HttpError>>>,
    }

    impl ScriptedClient {
        fn replying(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                responses: std::sync::Mutex::new(vec![response]),
            })
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let next = self
                .responses
                .lock()
                .expect("script lock")
                .pop()
                .unwrap_or_else(|| Ok(HttpResponse::ok_json("{}")));
            Box::pin(async move { next })
        }
    }

    #[test]
    fn resolve_joins_base_path_and_encodes_params() {
        let gateway = Gateway::new(
            "https://example.test/api/",
            ScriptedClient::replying(Ok(HttpResponse::ok_json("{}"))),
        );
        let url = gateway.resolve("/stock-opinion", &[("symbol", "IBM"), ("q", "a b")]);
        assert_eq!(
            url,
            "https://example.test/api/stock-opinion?symbol=IBM&q=a%20b"
        );
    }

    #[tokio::test]
    async fn success_body_parses_to_json() {
        let gateway = Gateway::new(
            "/api",
            ScriptedClient::replying(Ok(HttpResponse::ok_json(r#"{"symbol":"IBM"}"#))),
        );
        let value = gateway
            .get("/stock-opinion", &[], 1_000, &CancelToken::new())
            .await
            .expect("success");
        assert_eq!(value["symbol"], "IBM");
    }

    #[tokio::test]
    async fn http_error_carries_upstream_message() {
        let gateway = Gateway::new(
            "/api",
            ScriptedClient::replying(Ok(HttpResponse {
                status: 404,
                body: String::from(r#"{"error":"Stock symbol not found"}"#),
            })),
        );
        let error = gateway
            .get("/stock-opinion", &[], 1_000, &CancelToken::new())
            .await
            .expect_err("http error");
        assert_eq!(error.kind(), FetchErrorKind::Http);
        assert_eq!(error.status(), Some(404));
        assert!(error.message().contains("Stock symbol not found"));
    }

    #[tokio::test]
    async fn unauthorized_fires_hook_and_maps_to_auth() {
        let gateway = Gateway::new(
            "/api",
            ScriptedClient::replying(Ok(HttpResponse {
                status: 401,
                body: String::new(),
            })),
        );
        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        gateway.set_auth_invalidation_hook(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        let error = gateway
            .get("/stock-opinion", &[], 1_000, &CancelToken::new())
            .await
            .expect_err("auth error");
        assert_eq!(error.kind(), FetchErrorKind::Auth);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pre_cancelled_token_short_circuits() {
        let gateway = Gateway::new(
            "/api",
            ScriptedClient::replying(Ok(HttpResponse::ok_json("{}"))),
        );
        let token = CancelToken::new();
        token.cancel();

        let error = gateway
            .get("/stock-opinion", &[], 1_000, &token)
            .await
            .expect_err("cancelled");
        assert_eq!(error.kind(), FetchErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_maps_to_timeout() {
        struct NeverClient;
        impl HttpClient for NeverClient {
            fn execute<'a>(
                &'a self,
                _request: HttpRequest,
            ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>
            {
                Box::pin(std::future::pending())
            }
        }

        let gateway = Gateway::new("/api", Arc::new(NeverClient));
        let error = gateway
            .get("/news/analyzed", &[("symbol", "IBM")], 3_000, &CancelToken::new())
            .await
            .expect_err("timeout");
        assert_eq!(error.kind(), FetchErrorKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_flight_resolves_cancelled() {
        struct NeverClient;
        impl HttpClient for NeverClient {
            fn execute<'a>(
                &'a self,
                _request: HttpRequest,
            ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>
            {
                Box::pin(std::future::pending())
            }
        }

        let gateway = Arc::new(Gateway::new("/api", Arc::new(NeverClient)));
        let token = CancelToken::new();

        let flight = {
            let gateway = Arc::clone(&gateway);
            let token = token.clone();
            tokio::spawn(async move {
                gateway
                    .get("/stock-opinion", &[], 60_000, &token)
                    .await
            })
        };

        tokio::task::yield_now().await;
        token.cancel();
        let error = flight.await.expect("join").expect_err("cancelled");
        assert_eq!(error.kind(), FetchErrorKind::Cancelled);
    }
}
