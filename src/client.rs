//! Authenticated API client used by every dashboard

use agency_protocol::ErrorBody;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::session::{SessionManager, TerminationReason, NO_CACHE_HEADERS};
use crate::state::ActivityEvent;
use crate::transport::{HttpRequest, HttpResponse};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Request body of a call
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialised to JSON; sets `Content-Type: application/json` unless the
    /// caller already set a content type.
    Json(Value),
    /// Sent verbatim.
    Text(String),
}

/// Method, extra headers and body of a call
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }
}

impl CallOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn delete() -> Self {
        Self::method(Method::DELETE)
    }

    pub fn method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn post<T: Serialize>(body: &T) -> Result<Self> {
        Self::method(Method::POST).json(body)
    }

    pub fn put<T: Serialize>(body: &T) -> Result<Self> {
        Self::method(Method::PUT).json(body)
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(body)?));
        Ok(self)
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case("Content-Type"))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a success body: JSON, or `None` when empty or not JSON.
fn parse_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    serde_json::from_str(body).ok()
}

fn forbidden_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| "Access denied".to_string())
}

fn failure_message(response: &HttpResponse) -> String {
    let text = response.body.trim();
    if text.is_empty() {
        format!("HTTP error {}", response.status)
    } else {
        text.to_string()
    }
}

/// Client for `/api/*` calls: bearer auth, no-cache headers, proactive
/// refresh and a single forced-refresh retry on 401.
#[derive(Debug, Clone)]
pub struct ApiClient {
    manager: Arc<SessionManager>,
}

impl ApiClient {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    /// Perform a call and return the parsed JSON body, if any.
    ///
    /// Errors: `SessionExpired` after the session was terminated,
    /// `Authorization` on 403 (session kept), `Api` on any other failure status.
    pub async fn call(&self, path: &str, options: CallOptions) -> Result<Option<Value>> {
        self.manager.record_activity(ActivityEvent::ApiCall);

        let auth_endpoint = self.manager.config().is_auth_endpoint(path);
        if !auth_endpoint {
            if let Err(e) = self.manager.refresh_token_if_needed(false).await {
                warn!(error = %e, "proactive token refresh failed");
            }
        }

        let url = self.manager.config().endpoint_url(path);
        let response = self.send(&url, &options).await?;

        match response.status {
            401 => self.handle_unauthorized(&url, &options, auth_endpoint).await,
            403 => Err(SessionError::authorization(forbidden_message(&response.body))),
            _ if !response.is_success() => {
                Err(SessionError::api(response.status, failure_message(&response)))
            }
            _ => Ok(parse_body(&response.body)),
        }
    }

    /// Like [`call`](Self::call), deserialising the body into `R`.
    pub async fn call_json<R: DeserializeOwned>(
        &self,
        path: &str,
        options: CallOptions,
    ) -> Result<Option<R>> {
        match self.call(path, options).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.call(path, CallOptions::get()).await
    }

    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Option<Value>> {
        self.call(path, CallOptions::post(body)?).await
    }

    pub async fn put<T: Serialize>(&self, path: &str, body: &T) -> Result<Option<Value>> {
        self.call(path, CallOptions::put(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<Option<Value>> {
        self.call(path, CallOptions::delete()).await
    }

    async fn handle_unauthorized(
        &self,
        url: &str,
        options: &CallOptions,
        auth_endpoint: bool,
    ) -> Result<Option<Value>> {
        if !auth_endpoint {
            debug!(url, "401, forcing token refresh before a single retry");
            let refreshed = match self.manager.refresh_token_if_needed(true).await {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    warn!(error = %e, "forced token refresh failed");
                    false
                }
            };

            if refreshed {
                let retry = self.send(url, options).await?;
                if retry.is_success() {
                    return Ok(parse_body(&retry.body));
                }
                debug!(status = retry.status, "retry after refresh failed");
            }
        }

        self.manager.terminate(TerminationReason::Unauthorized).await;
        Err(SessionError::session_expired(
            "Session expired. Please sign in again.",
        ))
    }

    fn build_request(&self, url: &str, options: &CallOptions) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(options.method.clone(), url);
        // Read the token on every send so a retry carries the refreshed one.
        let token = self.manager.token();

        // Caller headers are merged under the ones the wrapper owns.
        let owned = |name: &str| {
            (token.is_some() && name.eq_ignore_ascii_case("Authorization"))
                || NO_CACHE_HEADERS
                    .iter()
                    .any(|(n, _)| n.eq_ignore_ascii_case(name))
        };
        for (name, value) in options.headers.iter().filter(|(n, _)| !owned(n.as_str())) {
            request = request.header(name.clone(), value.clone());
        }

        match &options.body {
            Some(RequestBody::Json(value)) => {
                if options.content_type().is_none() {
                    request = request.header("Content-Type", JSON_CONTENT_TYPE);
                }
                request.body = Some(serde_json::to_string(value)?);
            }
            Some(RequestBody::Text(text)) => request.body = Some(text.clone()),
            None => {}
        }

        if let Some(token) = &token {
            request = request.header("Authorization", token.bearer());
        }
        for (name, value) in NO_CACHE_HEADERS {
            request = request.header(name, value);
        }

        Ok(request)
    }

    async fn send(&self, url: &str, options: &CallOptions) -> Result<HttpResponse> {
        let request = self.build_request(url, options)?;
        self.manager.transport().send(request).await
    }
}
