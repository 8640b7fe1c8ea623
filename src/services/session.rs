use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("could not construct http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("target unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),
}

/// Connection-reusing HTTP client bound to one target base URL.
///
/// Carries authentication state for the whole run: cookies via the client's
/// cookie store, and an optional bearer token installed after a login call.
/// Transport failures (refused connection, timeout) surface as
/// [`SessionError::Unreachable`]; HTTP-level 4xx/5xx are normal responses
/// passed through to the caller unmodified.
pub struct TargetSession {
    client: Client,
    base: String,
    bearer: Option<String>,
}

impl TargetSession {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, SessionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("blvgate/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(SessionError::Build)?;

        Ok(TargetSession {
            client,
            base: base.trim_end_matches('/').to_string(),
            bearer: None,
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn set_bearer(&mut self, token: String) {
        self.bearer = Some(token);
    }

    pub fn clear_bearer(&mut self) {
        self.bearer = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn decorate(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.bearer {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Response, SessionError> {
        self.decorate(self.client.post(self.url(path)))
            .json(body)
            .send()
            .map_err(SessionError::Unreachable)
    }

    pub fn post_with(
        &self,
        path: &str,
        body: &Value,
        headers: HeaderMap,
    ) -> Result<Response, SessionError> {
        self.decorate(self.client.post(self.url(path)))
            .headers(headers)
            .json(body)
            .send()
            .map_err(SessionError::Unreachable)
    }

    pub fn get(&self, path: &str) -> Result<Response, SessionError> {
        self.decorate(self.client.get(self.url(path)))
            .send()
            .map_err(SessionError::Unreachable)
    }

    pub fn get_with(&self, path: &str, headers: HeaderMap) -> Result<Response, SessionError> {
        self.decorate(self.client.get(self.url(path)))
            .headers(headers)
            .send()
            .map_err(SessionError::Unreachable)
    }
}
