//! Elixir bona fide client.
//!
//! Pushes an applicant's user id to the Elixir registration endpoint as a
//! form post with basic auth. One call per invocation, never retried.

use std::time::Duration;

use hyper::ext::ReasonPhrase;
use reqwest::{Client, Response, StatusCode};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::Config;

/// Form field carrying the user id.
const USER_ID_FIELD: &str = "elixirid";

/// The Elixir call could not be completed.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("elixir request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("elixir request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ForwardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ForwardError::Timeout(e)
        } else {
            ForwardError::Transport(e)
        }
    }
}

/// Outcome of a completed Elixir call.
///
/// `reason` is the phrase Elixir put on its status line, or the canonical
/// phrase for the code when Elixir used the standard one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardResult {
    pub status: StatusCode,
    pub reason: String,
}

impl ForwardResult {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: status.canonical_reason().unwrap_or("").to_string(),
        }
    }

    /// Read status and reason phrase off an Elixir response.
    pub fn from_response(response: &Response) -> Self {
        match response.extensions().get::<ReasonPhrase>() {
            Some(reason) => Self {
                status: response.status(),
                reason: String::from_utf8_lossy(reason.as_bytes()).into_owned(),
            },
            None => Self::new(response.status()),
        }
    }

    /// Any 2xx counts as success.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Client for the Elixir bona fide endpoint.
#[derive(Debug, Clone)]
pub struct ElixirClient {
    client: Client,
    url: Url,
    userid: String,
    password: String,
    timeout: Option<Duration>,
}

impl ElixirClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.elixir_url.clone(),
            userid: config.elixir_userid.clone(),
            password: config.elixir_password.clone(),
            timeout: config.elixir_timeout(),
        }
    }

    /// Push bona fide status for `user_id`.
    pub async fn forward(&self, user_id: &str) -> Result<ForwardResult, ForwardError> {
        info!(
            url = %self.url,
            timeout_ms = self.timeout.map(|t| t.as_millis()),
            "elixir_push_starting"
        );

        let mut request = self
            .client
            .post(self.url.clone())
            .basic_auth(&self.userid, Some(&self.password))
            .form(&[(USER_ID_FIELD, user_id)]);

        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!(
                    url = %self.url,
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    error = %e,
                    "elixir_push_error"
                );
                return Err(e.into());
            }
        };

        let result = ForwardResult::from_response(&response);

        info!(
            status_code = result.status.as_u16(),
            reason = %result.reason,
            is_success = result.is_success(),
            "elixir_push_complete"
        );

        Ok(result)
    }
}
