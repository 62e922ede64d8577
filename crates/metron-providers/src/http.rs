use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::BackendError;

/// Longest slice of an error body kept in a `Transport` message.
const MAX_ERROR_BODY: usize = 512;

/// One shared connection pool for every provider adapter.
pub fn build_client() -> Result<Client, BackendError> {
    Client::builder()
        .user_agent(concat!("metron/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {e}")))
}

/// POST `body` as JSON and decode the JSON reply.
///
/// Non-2xx statuses and connection failures are `Transport`; a body that is
/// not JSON is `Parse`. The whole exchange is bounded by `timeout`.
pub async fn post_json(
    request: RequestBuilder,
    body: &Value,
    timeout: Duration,
) -> Result<Value, BackendError> {
    let timeout_ms = timeout.as_millis() as u64;

    let text = tokio::time::timeout(timeout, async {
        let response = request.json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            warn!(status = %status, "Provider returned an error status");
            return Err(BackendError::Transport(format!(
                "HTTP {status}: {}",
                truncate(&text, MAX_ERROR_BODY)
            )));
        }
        Ok::<String, BackendError>(text)
    })
    .await
    .map_err(|_| BackendError::Timeout(timeout_ms))??;

    debug!(bytes = text.len(), "Provider replied");

    if text.trim().is_empty() {
        return Err(BackendError::Parse("Provider returned an empty body".to_string()));
    }

    serde_json::from_str(&text)
        .map_err(|e| BackendError::Parse(format!("Provider reply is not JSON: {e}")))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc");
        // 'é' is two bytes; cutting at 2 would split it.
        assert_eq!(truncate("aéb", 2), "a");
    }
}
