//! Shared HTTP client construction and error-body handling.

use std::time::Duration;

use reqwest::Client;

/// Maximum length for error bodies kept in errors and logs.
const MAX_ERROR_BODY_LENGTH: usize = 200;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Creates an HTTP client with a connect timeout and the given request timeout.
pub(crate) fn create_http_client(request_timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
}

/// Truncates an error response body so tokens or whole documents never reach the logs.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.len() > MAX_ERROR_BODY_LENGTH {
        let cut = (0..=MAX_ERROR_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... (truncated)", &body[..cut])
    } else {
        body.to_string()
    }
}
