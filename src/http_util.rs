use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

pub fn user_agent() -> String {
    format!("hazard-indexer/{}", env!("CARGO_PKG_VERSION"))
}

/// Blocking client with the crate user agent and a per-request timeout.
/// `wrap` turns builder failures into the caller's error variant.
pub fn build_client<E>(timeout: Duration, wrap: impl Fn(String) -> E) -> Result<Client, E> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&user_agent()).map_err(|err| wrap(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| wrap(err.to_string()))
}

/// Splits a non-success response into its status code and body text.
pub fn failure_parts(response: Response, fallback: &str) -> (u16, String) {
    let status = response.status().as_u16();
    let message = response.text().unwrap_or_else(|_| fallback.to_string());
    (status, message)
}
