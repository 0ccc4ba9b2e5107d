//! Built-in source adapters
//!
//! One module per platform, each implementing
//! [`SourceAdapter`](crate::core::source::SourceAdapter). Shared request
//! plumbing lives here.

pub mod frinkiac;
pub mod giphy;
pub mod mixkit;
pub mod morbotron;
pub mod pixabay;
pub mod wikimedia;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::core::error::AdapterError;

/// Send a request and reject non-success statuses
pub(crate) async fn send(request: RequestBuilder, source: &str) -> Result<Response, AdapterError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AdapterError::from_status(status, source));
    }
    Ok(response)
}

/// Send a request and decode its JSON body; malformed bodies are `ParseError`
pub(crate) async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, source: &str) -> Result<T, AdapterError> {
    let body = send(request, source).await?.text().await?;
    serde_json::from_str(&body).map_err(|e| AdapterError::parse(format!("{source}: malformed response: {e}")))
}

/// Send a request and return its body as text
pub(crate) async fn fetch_text(request: RequestBuilder, source: &str) -> Result<String, AdapterError> {
    Ok(send(request, source).await?.text().await?)
}

/// Trim a base URL so paths can be appended with `format!`
pub(crate) fn base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
