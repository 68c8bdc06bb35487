// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Send a request and decode a JSON body.
///
/// Non-2xx answers become [`AppError::Upstream`] carrying the status and the
/// start of the body, so callers can log what the service said.
pub async fn send_json<T: DeserializeOwned>(service: &'static str, request: RequestBuilder) -> Result<T> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(AppError::upstream(service, format!("{status}: {snippet}")));
    }

    Ok(response.json::<T>().await?)
}
