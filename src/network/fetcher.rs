use log::debug;
use reqwest::Client;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::FetchError;

/// Build the client used for the single subscription request.
pub fn build_client(timeout_duration: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout_duration)
        .build()
        .map_err(FetchError::Client)
}

/// GET `url` once and return the raw body. Non-2xx statuses are errors.
pub async fn fetch_body(client: &Client, url: &str, timeout_duration: Duration) -> Result<Vec<u8>, FetchError> {
    match timeout(timeout_duration, get_bytes(client, url)).await {
        Ok(Ok(Ok(body))) => {
            debug!("fetched {} bytes from {}", body.len(), url);
            Ok(body)
        }
        Ok(Ok(Err(status))) => Err(FetchError::Status { url: url.to_string(), status }),
        Ok(Err(source)) if source.is_timeout() => Err(FetchError::Timeout {
            url: url.to_string(),
            timeout: timeout_duration,
        }),
        Ok(Err(source)) => Err(FetchError::Request { url: url.to_string(), source }),
        Err(_) => Err(FetchError::Timeout {
            url: url.to_string(),
            timeout: timeout_duration,
        }),
    }
}

async fn get_bytes(client: &Client, url: &str) -> Result<Result<Vec<u8>, u16>, reqwest::Error> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Ok(Err(status.as_u16()));
    }
    Ok(Ok(response.bytes().await?.to_vec()))
}
