use crate::errors::FitError;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use std::time::Duration;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Shared outbound client; every upstream client clones this handle.
pub fn build_client(timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS.min(timeout_secs.max(1))))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Maps a non-2xx response onto the upstream error taxonomy.
pub fn ensure_success(service: &'static str, response: Response) -> Result<Response, FitError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::UNAUTHORIZED => Err(FitError::Unauthorized { service }),
        StatusCode::NOT_FOUND => Err(FitError::NotFound { service }),
        status => Err(FitError::UpstreamHttp {
            service,
            status: status.as_u16(),
        }),
    }
}
