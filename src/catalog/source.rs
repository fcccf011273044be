use std::time::Duration;

use reqwest::StatusCode;

use crate::catalog::error::{CatalogError, FetchError};

pub const DEFAULT_CATALOG_URL: &str = "https://celestrak.org/NORAD/elements/gnss.txt";

/// Where catalog documents come from.
pub trait CatalogSource {
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Blocking HTTP download with a bounded timeout.
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl CatalogSource for HttpSource {
    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = format!("{} returned {}", url, status);
            return Err(if is_transient_status(status) {
                FetchError::Transient(message)
            } else {
                FetchError::Permanent(message)
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(classify_request_error)
    }
}

fn classify_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        FetchError::Transient(e.to_string())
    } else {
        FetchError::Permanent(e.to_string())
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}
