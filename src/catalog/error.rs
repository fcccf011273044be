use thiserror::Error;

/// Failure to obtain the catalog document from the remote source.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Worth retrying: timeouts, dropped connections, 408/429/5xx.
    #[error("transient fetch failure: {0}")]
    Transient(String),
    #[error("fetch failed: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Catalog file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client error: {0}")]
    Client(String),
}
