use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("Invalid sampling window: {0}")]
    InvalidWindow(String),
}
