use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown order status: {0}")]
    InvalidStatus(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
