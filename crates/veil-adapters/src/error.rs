use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("No element matches selector: {0}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Request body is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Adapter cannot use this context: {0}")]
    UnsupportedContext(&'static str),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
