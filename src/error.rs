use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScompError {
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("API key not provided")]
    MissingApiKey,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScompError>;
