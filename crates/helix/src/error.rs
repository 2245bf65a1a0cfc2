use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelixError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("helix api error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl HelixError {
    /// HTTP status reported by the API, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            HelixError::Api { status, .. } => Some(*status),
            HelixError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
