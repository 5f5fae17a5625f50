use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlickrError>;

#[derive(Debug, Error)]
pub enum FlickrError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error (status {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Flickr API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),
}

impl FlickrError {
    /// EXIF of private or restricted photos is refused with this; expected, not worth a warning.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            FlickrError::Api { message, .. } => message.contains("Permission denied"),
            FlickrError::Http { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }

    /// Worth another attempt: transport failures, 5xx and rate limiting.
    pub fn is_transient(&self) -> bool {
        match self {
            FlickrError::Network(_) => true,
            FlickrError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FlickrError {
    fn from(err: reqwest::Error) -> Self {
        FlickrError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FlickrError {
    fn from(err: serde_json::Error) -> Self {
        FlickrError::Parse(err.to_string())
    }
}
