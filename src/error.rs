pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Request could not be sent or the body could not be read.
    #[error("fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("fetch {url}: unexpected status {status}")]
    Status { url: String, status: u16 },
    /// Payload parsed but broke a record invariant.
    #[error("invalid data: {0}")]
    Validation(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("settings: {0}")]
    Settings(String),
}

impl Error {
    pub fn fetch(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn storage(message: impl ToString) -> Self {
        Self::Storage(message.to_string())
    }

    /// True for the parse-error kind: malformed or invalid payloads.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Json(_) | Self::Validation(_))
    }
}

impl From<Error> for std::io::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::Io(error) => error,
            other => std::io::Error::new(std::io::ErrorKind::Other, other.to_string()),
        }
    }
}
