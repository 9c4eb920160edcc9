use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error for {table}: {message}")]
    Fetch { table: String, message: String },

    #[error("Backend returned {status} for {table}: {body}")]
    Backend {
        table: String,
        status: u16,
        body: String,
    },

    #[error("Malformed {table} rows: {message}")]
    Decode { table: String, message: String },

    #[error("No data available. Please check the data store connection.")]
    EmptyDataset,

    #[error("Invalid date window: {0}")]
    WindowParse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors that a loader may degrade to an empty table instead of
    /// aborting the whole load.
    pub fn is_recoverable_fetch(&self) -> bool {
        matches!(
            self,
            Error::Fetch { .. } | Error::Backend { .. } | Error::Decode { .. } | Error::Io(_)
        )
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Config(format!("invalid store URL: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
