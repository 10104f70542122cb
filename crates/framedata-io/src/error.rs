use framedata_core::error::DatasetError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[cfg(feature = "parquet")]
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("{0}")]
    Options(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("other error: {0}")]
    Other(String),
}

impl Error {
    /// Prefix the message with `context` where the variant carries one.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match self {
            Error::NotFound(msg) => Error::NotFound(format!("{}: {}", ctx, msg)),
            Error::Options(msg) => Error::Options(format!("{}: {}", ctx, msg)),
            Error::Schema(msg) => Error::Schema(format!("{}: {}", ctx, msg)),
            Error::Unsupported(msg) => Error::Unsupported(format!("{}: {}", ctx, msg)),
            Error::Other(msg) => Error::Other(format!("{}: {}", ctx, msg)),
            other => Error::Other(format!("{}: {}", ctx, other)),
        }
    }

    /// True for missing files and objects, whichever backend reported it.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Error::ObjectStore(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Error::NotFound(path) => vec![
                format!("Check that '{}' exists and is readable", path),
                "Save the dataset before loading it".into(),
            ],
            Error::ObjectStore(_) => vec![
                "Check credentials and endpoint settings under 'credentials' or 'fs_args'".into(),
                "Enable the cargo feature for the storage backend (s3, gcs, azure, http)".into(),
            ],
            Error::Options(_) => vec![
                "Check the option name and value type for this format".into(),
            ],
            _ => vec![],
        }
    }
}

impl From<Error> for DatasetError {
    fn from(e: Error) -> Self {
        match e {
            Error::Options(msg) => DatasetError::Options(msg),
            other => DatasetError::storage(other),
        }
    }
}
