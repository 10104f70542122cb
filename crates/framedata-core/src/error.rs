use thiserror::Error;

/// Canonical result for datasets.
pub type Result<T> = std::result::Result<T, DatasetError>;

/// Boxed cause carried by wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The one error kind a dataset surfaces. Variants only separate messages;
/// callers that care about the cause use `source()`.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{0}")]
    Format(String),

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Options(String),

    #[error("{0}")]
    Directory(String),

    #[error("{0}")]
    Partitioning(String),

    #[error("{0}")]
    MissingRoutine(String),

    #[error("{0}")]
    VersionNotFound(String),

    #[error("{0}")]
    VersionExists(String),

    #[error("Failed while loading data from data set {dataset}.\n{source}")]
    Load {
        dataset: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed while saving data to data set {dataset}.\n{source}")]
    Save {
        dataset: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed during exists check for data set {dataset}.\n{source}")]
    Exists {
        dataset: String,
        #[source]
        source: BoxError,
    },

    /// Failure raised by a lower layer (filesystem, codec) that has not been
    /// attributed to a dataset operation yet.
    #[error(transparent)]
    Storage(BoxError),

    #[error("Internal invariant failed: {0}")]
    Invariant(String),

    /// Error with context chain for better debugging
    #[error("Error in {context}: {source}")]
    Context {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl DatasetError {
    /// Wrap any lower-layer error as `Storage`.
    pub fn storage(err: impl Into<BoxError>) -> Self {
        DatasetError::Storage(err.into())
    }

    /// Add context to an error, creating an error chain.
    ///
    /// # Example
    /// ```rust,no_run
    /// use framedata_core::error::DatasetError;
    /// let err = DatasetError::Options("unexpected load option 'sep'".into());
    /// let err = err.with_context("while building catalog entry 'cars'");
    /// ```
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DatasetError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Attribute an unattributed storage failure to a load of `dataset`.
    /// Every other variant passes through untouched.
    pub fn into_load(self, dataset: impl Into<String>) -> Self {
        match self {
            DatasetError::Storage(source) => DatasetError::Load {
                dataset: dataset.into(),
                source,
            },
            other => other,
        }
    }

    /// Attribute an unattributed storage failure to a save of `dataset`.
    pub fn into_save(self, dataset: impl Into<String>) -> Self {
        match self {
            DatasetError::Storage(source) => DatasetError::Save {
                dataset: dataset.into(),
                source,
            },
            other => other,
        }
    }

    /// Attribute an unattributed storage failure to an exists check.
    pub fn into_exists(self, dataset: impl Into<String>) -> Self {
        match self {
            DatasetError::Storage(source) => DatasetError::Exists {
                dataset: dataset.into(),
                source,
            },
            other => other,
        }
    }

    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            DatasetError::Format(_) => vec![
                "Set 'file_format' to one of: csv, parquet".into(),
            ],
            DatasetError::Partitioning(_) => vec![
                "Remove 'partition_cols' from save_args".into(),
                "Write one file per partition with a partitioned dataset instead".into(),
            ],
            DatasetError::Options(msg) => {
                if msg.contains("storage_options") {
                    vec!["Move storage options under 'fs_args' or 'credentials'".into()]
                } else {
                    vec![
                        "Check the option name against the reader/writer options for this format".into(),
                    ]
                }
            }
            DatasetError::VersionNotFound(_) => vec![
                "Save the dataset at least once before loading it".into(),
                "Check that the credentials allow listing the dataset directory".into(),
            ],
            DatasetError::VersionExists(_) => vec![
                "Let the save version be generated instead of pinning it".into(),
            ],
            DatasetError::Directory(_) => vec![
                "Point 'filepath' at a file, not a directory".into(),
            ],
            _ => vec![],
        }
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(e: serde_json::Error) -> Self {
        DatasetError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_attributed_on_load() {
        let err = DatasetError::storage(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no such file",
        ));
        let err = err.into_load("FrameDataset(filepath=x.csv)");
        let msg = err.to_string();
        assert!(msg.starts_with("Failed while loading data from data set FrameDataset("));
        assert!(msg.ends_with("no such file"));
    }

    #[test]
    fn adapter_errors_pass_through_attribution() {
        let err = DatasetError::Partitioning("nope".into()).into_save("ds");
        assert!(matches!(err, DatasetError::Partitioning(_)));
    }

    #[test]
    fn context_wraps_source() {
        let err = DatasetError::Config("bad".into()).with_context("catalog entry 'cars'");
        match err {
            DatasetError::Context { context, source } => {
                assert_eq!(context, "catalog entry 'cars'");
                assert_eq!(source.to_string(), "bad");
            }
            _ => panic!("Expected Context variant"),
        }
    }

    #[test]
    fn partitioning_has_suggestions() {
        let err = DatasetError::Partitioning("x".into());
        assert!(err.suggestions().iter().any(|s| s.contains("partition_cols")));
    }
}
