//! Accepted file formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Formats a dataset can be declared with. Matching is case-insensitive.
pub const ACCEPTED_FILE_FORMATS: &[&str] = &["csv", "parquet"];

const IO_DOCS: &str = "https://docs.rs/arrow-csv and https://docs.rs/parquet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Parquet,
}

impl FileFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_lowercase();
        match normalized.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "parquet" => Ok(FileFormat::Parquet),
            _ => Err(DatasetError::Format(format!(
                "'{}' is not an accepted format ({}) ensure that your 'file_format' \
                 parameter has been defined correctly as per the reader/writer API {}",
                normalized,
                ACCEPTED_FILE_FORMATS.join(", "),
                IO_DOCS
            ))),
        }
    }
}
