//! Parquet reader with column projection (enabled with `--features parquet`).
//!
//! The footer is read when a scan is built, so a missing or corrupt file
//! fails early; row groups are decoded on `collect`.

use std::path::PathBuf;

use arrow_array::RecordBatchReader;
use arrow_schema::SchemaRef;
use bytes::Bytes;
use framedata_core::options::OptionMap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use parquet::file::reader::ChunkReader;

use super::open_local;
use crate::error::{Error, Result};
use crate::frame::{DataFrame, LazyFrame, Scan};
use crate::options::OptionReader;

pub const DEFAULT_BATCH_SIZE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParquetReadOptions {
    pub n_rows: Option<usize>,
    pub columns: Option<Vec<String>>,
    pub batch_size: usize,
}

impl Default for ParquetReadOptions {
    fn default() -> Self {
        Self {
            n_rows: None,
            columns: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ParquetReadOptions {
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        let mut r = OptionReader::new("parquet load", options);
        let parsed = Self {
            n_rows: r.usize("n_rows")?,
            columns: r.strings("columns")?,
            batch_size: r.usize("batch_size")?.unwrap_or(DEFAULT_BATCH_SIZE),
        };
        r.finish()?;
        if parsed.batch_size == 0 {
            return Err(Error::Options(
                "parquet load option 'batch_size' must be positive".into(),
            ));
        }
        Ok(parsed)
    }

    fn decode<T: ChunkReader + 'static>(&self, input: T) -> Result<DataFrame> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(input)?;
        let file_schema = builder.schema().clone();

        // Parquet yields projected columns in file order.
        let builder = match &self.columns {
            Some(columns) => {
                let mut indices = columns
                    .iter()
                    .map(|name| {
                        file_schema.index_of(name).map_err(|_| {
                            Error::Schema(format!("column '{}' not found in parquet schema", name))
                        })
                    })
                    .collect::<Result<Vec<usize>>>()?;
                indices.sort_unstable();
                indices.dedup();
                let mask = ProjectionMask::roots(builder.parquet_schema(), indices);
                builder.with_projection(mask)
            }
            None => builder,
        };
        let builder = match self.n_rows {
            Some(n) => builder.with_limit(n),
            None => builder,
        };

        let reader = builder.with_batch_size(self.batch_size).build()?;
        let schema: SchemaRef = reader.schema();
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        DataFrame::new(schema, batches)
    }
}

struct ParquetScan {
    path: PathBuf,
    options: ParquetReadOptions,
}

impl Scan for ParquetScan {
    fn describe(&self) -> String {
        format!("parquet scan of {}", self.path.display())
    }

    fn execute(self: Box<Self>) -> Result<DataFrame> {
        let file = open_local(&self.path)?;
        tracing::trace!(path = %self.path.display(), "decoding parquet");
        self.options.decode(file)
    }
}

/// Lazily scan a local Parquet file.
pub fn scan_parquet(path: &str, options: &OptionMap) -> Result<LazyFrame> {
    let options = ParquetReadOptions::from_options(options)?;
    let path = PathBuf::from(path);
    // Validates the footer without decoding any row group.
    ParquetRecordBatchReaderBuilder::try_new(open_local(&path)?)?;
    Ok(LazyFrame::new(ParquetScan { path, options }))
}

/// Decode a whole Parquet file held in memory.
pub fn read_parquet_bytes(data: Bytes, options: &OptionMap) -> Result<DataFrame> {
    ParquetReadOptions::from_options(options)?.decode(data)
}
