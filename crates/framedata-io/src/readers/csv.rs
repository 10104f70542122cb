//! Arrow-based CSV reader.
//!
//! The schema is inferred from the first `infer_schema_length` records when
//! the scan is built; rows are decoded only when the scan executes.

use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;

use arrow_csv::reader::Format;
use arrow_csv::ReaderBuilder;
use arrow_schema::{Schema, SchemaRef};
use bytes::Bytes;
use framedata_core::options::OptionMap;

use super::open_local;
use crate::error::{Error, Result};
use crate::frame::{DataFrame, LazyFrame, Scan};
use crate::options::OptionReader;

pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvReadOptions {
    pub has_header: bool,
    pub separator: u8,
    pub quote_char: Option<u8>,
    pub comment_prefix: Option<u8>,
    /// `None` scans every record.
    pub infer_schema_length: Option<usize>,
    pub n_rows: Option<usize>,
    pub columns: Option<Vec<String>>,
    pub batch_size: usize,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            separator: b',',
            quote_char: None,
            comment_prefix: None,
            infer_schema_length: Some(DEFAULT_INFER_SCHEMA_LENGTH),
            n_rows: None,
            columns: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl CsvReadOptions {
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        let defaults = Self::default();
        let mut r = OptionReader::new("csv load", options);
        let parsed = Self {
            has_header: r.bool("has_header")?.unwrap_or(defaults.has_header),
            separator: r.byte("separator")?.unwrap_or(defaults.separator),
            quote_char: r.byte("quote_char")?,
            comment_prefix: r.byte("comment_prefix")?,
            infer_schema_length: r
                .nullable_usize("infer_schema_length")?
                .unwrap_or(defaults.infer_schema_length),
            n_rows: r.usize("n_rows")?,
            columns: r.strings("columns")?,
            batch_size: r.usize("batch_size")?.unwrap_or(defaults.batch_size),
        };
        r.finish()?;
        if parsed.batch_size == 0 {
            return Err(Error::Options("csv load option 'batch_size' must be positive".into()));
        }
        Ok(parsed)
    }

    fn format(&self) -> Format {
        let mut format = Format::default()
            .with_header(self.has_header)
            .with_delimiter(self.separator);
        if let Some(q) = self.quote_char {
            format = format.with_quote(q);
        }
        if let Some(c) = self.comment_prefix {
            format = format.with_comment(c);
        }
        format
    }

    fn infer_schema<R: Read>(&self, reader: R) -> Result<SchemaRef> {
        let (schema, _) = self.format().infer_schema(reader, self.infer_schema_length)?;
        Ok(Arc::new(schema))
    }

    fn projection(&self, schema: &Schema) -> Result<Option<Vec<usize>>> {
        let Some(columns) = &self.columns else {
            return Ok(None);
        };
        columns
            .iter()
            .map(|name| {
                schema.index_of(name).map_err(|_| {
                    Error::Schema(format!("column '{}' not found in csv header", name))
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn decode<R: Read>(&self, reader: R, schema: SchemaRef) -> Result<DataFrame> {
        let mut builder = ReaderBuilder::new(Arc::clone(&schema))
            .with_header(self.has_header)
            .with_delimiter(self.separator)
            .with_batch_size(self.batch_size);
        if let Some(q) = self.quote_char {
            builder = builder.with_quote(q);
        }
        if let Some(c) = self.comment_prefix {
            builder = builder.with_comment(c);
        }
        let output = match self.projection(&schema)? {
            Some(indices) => {
                let projected = Arc::new(schema.project(&indices)?);
                builder = builder.with_projection(indices);
                projected
            }
            None => schema,
        };

        let mut batches = Vec::new();
        let mut remaining = self.n_rows;
        for batch in builder.build(reader)? {
            let batch = batch?;
            match remaining {
                Some(0) => break,
                Some(n) => {
                    let take = n.min(batch.num_rows());
                    batches.push(batch.slice(0, take));
                    remaining = Some(n - take);
                }
                None => batches.push(batch),
            }
        }
        DataFrame::new(output, batches)
    }

    /// Infer, rewind, decode.
    fn read_all<R: Read + Seek>(&self, mut reader: R) -> Result<DataFrame> {
        let schema = self.infer_schema(&mut reader)?;
        reader.seek(SeekFrom::Start(0))?;
        self.decode(reader, schema)
    }
}

struct CsvScan {
    path: PathBuf,
    options: CsvReadOptions,
    schema: SchemaRef,
}

impl Scan for CsvScan {
    fn describe(&self) -> String {
        format!("csv scan of {}", self.path.display())
    }

    fn execute(self: Box<Self>) -> Result<DataFrame> {
        let file = open_local(&self.path)?;
        tracing::trace!(path = %self.path.display(), "decoding csv");
        self.options.decode(file, self.schema)
    }
}

/// Lazily scan a local CSV file.
///
/// Fails now on bad options or a missing file; the rows are read by
/// `LazyFrame::collect`.
pub fn scan_csv(path: &str, options: &OptionMap) -> Result<LazyFrame> {
    let options = CsvReadOptions::from_options(options)?;
    let path = PathBuf::from(path);
    let schema = options.infer_schema(open_local(&path)?)?;
    Ok(LazyFrame::new(CsvScan {
        path,
        options,
        schema,
    }))
}

/// Decode a whole CSV document held in memory.
pub fn read_csv_bytes(data: Bytes, options: &OptionMap) -> Result<DataFrame> {
    let options = CsvReadOptions::from_options(options)?;
    options.read_all(std::io::Cursor::new(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{Array, Int64Array, StringArray};
    use arrow_schema::DataType;
    use serde_json::json;
    use std::io::Write;

    fn options(v: serde_json::Value) -> OptionMap {
        serde_json::from_value(v).unwrap()
    }

    fn write_temp(contents: &str) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        (dir, path.to_string_lossy().into_owned())
    }

    #[test]
    fn defaults() {
        let opts = CsvReadOptions::from_options(&OptionMap::new()).unwrap();
        assert_eq!(opts, CsvReadOptions::default());
    }

    #[test]
    fn unknown_option_fails_before_io() {
        let err = scan_csv("/definitely/missing.csv", &options(json!({"index": "value"})))
            .unwrap_err();
        assert!(matches!(err, Error::Options(_)));
    }

    #[test]
    fn scan_infers_types_and_collects() {
        let (_dir, path) = write_temp("col1,col2,col3\n1,4,5\n2,5,6\n");
        let df = scan_csv(&path, &OptionMap::new()).unwrap().collect().unwrap();
        assert_eq!(df.num_rows(), 2);
        assert_eq!(df.schema().field(0).data_type(), &DataType::Int64);
        let col = df.column("col3").unwrap();
        let col = col.as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(col.values(), &[5, 6]);
    }

    #[test]
    fn scan_of_missing_file_is_not_found() {
        let err = scan_csv("/definitely/missing.csv", &OptionMap::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn separator_projection_and_row_limit() {
        let (_dir, path) = write_temp("a;b;c\nx;1;2\ny;3;4\nz;5;6\n");
        let opts = options(json!({
            "separator": ";",
            "columns": ["c", "a"],
            "n_rows": 2,
            "batch_size": 1,
        }));
        let df = scan_csv(&path, &opts).unwrap().collect().unwrap();
        assert_eq!(df.column_names(), vec!["c", "a"]);
        assert_eq!(df.num_rows(), 2);
        let a = df.column("a").unwrap();
        let a = a.as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(a.value(1), "y");
    }

    #[test]
    fn headerless_input_gets_generated_names() {
        let bytes = Bytes::from_static(b"1,2\n3,4\n");
        let df = read_csv_bytes(bytes, &options(json!({"has_header": false}))).unwrap();
        assert_eq!(df.num_rows(), 2);
        assert_eq!(df.num_columns(), 2);
    }

    #[test]
    fn unknown_projected_column_is_an_error() {
        let bytes = Bytes::from_static(b"a,b\n1,2\n");
        let err = read_csv_bytes(bytes, &options(json!({"columns": ["z"]}))).unwrap_err();
        assert!(err.to_string().contains("'z'"));
    }
}
