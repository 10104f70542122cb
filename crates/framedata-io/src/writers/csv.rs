//! Arrow-based CSV writer.

use arrow_array::RecordBatch;
use arrow_csv::WriterBuilder;
use framedata_core::options::OptionMap;

use crate::error::{Error, Result};
use crate::frame::DataFrame;
use crate::options::OptionReader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvWriteOptions {
    pub include_header: bool,
    pub separator: u8,
    pub quote_char: Option<u8>,
    pub null_value: Option<String>,
    pub date_format: Option<String>,
    pub datetime_format: Option<String>,
    pub time_format: Option<String>,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            include_header: true,
            separator: b',',
            quote_char: None,
            null_value: None,
            date_format: None,
            datetime_format: None,
            time_format: None,
        }
    }
}

impl CsvWriteOptions {
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        let mut r = OptionReader::new("csv save", options);
        let include_header = r.bool("include_header")?;
        let has_header = r.bool("has_header")?;
        if let (Some(a), Some(b)) = (include_header, has_header) {
            if a != b {
                return Err(Error::Options(
                    "csv save options 'include_header' and 'has_header' disagree".into(),
                ));
            }
        }
        let parsed = Self {
            include_header: include_header.or(has_header).unwrap_or(true),
            separator: r.byte("separator")?.unwrap_or(b','),
            quote_char: r.byte("quote_char")?,
            null_value: r.string("null_value")?,
            date_format: r.string("date_format")?,
            datetime_format: r.string("datetime_format")?,
            time_format: r.string("time_format")?,
        };
        r.finish()?;
        Ok(parsed)
    }

    fn builder(&self) -> WriterBuilder {
        let mut builder = WriterBuilder::new()
            .with_header(self.include_header)
            .with_delimiter(self.separator);
        if let Some(q) = self.quote_char {
            builder = builder.with_quote(q);
        }
        if let Some(null) = &self.null_value {
            builder = builder.with_null(null.clone());
        }
        if let Some(f) = &self.date_format {
            builder = builder.with_date_format(f.clone());
        }
        if let Some(f) = &self.datetime_format {
            builder = builder.with_datetime_format(f.clone());
        }
        if let Some(f) = &self.time_format {
            builder = builder.with_time_format(f.clone());
        }
        builder
    }
}

/// Serialize `df` as CSV.
///
/// A frame without rows still produces the header line.
pub fn write_csv(df: &DataFrame, options: &OptionMap) -> Result<Vec<u8>> {
    let options = CsvWriteOptions::from_options(options)?;
    let mut buf = Vec::new();
    {
        let mut writer = options.builder().build(&mut buf);
        if df.batches().is_empty() {
            writer.write(&RecordBatch::new_empty(df.schema()))?;
        }
        for batch in df.batches() {
            writer.write(batch)?;
        }
    }
    tracing::trace!(bytes = buf.len(), rows = df.num_rows(), "encoded csv");
    Ok(buf)
}
