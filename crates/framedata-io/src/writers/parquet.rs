//! Parquet writer with compression support (enabled with `--features parquet`).
//!
//! Supports:
//! - Compression codecs (UNCOMPRESSED, SNAPPY, GZIP, LZ4_RAW, ZSTD, BROTLI)
//!   with optional levels
//! - Configurable row group size (rows)
//! - Column statistics on/off

use std::str::FromStr;

use framedata_core::options::OptionMap;
use parquet::arrow::ArrowWriter;
use parquet::basic::{BrotliLevel, Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};

use crate::error::{Error, Result};
use crate::frame::DataFrame;
use crate::options::OptionReader;

/// Compression codec for Parquet files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCompression {
    /// No compression
    Uncompressed,
    /// Snappy compression (fast, good compression)
    #[default]
    Snappy,
    /// GZIP compression (good compression ratio)
    Gzip,
    /// LZ4 raw block compression (very fast)
    Lz4,
    /// ZSTD compression (excellent compression ratio)
    Zstd,
    /// Brotli compression
    Brotli,
}

impl FromStr for ParquetCompression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "uncompressed" => Ok(Self::Uncompressed),
            "snappy" => Ok(Self::Snappy),
            "gzip" => Ok(Self::Gzip),
            "lz4" => Ok(Self::Lz4),
            "zstd" => Ok(Self::Zstd),
            "brotli" => Ok(Self::Brotli),
            other => Err(Error::Options(format!(
                "unknown parquet compression '{}' (expected uncompressed, snappy, gzip, lz4, zstd or brotli)",
                other
            ))),
        }
    }
}

impl ParquetCompression {
    /// Parquet codec, at `level` where the codec takes one.
    fn to_parquet_compression(self, level: Option<i64>) -> Result<Compression> {
        let unsigned = |level: i64| {
            u32::try_from(level).map_err(|_| {
                Error::Options(format!("parquet compression level {} is out of range", level))
            })
        };
        Ok(match (self, level) {
            (Self::Uncompressed, _) => Compression::UNCOMPRESSED,
            (Self::Snappy, _) => Compression::SNAPPY,
            (Self::Lz4, _) => Compression::LZ4_RAW,
            (Self::Gzip, None) => Compression::GZIP(GzipLevel::default()),
            (Self::Gzip, Some(l)) => Compression::GZIP(GzipLevel::try_new(unsigned(l)?)?),
            (Self::Zstd, None) => Compression::ZSTD(ZstdLevel::default()),
            (Self::Zstd, Some(l)) => {
                let l = i32::try_from(l).map_err(|_| {
                    Error::Options(format!("parquet compression level {} is out of range", l))
                })?;
                Compression::ZSTD(ZstdLevel::try_new(l)?)
            }
            (Self::Brotli, None) => Compression::BROTLI(BrotliLevel::default()),
            (Self::Brotli, Some(l)) => Compression::BROTLI(BrotliLevel::try_new(unsigned(l)?)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParquetWriteOptions {
    pub compression: ParquetCompression,
    pub compression_level: Option<i64>,
    /// Maximum rows per row group.
    pub row_group_size: Option<usize>,
    pub statistics: Option<bool>,
}

impl ParquetWriteOptions {
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        let mut r = OptionReader::new("parquet save", options);
        let compression = match r.string("compression")? {
            Some(name) => name.parse()?,
            None => ParquetCompression::default(),
        };
        let parsed = Self {
            compression,
            compression_level: r.i64("compression_level")?,
            row_group_size: r.usize("row_group_size")?,
            statistics: r.bool("statistics")?,
        };
        r.finish()?;
        Ok(parsed)
    }

    fn properties(&self) -> Result<WriterProperties> {
        let mut builder = WriterProperties::builder()
            .set_compression(self.compression.to_parquet_compression(self.compression_level)?);
        if let Some(rows) = self.row_group_size {
            if rows == 0 {
                return Err(Error::Options(
                    "parquet save option 'row_group_size' must be positive".into(),
                ));
            }
            builder = builder.set_max_row_group_size(rows);
        }
        if let Some(enabled) = self.statistics {
            builder = builder.set_statistics_enabled(if enabled {
                EnabledStatistics::Page
            } else {
                EnabledStatistics::None
            });
        }
        Ok(builder.build())
    }
}

/// Serialize `df` as a Parquet file.
pub fn write_parquet(df: &DataFrame, options: &OptionMap) -> Result<Vec<u8>> {
    let options = ParquetWriteOptions::from_options(options)?;
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, df.schema(), Some(options.properties()?))?;
    for batch in df.batches() {
        writer.write(batch)?;
    }
    writer.close()?;
    tracing::trace!(bytes = buf.len(), rows = df.num_rows(), "encoded parquet");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::parquet::read_parquet_bytes;
    use arrow_array::{ArrayRef, Int64Array};
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Arc;

    fn sample(n: i64) -> DataFrame {
        DataFrame::from_columns(vec![(
            "v",
            Arc::new(Int64Array::from((0..n).collect::<Vec<_>>())) as ArrayRef,
        )])
        .unwrap()
    }

    fn options(v: serde_json::Value) -> OptionMap {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn compression_names() {
        assert_eq!("ZSTD".parse::<ParquetCompression>().unwrap(), ParquetCompression::Zstd);
        assert!("lzo".parse::<ParquetCompression>().is_err());
        assert_eq!(ParquetCompression::default(), ParquetCompression::Snappy);
    }

    #[test]
    fn every_codec_reads_back() {
        for codec in ["uncompressed", "snappy", "gzip", "lz4", "zstd", "brotli"] {
            let data = write_parquet(&sample(10), &options(json!({"compression": codec}))).unwrap();
            let df = read_parquet_bytes(Bytes::from(data), &OptionMap::new()).unwrap();
            assert_eq!(df, sample(10), "codec {}", codec);
        }
    }

    #[test]
    fn row_groups_follow_row_group_size() {
        let data = write_parquet(&sample(10), &options(json!({"row_group_size": 3}))).unwrap();
        let reader = parquet::file::serialized_reader::SerializedFileReader::new(Bytes::from(data))
            .unwrap();
        use parquet::file::reader::FileReader;
        assert_eq!(reader.metadata().num_row_groups(), 4);
    }

    #[test]
    fn bad_levels_and_keys_are_rejected() {
        let bad_level = options(json!({"compression": "gzip", "compression_level": 99}));
        assert!(write_parquet(&sample(1), &bad_level).is_err());
        let unknown = options(json!({"partition_on": "v"}));
        assert!(write_parquet(&sample(1), &unknown).is_err());
    }
}
