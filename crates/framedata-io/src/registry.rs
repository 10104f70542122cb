//! File format → reader/writer routines.
//!
//! The dataset layer never names a codec directly; it looks the format up
//! here, so a build without a codec reports a missing routine instead of
//! failing to link.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use bytes::Bytes;
use framedata_core::format::FileFormat;
use framedata_core::options::OptionMap;

use crate::error::Result;
use crate::frame::{DataFrame, LazyFrame};
use crate::{readers, writers};

/// Lazily scan a local path.
pub type ScanFn = fn(&str, &OptionMap) -> Result<LazyFrame>;
/// Decode a whole file held in memory.
pub type ReadFn = fn(Bytes, &OptionMap) -> Result<DataFrame>;
/// Encode a frame into file bytes.
pub type WriteFn = fn(&DataFrame, &OptionMap) -> Result<Vec<u8>>;

#[derive(Clone, Copy)]
pub struct FormatRoutines {
    pub scan: ScanFn,
    pub read: ReadFn,
    pub write: WriteFn,
}

#[derive(Default)]
pub struct FormatRegistry {
    routines: HashMap<FileFormat, FormatRoutines>,
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.routines.keys().map(|k| k.as_str()).collect();
        formats.sort_unstable();
        f.debug_struct("FormatRegistry").field("formats", &formats).finish()
    }
}

impl FormatRegistry {
    /// Registry with every codec compiled into this build.
    pub fn new() -> Self {
        let mut r = Self::default();
        r.register(
            FileFormat::Csv,
            FormatRoutines {
                scan: readers::csv::scan_csv,
                read: readers::csv::read_csv_bytes,
                write: writers::csv::write_csv,
            },
        );
        #[cfg(feature = "parquet")]
        r.register(
            FileFormat::Parquet,
            FormatRoutines {
                scan: readers::parquet::scan_parquet,
                read: readers::parquet::read_parquet_bytes,
                write: writers::parquet::write_parquet,
            },
        );
        r
    }

    /// Shared default registry.
    pub fn global() -> &'static FormatRegistry {
        static GLOBAL: OnceLock<FormatRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FormatRegistry::new)
    }

    pub fn register(&mut self, format: FileFormat, routines: FormatRoutines) {
        self.routines.insert(format, routines);
    }

    pub fn get(&self, format: FileFormat) -> Option<&FormatRoutines> {
        self.routines.get(&format)
    }

    pub fn contains(&self, format: FileFormat) -> bool {
        self.routines.contains_key(&format)
    }
}
