//! Format readers. Each exposes a lazy local scan and an eager decode of
//! in-memory bytes, both driven by an option map.

pub mod csv;
#[cfg(feature = "parquet")]
pub mod parquet;

use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

/// Open a local file for reading, reporting a missing file as `NotFound`.
pub(crate) fn open_local(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::Io(e),
    })
}
