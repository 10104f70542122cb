#![forbid(unsafe_code)]
//! framedata: versioned CSV/Parquet datasets over local and remote storage.
//!
//! Re-exports the workspace crates:
//! - `framedata_core`: errors, formats, protocols, option maps, versions.
//! - `framedata_io`: filesystems, frames, codecs.
//! - `framedata_dataset`: `FrameDataset`, the `Dataset` trait, catalogs.

pub use framedata_core;
pub use framedata_dataset;
pub use framedata_io;

pub use framedata_core::{DatasetError, FileFormat, OptionMap, Protocol, Result, Version};
pub use framedata_dataset::{Catalog, CatalogEntry, Dataset, FrameDataset, FrameDatasetBuilder};
pub use framedata_io::{DataFrame, Frame, LazyFrame};

/// Build an `OptionMap` from a JSON object literal; anything else yields
/// an empty map.
pub fn options(value: serde_json::Value) -> OptionMap {
    match value {
        serde_json::Value::Object(map) => map.into_iter().collect(),
        _ => OptionMap::new(),
    }
}
