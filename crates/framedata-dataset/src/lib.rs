#![forbid(unsafe_code)]
//! framedata-dataset: the CSV/Parquet dataset adapter.
//!
//! - `dataset`: the `Dataset` trait (load, save, exists, release).
//! - `frame_dataset`: `FrameDataset` and its builder.
//! - `versioning`: `<path>/<version>/<name>` resolution and the version cache.
//! - `strategy`: local scan vs. remote dataset scan.
//! - `catalog`: dataset definitions parsed from YAML/JSON.

pub mod catalog;
pub mod dataset;
pub mod frame_dataset;
pub mod strategy;
pub mod versioning;

pub use catalog::{resolve_type, Catalog, CatalogEntry, Credentials, Deprecation};
pub use dataset::Dataset;
#[allow(deprecated)]
pub use frame_dataset::FrameDataSet;
pub use frame_dataset::{FrameDataset, FrameDatasetBuilder};
pub use strategy::{strategy_for, LoadStrategy, LocalScan, RemoteScan};
pub use versioning::{VersionCache, VersionedPath};
