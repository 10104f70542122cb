#![forbid(unsafe_code)]
//! framedata-io: filesystems, frames and format readers/writers.
//!
//! - `fs`: the synchronous `FileSystem` trait, a local backend and an
//!   object-store backend (memory, S3, GCS, Azure, HTTP).
//! - `frame`: `DataFrame` (materialized Arrow batches) and `LazyFrame`
//!   (a deferred scan evaluated by `collect`).
//! - `readers` / `writers`: CSV and Parquet codecs driven by option maps.
//! - `dataset`: a format-aware view over remote files, scanned lazily.
//! - `registry`: format → (scan, read, write) routines.
//!
//! Parquet modules are feature-gated behind `parquet` (on by default).

pub mod dataset;
pub mod error;
pub mod frame;
pub mod fs;
pub mod glob;
pub mod options;
pub mod readers;
pub mod registry;
pub mod writers;

pub use dataset::FileDataset;
pub use error::{Error, Result};
pub use frame::{DataFrame, Frame, LazyFrame, Scan};
pub use fs::{filesystem, FileSystem, LocalFileSystem, ObjectStoreFileSystem, OpenArgs, OpenMode};
pub use registry::{FormatRegistry, FormatRoutines};
