#![forbid(unsafe_code)]
//! framedata-core: shared kernel for the framedata workspace.
//!
//! Pure types and small helpers only. There is **no I/O** here:
//! - `error`: the single `DatasetError` kind surfaced by datasets.
//! - `format`: accepted file formats.
//! - `protocol`: protocol/path splitting for `scheme://` filepaths.
//! - `options`: load/save/storage option maps.
//! - `version`: version descriptors, timestamps and versioned path layout.
//!
//! Crates that use this:
//! - framedata-io: filesystems, frames and format readers/writers.
//! - framedata-dataset: the dataset adapter, versioning and catalog entries.

pub mod error;
pub mod format;
pub mod options;
pub mod protocol;
pub mod version;

pub use error::{DatasetError, Result};
pub use format::FileFormat;
pub use options::OptionMap;
pub use protocol::Protocol;
pub use version::Version;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
