//! The interface every dataset implements.

use std::fmt;

use framedata_core::error::Result;

/// A named source/sink of data with a fixed configuration.
///
/// `load` and `save` report failures from storage or codecs as
/// `DatasetError::Load` / `DatasetError::Save` carrying the dataset's
/// description; configuration errors surface as their own variants.
pub trait Dataset: fmt::Display + Send + Sync {
    /// What `load` returns.
    type Load;
    /// What `save` accepts.
    type Save;

    fn load(&self) -> Result<Self::Load>;

    fn save(&self, data: Self::Save) -> Result<()>;

    /// False when the data, or any version of it, cannot be found.
    fn exists(&self) -> Result<bool>;

    /// Drop cached state (resolved versions, filesystem metadata).
    fn release(&self) -> Result<()>;
}
