//! How a resolved path turns into a `LazyFrame`.
//!
//! Local paths go straight to the format's scan routine. Remote paths have
//! no local file to scan, so they go through a `FileDataset` view bound to
//! the filesystem handle.

use std::sync::Arc;

use framedata_core::error::{DatasetError, Result};
use framedata_core::format::FileFormat;
use framedata_core::options::OptionMap;
use framedata_core::protocol::Protocol;
use framedata_io::fs::{FileSystem, OpenArgs};
use framedata_io::registry::FormatRoutines;
use framedata_io::{FileDataset, LazyFrame};
use tracing::debug;

/// Everything a strategy may need for one load.
pub struct LoadRequest<'a> {
    pub path: &'a str,
    pub format: FileFormat,
    pub routines: &'a FormatRoutines,
    pub load_args: &'a OptionMap,
    pub open_args: &'a OpenArgs,
    pub fs: &'a Arc<dyn FileSystem>,
}

pub trait LoadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn scan(&self, request: LoadRequest<'_>) -> Result<LazyFrame>;
}

/// Scan a local file with the configured load options.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScan;

impl LoadStrategy for LocalScan {
    fn name(&self) -> &'static str {
        "local scan"
    }

    fn scan(&self, request: LoadRequest<'_>) -> Result<LazyFrame> {
        Ok((request.routines.scan)(request.path, request.load_args)?)
    }
}

/// Scan through a `FileDataset` view. Load options are not forwarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteScan;

impl LoadStrategy for RemoteScan {
    fn name(&self) -> &'static str {
        "remote dataset scan"
    }

    fn scan(&self, request: LoadRequest<'_>) -> Result<LazyFrame> {
        if !request.load_args.is_empty() {
            debug!(
                path = request.path,
                keys = ?request.load_args.keys().collect::<Vec<_>>(),
                "load options are not applied to remote scans"
            );
        }
        let view = FileDataset::new(request.path, Arc::clone(request.fs), request.format)
            .map_err(DatasetError::from)?
            .with_open_args(request.open_args.clone());
        Ok(view.scan())
    }
}

/// Strategy for `protocol`.
pub fn strategy_for(protocol: &Protocol) -> &'static dyn LoadStrategy {
    if protocol.is_local() {
        &LocalScan
    } else {
        &RemoteScan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_protocol_scans_directly() {
        assert_eq!(strategy_for(&Protocol::local()).name(), "local scan");
        assert_eq!(strategy_for(&Protocol::new("s3")).name(), "remote dataset scan");
        assert_eq!(strategy_for(&Protocol::new("memory")).name(), "remote dataset scan");
    }
}
