//! Filesystem abstraction used by datasets.
//!
//! A `FileSystem` is a synchronous, object-safe handle for one protocol.
//! Paths are bare (no `scheme://`); object-store paths start with the
//! bucket. Two backends:
//! - `LocalFileSystem`: `std::fs`, no caching.
//! - `ObjectStoreFileSystem`: `object_store` stores bridged through a private
//!   runtime, with a metadata cache that callers drop via `invalidate_cache`.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use framedata_core::options::OptionMap;
use framedata_core::protocol::Protocol;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

pub mod local;
pub mod object;

pub use local::LocalFileSystem;
pub use object::ObjectStoreFileSystem;

pub trait FileSystem: fmt::Debug + Send + Sync {
    /// Protocol this handle serves.
    fn protocol(&self) -> &Protocol;

    /// True for files and directories.
    fn exists(&self, path: &str) -> Result<bool>;

    fn is_dir(&self, path: &str) -> Result<bool>;

    /// Paths matching `pattern`, sorted ascending. A missing prefix yields an
    /// empty list.
    fn glob(&self, pattern: &str) -> Result<Vec<String>>;

    /// Open `path` for binary reading and return its full contents.
    fn read(&self, path: &str, args: &OpenArgs) -> Result<Bytes>;

    /// Open `path` for binary writing and write `data` as its full contents.
    fn write(&self, path: &str, data: &[u8], args: &OpenArgs) -> Result<()>;

    /// Drop cached metadata for `path`, its parents and its children.
    fn invalidate_cache(&self, path: &str);

    /// Open-call keys this backend understands for `mode`, besides `mode`.
    fn open_arg_keys(&self, mode: OpenMode) -> &'static [&'static str];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

impl OpenMode {
    /// The mode string every open call is forced to.
    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "rb",
            OpenMode::Write => "wb",
        }
    }
}

/// Arguments for one side's open call (`open_args_load` / `open_args_save`).
///
/// `mode` is always forced to binary read/write; a caller-supplied value is
/// ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenArgs {
    args: OptionMap,
}

impl OpenArgs {
    pub fn new(args: OptionMap) -> Self {
        Self { args }
    }

    /// Parse the nested `open_args_*` value of `fs_args`.
    pub fn from_value(value: Option<&Value>) -> Result<Self> {
        match value {
            None | Some(Value::Null) => Ok(Self::default()),
            Some(Value::Object(map)) => Ok(Self {
                args: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            }),
            Some(other) => Err(Error::Options(format!(
                "open arguments must be a mapping, got {}",
                other
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn as_map(&self) -> &OptionMap {
        &self.args
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    /// Fail on keys `fs` does not understand for `mode`.
    pub fn validate(&self, fs: &dyn FileSystem, mode: OpenMode) -> Result<()> {
        let allowed = fs.open_arg_keys(mode);
        for (key, value) in &self.args {
            if key == "mode" {
                if value.as_str() != Some(mode.as_str()) {
                    debug!(given = %value, forced = mode.as_str(), "ignoring open mode");
                }
                continue;
            }
            if !allowed.contains(&key.as_str()) {
                return Err(Error::Options(format!(
                    "open argument '{}' is not supported by the {} filesystem when {}",
                    key,
                    fs.protocol(),
                    match mode {
                        OpenMode::Read => "loading",
                        OpenMode::Write => "saving",
                    }
                )));
            }
            if !value.is_string() {
                return Err(Error::Options(format!(
                    "open argument '{}' expects a string, got {}",
                    key, value
                )));
            }
        }
        Ok(())
    }
}

/// Build the filesystem handle for `protocol` from merged storage options.
pub fn filesystem(protocol: &Protocol, options: &OptionMap) -> Result<Arc<dyn FileSystem>> {
    debug!(%protocol, "creating filesystem");
    if protocol.is_local() {
        return Ok(Arc::new(LocalFileSystem::from_options(options)?));
    }
    if protocol.as_str() == "memory" {
        return Ok(Arc::new(ObjectStoreFileSystem::memory()?));
    }
    Ok(Arc::new(ObjectStoreFileSystem::for_protocol(
        protocol.clone(),
        options,
    )?))
}

/// Join a directory path and a child name with a single `/`.
pub(crate) fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}
