//! Dataset definitions as data.
//!
//! A catalog is a YAML (or JSON) mapping of dataset name to entry:
//!
//! ```yaml
//! cars:
//!   type: framedata.FrameDataset
//!   filepath: s3://bucket/01_raw/cars.csv
//!   file_format: csv
//!   load_args: { separator: "," }
//!   versioned: true
//!   credentials: dev_s3
//! ```
//!
//! `credentials` is either inline options or the name of an entry in the
//! credentials map given to `Catalog::with_credentials`.

use std::collections::BTreeMap;
use std::fmt;

use framedata_core::error::{DatasetError, Result};
use framedata_core::options::OptionMap;
use framedata_core::version::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::frame_dataset::FrameDataset;

const TYPE_NAMES: &[&str] = &["FrameDataset", "framedata.FrameDataset"];

/// A type name kept working after a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprecation {
    pub alias: &'static str,
    pub replacement: &'static str,
    pub removed_in: &'static str,
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' has been renamed to '{}', and the alias will be removed in framedata {}",
            self.alias, self.replacement, self.removed_in
        )
    }
}

const DEPRECATED_TYPE_NAMES: &[Deprecation] = &[
    Deprecation {
        alias: "FrameDataSet",
        replacement: "FrameDataset",
        removed_in: "0.3.0",
    },
    Deprecation {
        alias: "framedata.FrameDataSet",
        replacement: "framedata.FrameDataset",
        removed_in: "0.3.0",
    },
];

/// Check a catalog `type` name. Deprecated aliases resolve, with a notice.
pub fn resolve_type(name: &str) -> Result<Option<Deprecation>> {
    if TYPE_NAMES.contains(&name) {
        return Ok(None);
    }
    if let Some(notice) = DEPRECATED_TYPE_NAMES.iter().find(|d| d.alias == name) {
        return Ok(Some(*notice));
    }
    Err(DatasetError::Config(format!(
        "Dataset type '{}' not found, expected one of {}",
        name,
        TYPE_NAMES.join(", ")
    )))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credentials {
    /// Key into the catalog's credentials map.
    Named(String),
    Inline(OptionMap),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub dataset_type: String,
    pub filepath: String,
    pub file_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_args: Option<OptionMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_args: Option<OptionMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_args: Option<OptionMap>,
    #[serde(default)]
    pub versioned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl CatalogEntry {
    /// `Some` when `versioned`; pinned versions need `versioned: true`.
    pub fn version(&self) -> Result<Option<Version>> {
        if self.versioned {
            return Ok(Some(Version::new(
                self.load_version.clone(),
                self.save_version.clone(),
            )));
        }
        if self.load_version.is_some() || self.save_version.is_some() {
            return Err(DatasetError::Config(
                "'load_version' and 'save_version' require 'versioned: true'".into(),
            ));
        }
        Ok(None)
    }

    /// Build the dataset, looking named credentials up in `credentials`.
    pub fn build(&self, credentials: &BTreeMap<String, OptionMap>) -> Result<FrameDataset> {
        if let Some(notice) = resolve_type(&self.dataset_type)? {
            warn!(
                alias = notice.alias,
                replacement = notice.replacement,
                "{}",
                notice
            );
        }

        let mut builder = FrameDataset::builder(&self.filepath, &self.file_format)
            .maybe_version(self.version()?);
        if let Some(args) = &self.load_args {
            builder = builder.load_args(args.clone());
        }
        if let Some(args) = &self.save_args {
            builder = builder.save_args(args.clone());
        }
        if let Some(args) = &self.fs_args {
            builder = builder.fs_args(args.clone());
        }
        if let Some(metadata) = &self.metadata {
            builder = builder.metadata(metadata.clone());
        }
        match &self.credentials {
            Some(Credentials::Inline(inline)) => builder = builder.credentials(inline.clone()),
            Some(Credentials::Named(name)) => {
                let found = credentials.get(name).ok_or_else(|| {
                    DatasetError::Config(format!("Unable to find credentials '{}'", name))
                })?;
                builder = builder.credentials(found.clone());
            }
            None => {}
        }
        builder.build()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
    credentials: BTreeMap<String, OptionMap>,
}

impl Catalog {
    pub fn new(entries: BTreeMap<String, CatalogEntry>) -> Self {
        Self {
            entries,
            credentials: BTreeMap::new(),
        }
    }

    pub fn from_yaml(source: &str) -> Result<Self> {
        let entries: BTreeMap<String, CatalogEntry> = serde_yaml::from_str(source)
            .map_err(|e| DatasetError::Config(format!("invalid catalog: {}", e)))?;
        Ok(Self::new(entries))
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let entries: BTreeMap<String, CatalogEntry> = serde_json::from_str(source)?;
        Ok(Self::new(entries))
    }

    /// Named credentials for entries that reference them.
    pub fn with_credentials(mut self, credentials: BTreeMap<String, OptionMap>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Build the dataset registered as `name`.
    pub fn dataset(&self, name: &str) -> Result<FrameDataset> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| DatasetError::Config(format!("Dataset '{}' not found in the catalog", name)))?;
        entry
            .build(&self.credentials)
            .map_err(|e| e.with_context(format!("catalog entry '{}'", name)))
    }
}
