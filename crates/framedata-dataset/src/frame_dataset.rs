//! `FrameDataset`: CSV/Parquet files read into lazy frames and written from
//! frames, on any supported filesystem, optionally versioned.
//!
//! ```rust,no_run
//! use framedata_dataset::{Dataset, FrameDataset};
//!
//! let ds = FrameDataset::new("data/01_raw/cars.csv", "csv").unwrap();
//! let cars = ds.load().unwrap().collect().unwrap();
//! ds.save(cars.into()).unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use framedata_core::error::{DatasetError, Result};
use framedata_core::format::FileFormat;
use framedata_core::options::{
    describe_options, merge_options, OptionMap, AUTO_MKDIR_KEY, OPEN_ARGS_LOAD_KEY,
    OPEN_ARGS_SAVE_KEY, PARTITION_COLS_KEY, STORAGE_OPTIONS_KEY,
};
use framedata_core::protocol::{filepath_str, parse_protocol_and_path, Protocol};
use framedata_core::version::Version;
use framedata_io::fs::{filesystem, FileSystem, OpenArgs, OpenMode};
use framedata_io::registry::{FormatRegistry, FormatRoutines};
use framedata_io::{Frame, LazyFrame};
use serde_json::Value;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::strategy::{strategy_for, LoadRequest};
use crate::versioning::{VersionCache, VersionedPath};

const DATASET_NAME: &str = "FrameDataset";

const ENGINE_DOCS: &str = "https://docs.rs/framedata-io/latest/framedata_io/registry/";

/// Default load/save options per format. Empty for every format today.
fn default_args(_format: FileFormat) -> OptionMap {
    OptionMap::new()
}

pub struct FrameDataset {
    filepath: String,
    protocol: Protocol,
    format: FileFormat,
    load_args: OptionMap,
    save_args: OptionMap,
    storage_options: OptionMap,
    open_args_load: OpenArgs,
    open_args_save: OpenArgs,
    fs: Arc<dyn FileSystem>,
    versioned: VersionedPath,
    metadata: Option<Value>,
    registry: &'static FormatRegistry,
}

/// Former name, kept for existing pipelines.
#[deprecated(
    since = "0.1.0",
    note = "renamed to `FrameDataset`; the alias will be removed in 0.3.0"
)]
pub type FrameDataSet = FrameDataset;

impl FrameDataset {
    /// Unversioned dataset with default options.
    pub fn new(filepath: impl Into<String>, file_format: impl Into<String>) -> Result<Self> {
        Self::builder(filepath, file_format).build()
    }

    pub fn builder(
        filepath: impl Into<String>,
        file_format: impl Into<String>,
    ) -> FrameDatasetBuilder {
        FrameDatasetBuilder::new(filepath, file_format)
    }

    /// Base path without protocol.
    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn file_format(&self) -> FileFormat {
        self.format
    }

    pub fn load_args(&self) -> &OptionMap {
        &self.load_args
    }

    pub fn save_args(&self) -> &OptionMap {
        &self.save_args
    }

    /// Credentials merged with filesystem arguments.
    pub fn storage_options(&self) -> &OptionMap {
        &self.storage_options
    }

    pub fn open_args_load(&self) -> &OpenArgs {
        &self.open_args_load
    }

    pub fn open_args_save(&self) -> &OpenArgs {
        &self.open_args_save
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn version(&self) -> Option<&Version> {
        self.versioned.version()
    }

    /// Versions resolved so far and not yet released.
    pub fn cached_versions(&self) -> VersionCache {
        self.versioned.cached()
    }

    /// Free-form metadata; never read by the dataset.
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    pub fn describe(&self) -> String {
        self.to_string()
    }

    fn routines(&self) -> Option<&FormatRoutines> {
        self.registry.get(self.format)
    }

    fn missing_routine(&self, routine: &str) -> DatasetError {
        DatasetError::MissingRoutine(format!(
            "Unable to retrieve '{}' routine for format '{}', please ensure that your \
             'file_format' parameter has been defined correctly as per the dataframe API {}",
            routine, self.format, ENGINE_DOCS
        ))
    }

    fn invalidate_cache(&self) {
        let path = filepath_str(&self.filepath, &self.protocol);
        debug!(%path, "invalidating filesystem cache");
        self.fs.invalidate_cache(&self.filepath);
    }

    fn load_frame(&self, describe: &str) -> Result<LazyFrame> {
        let path = self.versioned.load_path(self.fs.as_ref(), describe)?;
        let routines = self
            .routines()
            .ok_or_else(|| self.missing_routine(&format!("scan_{}", self.format)))?;
        let strategy = strategy_for(&self.protocol);
        debug!(%path, strategy = strategy.name(), "loading");
        strategy.scan(LoadRequest {
            path: &path,
            format: self.format,
            routines,
            load_args: &self.load_args,
            open_args: &self.open_args_load,
            fs: &self.fs,
        })
    }

    fn save_frame(&self, data: Frame, describe: &str) -> Result<()> {
        let save_path = self.versioned.save_path();
        if self.versioned.is_versioned() {
            self.check_unversioned_leftover()?;
            if self.fs.exists(&save_path)? {
                return Err(DatasetError::VersionExists(format!(
                    "Save path '{}' for {} must not exist if versioning is enabled.",
                    save_path, describe
                )));
            }
        }
        if self.fs.is_dir(&save_path)? {
            return Err(DatasetError::Directory(format!(
                "Saving {} to a directory is not supported.",
                DATASET_NAME
            )));
        }
        if self.save_args.contains_key(PARTITION_COLS_KEY) {
            return Err(DatasetError::Partitioning(format!(
                "{} does not support save argument '{}'. Please use a partitioned dataset instead.",
                DATASET_NAME, PARTITION_COLS_KEY
            )));
        }

        let frame = data.collect()?;
        let routines = self
            .routines()
            .ok_or_else(|| self.missing_routine(&format!("DataFrame::write_{}", self.format)))?;
        let buf = (routines.write)(&frame, &self.save_args)?;
        debug!(path = %save_path, bytes = buf.len(), "saving");
        self.fs.write(&save_path, &buf, &self.open_args_save)?;
        self.invalidate_cache();
        Ok(())
    }

    /// A plain file at the base path blocks every version directory.
    fn check_unversioned_leftover(&self) -> Result<()> {
        let base = self.versioned.base();
        if self.fs.exists(base)? && !self.fs.is_dir(base)? {
            let name = framedata_core::version::file_name(base);
            return Err(DatasetError::Config(format!(
                "Cannot save versioned dataset '{name}' to '{base}' because a file with the same \
                 name already exists there. Remove it or move it into a version directory, e.g. \
                 '{base}/YYYY-MM-DDThh.mm.ss.sssZ/{name}'."
            )));
        }
        Ok(())
    }

    /// Warn when a pinned load version makes the next load miss this save.
    fn check_consistency(&self, describe: &str) -> Result<()> {
        let save_version = self.versioned.save_version();
        let load_version = self.versioned.load_version(self.fs.as_ref(), describe)?;
        if load_version != save_version {
            let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "None".into());
            warn!(
                "Save version '{}' did not match load version '{}' for {}. This is strongly \
                 discouraged due to inconsistencies it may cause between 'save' and 'load' \
                 operations. Please refrain from setting exact load version for intermediate \
                 datasets where possible to avoid this warning.",
                show(&save_version),
                show(&load_version),
                describe
            );
        }
        Ok(())
    }
}

impl Dataset for FrameDataset {
    type Load = LazyFrame;
    type Save = Frame;

    fn load(&self) -> Result<LazyFrame> {
        let describe = self.describe();
        debug!(dataset = %describe, "loading data");
        self.load_frame(&describe)
            .map_err(|e| e.into_load(describe.clone()))
    }

    fn save(&self, data: Frame) -> Result<()> {
        self.versioned.clear_cache();
        let describe = self.describe();
        debug!(dataset = %describe, lazy = data.is_lazy(), "saving data");
        self.save_frame(data, &describe)
            .map_err(|e| e.into_save(describe.clone()))?;
        self.check_consistency(&describe)
    }

    fn exists(&self) -> Result<bool> {
        let describe = self.describe();
        let path = match self.versioned.load_path(self.fs.as_ref(), &describe) {
            Ok(path) => path,
            Err(e) => {
                debug!(error = %e, "load path unresolved, reporting absent");
                return Ok(false);
            }
        };
        self.fs
            .exists(&path)
            .map_err(|e| DatasetError::from(e).into_exists(describe))
    }

    fn release(&self) -> Result<()> {
        self.versioned.clear_cache();
        self.invalidate_cache();
        Ok(())
    }
}

/// `FrameDataset(filepath=..., protocol=..., load_args={...}, save_args={...}, version=...)`;
/// `version` is left out for unversioned datasets.
impl fmt::Display for FrameDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(filepath={}, protocol={}, load_args={}, save_args={}",
            DATASET_NAME,
            self.filepath,
            self.protocol,
            describe_options(&self.load_args),
            describe_options(&self.save_args)
        )?;
        if let Some(version) = self.versioned.version() {
            write!(f, ", version={}", version)?;
        }
        f.write_str(")")
    }
}

impl fmt::Debug for FrameDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Builder for `FrameDataset`. Everything but the path and format is
/// optional.
#[must_use]
pub struct FrameDatasetBuilder {
    filepath: String,
    file_format: String,
    load_args: Option<OptionMap>,
    save_args: Option<OptionMap>,
    version: Option<Version>,
    credentials: Option<OptionMap>,
    fs_args: Option<OptionMap>,
    metadata: Option<Value>,
    filesystem: Option<Arc<dyn FileSystem>>,
    registry: &'static FormatRegistry,
}

impl FrameDatasetBuilder {
    pub fn new(filepath: impl Into<String>, file_format: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            file_format: file_format.into(),
            load_args: None,
            save_args: None,
            version: None,
            credentials: None,
            fs_args: None,
            metadata: None,
            filesystem: None,
            registry: FormatRegistry::global(),
        }
    }

    pub fn load_args(mut self, args: OptionMap) -> Self {
        self.load_args = Some(args);
        self
    }

    pub fn save_args(mut self, args: OptionMap) -> Self {
        self.save_args = Some(args);
        self
    }

    /// Enable versioning. `Version::latest()` loads the newest version and
    /// generates save versions.
    pub fn version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn maybe_version(mut self, version: Option<Version>) -> Self {
        self.version = version;
        self
    }

    pub fn credentials(mut self, credentials: OptionMap) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Filesystem constructor options, plus `open_args_load` /
    /// `open_args_save` for the open calls.
    pub fn fs_args(mut self, args: OptionMap) -> Self {
        self.fs_args = Some(args);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Use `fs` instead of building a handle from the storage options.
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.filesystem = Some(fs);
        self
    }

    /// Resolve codecs from `registry` instead of the global one.
    pub fn registry(mut self, registry: &'static FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn build(self) -> Result<FrameDataset> {
        let format: FileFormat = self.file_format.parse()?;
        let (protocol, path) = parse_protocol_and_path(&self.filepath, self.version.is_some())?;

        let mut fs_args = self.fs_args.unwrap_or_default();
        if protocol.is_local() {
            fs_args
                .entry(AUTO_MKDIR_KEY.to_string())
                .or_insert(Value::Bool(true));
        }
        let open_args_load = OpenArgs::from_value(fs_args.remove(OPEN_ARGS_LOAD_KEY).as_ref())?;
        let open_args_save = OpenArgs::from_value(fs_args.remove(OPEN_ARGS_SAVE_KEY).as_ref())?;

        let mut storage_options = self.credentials.unwrap_or_default();
        storage_options.extend(fs_args);

        let fs = match self.filesystem {
            Some(fs) => fs,
            None => filesystem(&protocol, &storage_options)?,
        };
        open_args_load.validate(fs.as_ref(), OpenMode::Read)?;
        open_args_save.validate(fs.as_ref(), OpenMode::Write)?;

        let mut load_args = merge_options(&default_args(format), self.load_args.as_ref());
        let mut save_args = merge_options(&default_args(format), self.save_args.as_ref());
        if load_args.contains_key(STORAGE_OPTIONS_KEY) || save_args.contains_key(STORAGE_OPTIONS_KEY)
        {
            warn!(
                "Dropping '{}' for {}, please specify them under 'fs_args' or 'credentials'.",
                STORAGE_OPTIONS_KEY, path
            );
            load_args.remove(STORAGE_OPTIONS_KEY);
            save_args.remove(STORAGE_OPTIONS_KEY);
        }

        debug!(%protocol, path = %path, %format, versioned = self.version.is_some(), "built dataset");
        Ok(FrameDataset {
            versioned: VersionedPath::new(path.clone(), self.version),
            filepath: path,
            protocol,
            format,
            load_args,
            save_args,
            storage_options,
            open_args_load,
            open_args_save,
            fs,
            metadata: self.metadata,
            registry: self.registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{ArrayRef, Int64Array};
    use framedata_io::fs::LocalFileSystem;
    use framedata_io::DataFrame;
    use serde_json::json;

    fn options(v: Value) -> OptionMap {
        serde_json::from_value(v).unwrap()
    }

    fn frame() -> DataFrame {
        DataFrame::from_columns(vec![
            ("col1", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("col2", Arc::new(Int64Array::from(vec![4, 5])) as ArrayRef),
        ])
        .unwrap()
    }

    #[test]
    fn format_is_case_insensitive_and_checked() {
        let ds = FrameDataset::new("test.csv", "CSV").unwrap();
        assert_eq!(ds.file_format(), FileFormat::Csv);
        let err = FrameDataset::new("test.csv", "json").unwrap_err();
        assert!(matches!(err, DatasetError::Format(_)));
        assert!(err.to_string().contains("'json' is not an accepted format"));
    }

    #[test]
    fn local_defaults_auto_mkdir_unless_given() {
        let ds = FrameDataset::new("test.csv", "csv").unwrap();
        assert_eq!(ds.storage_options()[AUTO_MKDIR_KEY], json!(true));
        let ds = FrameDataset::builder("test.csv", "csv")
            .fs_args(options(json!({"auto_mkdir": false})))
            .build()
            .unwrap();
        assert_eq!(ds.storage_options()[AUTO_MKDIR_KEY], json!(false));
    }

    #[test]
    fn fs_args_win_over_credentials_and_open_args_are_split_out() {
        let ds = FrameDataset::builder("memory://bucket/creds.csv", "csv")
            .credentials(options(json!({"key": "from_credentials", "token": "t"})))
            .fs_args(options(json!({
                "key": "from_fs_args",
                "open_args_save": {"content_type": "text/csv"},
            })))
            .build()
            .unwrap();
        assert_eq!(ds.storage_options()["key"], json!("from_fs_args"));
        assert_eq!(ds.storage_options()["token"], json!("t"));
        assert!(!ds.storage_options().contains_key(OPEN_ARGS_SAVE_KEY));
        assert_eq!(ds.open_args_save().get_str("content_type"), Some("text/csv"));
        assert!(ds.open_args_load().is_empty());
    }

    #[test]
    fn remote_only_open_args_fail_on_local() {
        let err = FrameDataset::builder("test.csv", "csv")
            .fs_args(options(json!({"open_args_save": {"content_type": "text/csv"}})))
            .build()
            .unwrap_err();
        assert!(matches!(err, DatasetError::Options(_)));
    }

    #[test]
    fn describe_lists_options_and_version() {
        let ds = FrameDataset::builder("data/cars.csv", "csv")
            .load_args(options(json!({"separator": ";"})))
            .build()
            .unwrap();
        assert_eq!(
            ds.describe(),
            "FrameDataset(filepath=data/cars.csv, protocol=file, load_args={separator: \";\"}, \
             save_args={})"
        );
        let ds = FrameDataset::builder("data/cars.csv", "csv")
            .version(Version::new(None, Some("v1".into())))
            .build()
            .unwrap();
        assert!(ds.describe().ends_with("version=Version(load=None, save='v1'))"));
    }

    #[test]
    fn storage_options_are_dropped_from_both_sides() {
        let ds = FrameDataset::builder("test.csv", "csv")
            .load_args(options(json!({"storage_options": {"a": 1}, "n_rows": 1})))
            .save_args(options(json!({"storage_options": {"a": 1}})))
            .build()
            .unwrap();
        assert_eq!(ds.load_args(), &options(json!({"n_rows": 1})));
        assert!(ds.save_args().is_empty());
    }

    #[test]
    fn missing_write_routine_is_descriptive() {
        let empty: &'static FormatRegistry = Box::leak(Box::new(FormatRegistry::default()));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.csv");
        let ds = FrameDataset::builder(path.to_str().unwrap(), "csv")
            .registry(empty)
            .build()
            .unwrap();
        let err = ds.save(frame().into()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingRoutine(_)));
        assert!(err.to_string().contains("DataFrame::write_csv"));
        assert!(!path.exists());
    }

    #[test]
    fn injected_filesystem_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/x.csv");
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new(false));
        let ds = FrameDataset::builder(path.to_str().unwrap(), "csv")
            .filesystem(fs)
            .build()
            .unwrap();
        // no auto_mkdir on the injected handle, so the parent must exist
        assert!(ds.save(frame().into()).is_err());
    }

    #[test]
    fn metadata_is_kept_verbatim() {
        let ds = FrameDataset::builder("test.csv", "csv")
            .metadata(json!({"owner": "data-eng"}))
            .build()
            .unwrap();
        assert_eq!(ds.metadata(), Some(&json!({"owner": "data-eng"})));
    }

    #[test]
    #[allow(deprecated)]
    fn deprecated_alias_names_the_same_type() {
        let ds: FrameDataSet = FrameDataSet::new("test.csv", "csv").unwrap();
        assert_eq!(ds.file_format(), FileFormat::Csv);
    }
}
