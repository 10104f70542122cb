//! Versioned path resolution.
//!
//! A versioned dataset keeps each save under `<base>/<version>/<name>`. Load
//! picks an explicit version or the newest one present; save uses an
//! explicit version or a generated timestamp. Versions found or generated
//! are cached until `clear_cache`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use framedata_core::error::{DatasetError, Result};
use framedata_core::version::{file_name, generate_timestamp, version_of, versioned_path, Version};
use framedata_io::fs::FileSystem;
use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VersionCache {
    pub load: Option<String>,
    pub save: Option<String>,
}

#[derive(Debug)]
pub struct VersionedPath {
    base: String,
    version: Option<Version>,
    cache: Mutex<VersionCache>,
}

impl VersionedPath {
    pub fn new(base: impl Into<String>, version: Option<Version>) -> Self {
        Self {
            base: base.into(),
            version,
            cache: Mutex::new(VersionCache::default()),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }

    fn cache(&self) -> MutexGuard<'_, VersionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the cached versions.
    pub fn cached(&self) -> VersionCache {
        self.cache().clone()
    }

    pub fn clear_cache(&self) {
        *self.cache() = VersionCache::default();
    }

    /// Version to load, `None` when unversioned.
    ///
    /// `describe` names the dataset in the not-found error.
    pub fn load_version(&self, fs: &dyn FileSystem, describe: &str) -> Result<Option<String>> {
        let Some(version) = &self.version else {
            return Ok(None);
        };
        if let Some(pinned) = &version.load {
            return Ok(Some(pinned.clone()));
        }
        if let Some(cached) = self.cache().load.clone() {
            return Ok(Some(cached));
        }
        let latest = self.latest_version(fs, describe)?;
        self.cache().load = Some(latest.clone());
        Ok(Some(latest))
    }

    /// Newest `<base>/*/<name>` that exists.
    fn latest_version(&self, fs: &dyn FileSystem, describe: &str) -> Result<String> {
        let not_found = || format!("Did not find any versions for {}", describe);
        let base = self.base.trim_end_matches('/');
        let pattern = format!("{}/*/{}", base, file_name(base));

        let mut candidates = fs
            .glob(&pattern)
            .map_err(|e| DatasetError::VersionNotFound(format!("{}\n{}", not_found(), e)))?;
        candidates.sort_unstable_by(|a, b| b.cmp(a));
        for candidate in candidates {
            let present = fs
                .exists(&candidate)
                .map_err(|e| DatasetError::VersionNotFound(format!("{}\n{}", not_found(), e)))?;
            if present {
                if let Some(v) = version_of(&candidate) {
                    debug!(path = %candidate, "found latest version");
                    return Ok(v.to_string());
                }
            }
        }
        Err(DatasetError::VersionNotFound(not_found()))
    }

    /// Version to save under, `None` when unversioned. A generated version
    /// stays fixed until the cache is cleared.
    pub fn save_version(&self) -> Option<String> {
        let version = self.version.as_ref()?;
        if let Some(pinned) = &version.save {
            return Some(pinned.clone());
        }
        let mut cache = self.cache();
        Some(cache.save.get_or_insert_with(generate_timestamp).clone())
    }

    pub fn load_path(&self, fs: &dyn FileSystem, describe: &str) -> Result<String> {
        Ok(match self.load_version(fs, describe)? {
            Some(v) => versioned_path(&self.base, &v),
            None => self.base.clone(),
        })
    }

    pub fn save_path(&self) -> String {
        match self.save_version() {
            Some(v) => versioned_path(&self.base, &v),
            None => self.base.clone(),
        }
    }
}
