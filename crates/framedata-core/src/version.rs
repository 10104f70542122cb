//! Version descriptors and the versioned path layout.
//!
//! A versioned dataset at `<filepath>` stores each version as
//! `<filepath>/<version>/<file name>`. Generated versions are UTC timestamps
//! that sort lexicographically in time order.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// `2026-10-19T08.30.12.345Z`
pub const VERSION_FORMAT: &str = "%Y-%m-%dT%H.%M.%S%.3fZ";

/// Independent load/save selectors. `None` means "latest" for load and
/// "generate one" for save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(default)]
    pub load: Option<String>,
    #[serde(default)]
    pub save: Option<String>,
}

impl Version {
    pub fn new(load: Option<String>, save: Option<String>) -> Self {
        Self { load, save }
    }

    /// Load the latest version, generate the save version.
    pub fn latest() -> Self {
        Self::default()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(v: &Option<String>) -> String {
            v.as_ref()
                .map(|s| format!("'{}'", s))
                .unwrap_or_else(|| "None".into())
        }
        write!(f, "Version(load={}, save={})", show(&self.load), show(&self.save))
    }
}

/// Current UTC time in `VERSION_FORMAT`.
pub fn generate_timestamp() -> String {
    Utc::now().format(VERSION_FORMAT).to_string()
}

/// Last `/`-separated segment of `path`.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// `<base>/<version>/<file name of base>`.
pub fn versioned_path(base: &str, version: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{}/{}/{}", base, version, file_name(base))
}

/// The version directory a versioned file lives in, i.e. its parent's name.
pub fn version_of(versioned: &str) -> Option<&str> {
    let (parent, _) = versioned.trim_end_matches('/').rsplit_once('/')?;
    let name = file_name(parent);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_layout() {
        assert_eq!(
            versioned_path("data/cars.csv", "2026-01-01T00.00.00.000Z"),
            "data/cars.csv/2026-01-01T00.00.00.000Z/cars.csv"
        );
        assert_eq!(versioned_path("bucket/x.pq/", "v1"), "bucket/x.pq/v1/x.pq");
    }

    #[test]
    fn version_from_versioned_path() {
        assert_eq!(version_of("/tmp/cars.csv/v1/cars.csv"), Some("v1"));
        assert_eq!(version_of("cars.csv"), None);
    }

    #[test]
    fn timestamps_have_millisecond_precision() {
        let ts = generate_timestamp();
        // 2026-10-19T08.30.12.345Z
        assert_eq!(ts.len(), 24, "{}", ts);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[10..11], "T");
        assert!(!ts.contains(':'));
    }

    #[test]
    fn display_matches_descriptor_fields() {
        let v = Version::new(None, Some("v2".into()));
        assert_eq!(v.to_string(), "Version(load=None, save='v2')");
    }
}
