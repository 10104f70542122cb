//! Splitting `scheme://` filepaths into a protocol and a bare path.
//!
//! Rules:
//! - Windows drive paths (`C:\...`, `C:/...`) and strings without a
//!   `scheme://` prefix are local (`file`) and kept as-is.
//! - HTTP(S) keeps the whole URL minus the scheme.
//! - Object-store protocols, `memory` included, keep the bucket:
//!   `s3://bucket/a.csv` → `bucket/a.csv`.
//! - Anything else keeps only the URL path.
//!
//! Userinfo, port, query and fragment are dropped and the path is
//! percent-decoded.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DatasetError, Result};

pub const PROTOCOL_DELIMITER: &str = "://";

pub const HTTP_PROTOCOLS: &[&str] = &["http", "https"];

/// Protocols whose URL host is the first path segment (a bucket/container).
pub const CLOUD_PROTOCOLS: &[&str] = &[
    "s3", "s3n", "s3a", "gcs", "gs", "adl", "abfs", "abfss", "az", "gdrive", "memory",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Protocol(String);

impl Protocol {
    pub fn new(scheme: impl AsRef<str>) -> Self {
        Protocol(scheme.as_ref().to_lowercase())
    }

    pub fn local() -> Self {
        Protocol("file".into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Only `file` is served by the local filesystem.
    pub fn is_local(&self) -> bool {
        self.0 == "file"
    }

    pub fn is_http(&self) -> bool {
        HTTP_PROTOCOLS.contains(&self.0.as_str())
    }

    pub fn is_cloud(&self) -> bool {
        CLOUD_PROTOCOLS.contains(&self.0.as_str())
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::local()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split `filepath` into its protocol and bare path.
///
/// `versioned` rejects HTTP(S) paths, which cannot hold version directories.
pub fn parse_protocol_and_path(filepath: &str, versioned: bool) -> Result<(Protocol, String)> {
    let (protocol, path) = split_filepath(filepath)?;
    if protocol.is_http() && versioned {
        return Err(DatasetError::Config(
            "Versioning is not supported for HTTP protocols. Please remove the `versioned` \
             flag from the dataset configuration."
                .into(),
        ));
    }
    Ok((protocol, path))
}

/// Path string handed to a filesystem; HTTP paths get their scheme back.
pub fn filepath_str(path: &str, protocol: &Protocol) -> String {
    if protocol.is_http() {
        format!("{}{}{}", protocol, PROTOCOL_DELIMITER, path)
    } else {
        path.to_string()
    }
}

fn split_filepath(filepath: &str) -> Result<(Protocol, String)> {
    if is_windows_drive(filepath) || !has_scheme(filepath) {
        return Ok((Protocol::local(), filepath.to_string()));
    }
    let url = Url::parse(filepath).map_err(|e| {
        DatasetError::Config(format!("Invalid filepath '{}': {}", filepath, e))
    })?;

    let protocol = Protocol::new(url.scheme());
    if protocol.is_http() {
        let rest = filepath
            .split_once(PROTOCOL_DELIMITER)
            .map_or(filepath, |(_, rest)| rest);
        return Ok((protocol, rest.to_string()));
    }

    let mut path = percent_decode_str(url.path())
        .decode_utf8_lossy()
        .into_owned();
    if protocol.is_local() {
        if let Some(drive) = windows_url_path(&path) {
            path = drive;
        }
    }
    if protocol.is_cloud() {
        if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
            path = format!("{}{}", host, path);
        }
    }

    Ok((protocol, path))
}

/// `scheme://...` where scheme is non-empty ASCII alphanumeric.
fn has_scheme(filepath: &str) -> bool {
    filepath
        .split_once(PROTOCOL_DELIMITER)
        .is_some_and(|(scheme, _)| {
            !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric())
        })
}

fn is_windows_drive(filepath: &str) -> bool {
    let bytes = filepath.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// `/C:/data/x.csv` or `/C|/data/x.csv` → `C:/data/x.csv`.
fn windows_url_path(path: &str) -> Option<String> {
    let bytes = path.as_bytes();
    if bytes.len() >= 4
        && bytes[0] == b'/'
        && bytes[1].is_ascii_alphabetic()
        && (bytes[2] == b':' || bytes[2] == b'|')
        && (bytes[3] == b'\\' || bytes[3] == b'/')
    {
        Some(format!("{}:{}", &path[1..2], &path[3..]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(p: &str) -> (String, String) {
        let (protocol, path) = parse_protocol_and_path(p, false).unwrap();
        (protocol.as_str().to_string(), path)
    }

    #[test]
    fn bare_paths_are_local() {
        assert_eq!(split("/tmp/test.csv"), ("file".into(), "/tmp/test.csv".into()));
        assert_eq!(split("data/01_raw/cars.csv"), ("file".into(), "data/01_raw/cars.csv".into()));
        assert_eq!(split("test.csv"), ("file".into(), "test.csv".into()));
    }

    #[test]
    fn file_urls_keep_the_path() {
        assert_eq!(split("file:///tmp/test.csv"), ("file".into(), "/tmp/test.csv".into()));
        assert_eq!(split("file:///C:/data/x.csv"), ("file".into(), "C:/data/x.csv".into()));
    }

    #[test]
    fn windows_drives_are_local() {
        assert_eq!(split(r"C:\data\x.csv"), ("file".into(), r"C:\data\x.csv".into()));
        assert_eq!(split("d:/data/x.csv"), ("file".into(), "d:/data/x.csv".into()));
    }

    #[test]
    fn cloud_paths_keep_the_bucket() {
        assert_eq!(split("s3://bucket/file.csv"), ("s3".into(), "bucket/file.csv".into()));
        assert_eq!(
            split("gcs://user:pw@bucket:443/a/b.parquet?x=1"),
            ("gcs".into(), "bucket/a/b.parquet".into())
        );
        assert_eq!(split("memory://scratch/x.csv"), ("memory".into(), "scratch/x.csv".into()));
        assert_eq!(split("S3://Bucket/f.csv"), ("s3".into(), "Bucket/f.csv".into()));
    }

    #[test]
    fn paths_are_percent_decoded() {
        assert_eq!(
            split("s3://bucket/my%20dir/a b.csv"),
            ("s3".into(), "bucket/my dir/a b.csv".into())
        );
        assert_eq!(
            split("file:///tmp/my%20file.csv"),
            ("file".into(), "/tmp/my file.csv".into())
        );
    }

    #[test]
    fn malformed_urls_are_config_errors() {
        let err = parse_protocol_and_path("s3://bucket:notaport/x.csv", false).unwrap_err();
        assert!(matches!(err, DatasetError::Config(_)));
        assert!(err.to_string().contains("s3://bucket:notaport/x.csv"));
    }

    #[test]
    fn other_schemes_drop_the_host() {
        assert_eq!(split("ftp://host/dir/f.csv"), ("ftp".into(), "/dir/f.csv".into()));
    }

    #[test]
    fn http_keeps_everything_after_the_scheme() {
        assert_eq!(
            split("https://example.com/data/x.csv?sig=1"),
            ("https".into(), "example.com/data/x.csv?sig=1".into())
        );
        let protocol = Protocol::new("https");
        assert_eq!(
            filepath_str("example.com/x.csv", &protocol),
            "https://example.com/x.csv"
        );
        assert_eq!(filepath_str("bucket/x.csv", &Protocol::new("s3")), "bucket/x.csv");
    }

    #[test]
    fn http_cannot_be_versioned() {
        let err = parse_protocol_and_path("http://example.com/x.csv", true).unwrap_err();
        assert!(err.to_string().contains("Versioning is not supported for HTTP protocols"));
        assert!(parse_protocol_and_path("s3://b/x.csv", true).is_ok());
    }
}
