//! Object stores (memory, S3, GCS, Azure, HTTP) behind the synchronous
//! `FileSystem` trait.
//!
//! Paths are `<bucket>/<key>` except for `memory`, whose single store is
//! shared by every handle in the process. Stores are created per bucket on
//! first use from the storage options, so a handle for a backend whose cargo
//! feature is off can still be constructed; it fails when touched.
//!
//! Metadata looked up by `exists`/`is_dir` is cached per path. Writes leave
//! the cache alone: callers invalidate after writing.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use bytes::Bytes;
use framedata_core::options::{OptionMap, AUTO_MKDIR_KEY};
use framedata_core::protocol::Protocol;
use futures::{StreamExt, TryStreamExt};
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectMeta, ObjectStore, PutOptions,
    PutPayload,
};
use serde_json::Value;
use tokio::runtime::Runtime;
use tracing::{debug, trace};
use url::Url;

use super::{FileSystem, OpenArgs, OpenMode};
use crate::error::{Error, Result};
use crate::glob::{compile, literal_prefix};

const READ_ARG_KEYS: &[&str] = &["version_id"];
const WRITE_ARG_KEYS: &[&str] = &["content_type", "cache_control", "content_encoding"];

static MEMORY_STORE: OnceLock<Arc<InMemory>> = OnceLock::new();

#[derive(Debug, Clone)]
enum Entry {
    File,
    Dir,
    Missing,
}

#[derive(Debug)]
enum Stores {
    /// One store for every path (`memory`, injected stores).
    Shared(Arc<dyn ObjectStore>),
    /// One store per bucket, built lazily from `scheme://<bucket>`.
    PerBucket {
        scheme: &'static str,
        options: Vec<(String, String)>,
        stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
    },
}

#[derive(Debug)]
pub struct ObjectStoreFileSystem {
    protocol: Protocol,
    stores: Stores,
    runtime: Runtime,
    cache: Mutex<HashMap<String, Entry>>,
}

impl ObjectStoreFileSystem {
    /// Handle on the process-wide in-memory store.
    pub fn memory() -> Result<Self> {
        let store: Arc<dyn ObjectStore> = MEMORY_STORE
            .get_or_init(|| Arc::new(InMemory::new()))
            .clone();
        Self::with_store(Protocol::new("memory"), store)
    }

    /// Serve every path of `protocol` from `store`.
    pub fn with_store(protocol: Protocol, store: Arc<dyn ObjectStore>) -> Result<Self> {
        Ok(Self {
            protocol,
            stores: Stores::Shared(store),
            runtime: runtime()?,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Bucketed stores for a cloud or HTTP protocol.
    pub fn for_protocol(protocol: Protocol, options: &OptionMap) -> Result<Self> {
        let scheme = store_scheme(&protocol).ok_or_else(|| {
            Error::Unsupported(format!("protocol '{}' has no object store backend", protocol))
        })?;
        Ok(Self {
            stores: Stores::PerBucket {
                scheme,
                options: store_options(scheme, options),
                stores: Mutex::new(HashMap::new()),
            },
            protocol,
            runtime: runtime()?,
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Store, key within the store, and the bucket prefix stripped from `path`.
    fn locate(&self, path: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath, String)> {
        match &self.stores {
            Stores::Shared(store) => Ok((Arc::clone(store), ObjectPath::from(path), String::new())),
            Stores::PerBucket {
                scheme,
                options,
                stores,
            } => {
                let trimmed = path.trim_start_matches('/');
                let (bucket, key) = trimmed.split_once('/').unwrap_or((trimmed, ""));
                if bucket.is_empty() {
                    return Err(Error::Other(format!("object path '{}' has no bucket", path)));
                }
                let mut stores = stores.lock().unwrap_or_else(PoisonError::into_inner);
                let store = match stores.get(bucket) {
                    Some(store) => Arc::clone(store),
                    None => {
                        let url = Url::parse(&format!("{}://{}", scheme, bucket))?;
                        let (store, _) = object_store::parse_url_opts(
                            &url,
                            options.iter().map(|(k, v)| (k.as_str(), v.as_str())),
                        )?;
                        let store: Arc<dyn ObjectStore> = Arc::from(store);
                        debug!(%url, "created object store");
                        stores.insert(bucket.to_string(), Arc::clone(&store));
                        store
                    }
                };
                Ok((store, ObjectPath::from(key), bucket.to_string()))
            }
        }
    }

    fn stat(&self, path: &str) -> Result<Entry> {
        let key = cache_key(path);
        if let Some(entry) = self.cache_lock().get(&key) {
            return Ok(entry.clone());
        }

        let (store, location, _) = self.locate(path)?;
        let entry = self.block_on(async {
            match store.head(&location).await {
                Ok(_) => Ok(Entry::File),
                Err(object_store::Error::NotFound { .. }) => {
                    let mut listing = store.list(Some(&location));
                    match listing.next().await {
                        Some(Ok(_)) => Ok(Entry::Dir),
                        Some(Err(e)) => Err(e),
                        None => Ok(Entry::Missing),
                    }
                }
                Err(e) => Err(e),
            }
        })?;

        self.cache_lock().insert(key, entry.clone());
        Ok(entry)
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of cached metadata entries.
    pub fn cached_entries(&self) -> usize {
        self.cache_lock().len()
    }
}

impl FileSystem for ObjectStoreFileSystem {
    fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(!matches!(self.stat(path)?, Entry::Missing))
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(matches!(self.stat(path)?, Entry::Dir))
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = compile(pattern)?;
        let prefix = literal_prefix(pattern);
        let (store, location, bucket) = self.locate(&prefix)?;
        let metas: Vec<ObjectMeta> =
            self.block_on(store.list(Some(&location)).try_collect())?;

        let leading = if pattern.starts_with('/') { "/" } else { "" };
        let mut candidates = BTreeSet::new();
        for meta in metas {
            let key = meta.location.to_string();
            let full = if bucket.is_empty() {
                key
            } else {
                format!("{}/{}", bucket, key)
            };
            // directories are implied by the keys below them
            let mut current = full.as_str();
            loop {
                candidates.insert(format!("{}{}", leading, current));
                match current.rsplit_once('/') {
                    Some((parent, _)) if !parent.is_empty() => current = parent,
                    _ => break,
                }
            }
        }

        Ok(candidates
            .into_iter()
            .filter(|candidate| matcher.is_match(candidate.as_str()))
            .collect())
    }

    fn read(&self, path: &str, args: &OpenArgs) -> Result<Bytes> {
        args.validate(self, OpenMode::Read)?;
        let (store, location, _) = self.locate(path)?;
        let options = GetOptions {
            version: args.get_str("version_id").map(str::to_string),
            ..Default::default()
        };
        let data = self
            .block_on(async { store.get_opts(&location, options).await?.bytes().await })
            .map_err(|e| match e {
                object_store::Error::NotFound { .. } => Error::NotFound(path.to_string()),
                other => Error::ObjectStore(other),
            })?;
        trace!(path, bytes = data.len(), "read object");
        Ok(data)
    }

    fn write(&self, path: &str, data: &[u8], args: &OpenArgs) -> Result<()> {
        args.validate(self, OpenMode::Write)?;
        let (store, location, _) = self.locate(path)?;

        let mut attributes = Attributes::new();
        for (key, attribute) in [
            ("content_type", Attribute::ContentType),
            ("cache_control", Attribute::CacheControl),
            ("content_encoding", Attribute::ContentEncoding),
        ] {
            if let Some(value) = args.get_str(key) {
                attributes.insert(attribute, AttributeValue::from(value.to_string()));
            }
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let payload = PutPayload::from(data.to_vec());
        self.block_on(store.put_opts(&location, payload, options))?;
        trace!(path, bytes = data.len(), "wrote object");
        Ok(())
    }

    fn invalidate_cache(&self, path: &str) {
        let key = cache_key(path);
        let mut cache = self.cache_lock();
        let before = cache.len();
        cache.retain(|cached, _| !related(cached, &key));
        debug!(path, dropped = before - cache.len(), "invalidated object metadata");
    }

    fn open_arg_keys(&self, mode: OpenMode) -> &'static [&'static str] {
        match mode {
            OpenMode::Read => READ_ARG_KEYS,
            OpenMode::Write => WRITE_ARG_KEYS,
        }
    }
}

fn runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn cache_key(path: &str) -> String {
    path.trim_matches('/').to_string()
}

/// `a` equals `b`, or one is a directory prefix of the other.
fn related(a: &str, b: &str) -> bool {
    a == b
        || b.is_empty()
        || a.is_empty()
        || a.strip_prefix(b).is_some_and(|rest| rest.starts_with('/'))
        || b.strip_prefix(a).is_some_and(|rest| rest.starts_with('/'))
}

fn store_scheme(protocol: &Protocol) -> Option<&'static str> {
    match protocol.as_str() {
        "s3" | "s3a" | "s3n" => Some("s3"),
        "gs" | "gcs" => Some("gs"),
        "az" | "abfs" | "abfss" | "adl" => Some("az"),
        "http" => Some("http"),
        "https" => Some("https"),
        _ => None,
    }
}

/// Translate storage options to `object_store` config keys. Nested
/// `client_kwargs` are flattened; unknown keys pass through and are ignored
/// by the store builder.
fn store_options(scheme: &str, options: &OptionMap) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in options {
        if key == AUTO_MKDIR_KEY {
            continue;
        }
        if key == "client_kwargs" {
            if let Value::Object(nested) = value {
                for (k, v) in nested {
                    push_option(scheme, k, v, &mut out);
                }
            }
            continue;
        }
        push_option(scheme, key, value, &mut out);
    }
    out
}

fn push_option(scheme: &str, key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let value = match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        _ => {
            debug!(key, "skipping non-scalar storage option");
            return;
        }
    };
    let key = translate_key(scheme, key);
    if key == "aws_endpoint" && value.starts_with("http://") {
        out.push(("allow_http".into(), "true".into()));
    }
    out.push((key.to_string(), value));
}

fn translate_key<'a>(scheme: &str, key: &'a str) -> &'a str {
    match (scheme, key) {
        ("s3", "key") => "aws_access_key_id",
        ("s3", "secret") => "aws_secret_access_key",
        ("s3", "token") => "aws_session_token",
        ("s3", "endpoint_url") => "aws_endpoint",
        ("s3", "region_name") => "aws_region",
        ("s3", "anon") => "aws_skip_signature",
        ("gs", "token") => "google_service_account",
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn isolated() -> ObjectStoreFileSystem {
        ObjectStoreFileSystem::with_store(Protocol::new("memory"), Arc::new(InMemory::new()))
            .unwrap()
    }

    #[test]
    fn write_then_read() {
        let fs = isolated();
        fs.write("scratch/a.csv", b"x,y\n1,2\n", &OpenArgs::default())
            .unwrap();
        let data = fs.read("scratch/a.csv", &OpenArgs::default()).unwrap();
        assert_eq!(&data[..], b"x,y\n1,2\n");
        assert!(fs
            .read("scratch/missing.csv", &OpenArgs::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn exists_is_cached_until_invalidated() {
        let fs = isolated();
        assert!(!fs.exists("scratch/b.csv").unwrap());
        fs.write("scratch/b.csv", b"x\n", &OpenArgs::default()).unwrap();
        // stale until invalidated
        assert!(!fs.exists("scratch/b.csv").unwrap());
        fs.invalidate_cache("scratch/b.csv");
        assert!(fs.exists("scratch/b.csv").unwrap());
    }

    #[test]
    fn invalidation_reaches_parents_and_children() {
        let fs = isolated();
        fs.write("d/x/1.csv", b"x\n", &OpenArgs::default()).unwrap();
        assert!(fs.is_dir("d/x").unwrap());
        assert!(fs.exists("d/x/1.csv").unwrap());
        assert!(!fs.exists("other").unwrap());
        assert_eq!(fs.cached_entries(), 3);
        fs.invalidate_cache("d/x");
        assert_eq!(fs.cached_entries(), 1);
    }

    #[test]
    fn glob_includes_implied_directories() {
        let fs = isolated();
        for v in ["v1", "v2"] {
            fs.write(&format!("b/cars.csv/{}/cars.csv", v), b"x\n", &OpenArgs::default())
                .unwrap();
        }
        fs.write("b/cars.csv/v3/other.csv", b"x\n", &OpenArgs::default())
            .unwrap();
        assert_eq!(
            fs.glob("b/cars.csv/*/cars.csv").unwrap(),
            vec!["b/cars.csv/v1/cars.csv", "b/cars.csv/v2/cars.csv"]
        );
        assert_eq!(
            fs.glob("b/cars.csv/*").unwrap(),
            vec!["b/cars.csv/v1", "b/cars.csv/v2", "b/cars.csv/v3"]
        );
        assert_eq!(
            fs.glob("/b/cars.csv/v1/*").unwrap(),
            vec!["/b/cars.csv/v1/cars.csv"]
        );
        assert!(fs.glob("nothing/*/x").unwrap().is_empty());
    }

    #[test]
    fn glob_supports_classes_and_alternation() {
        let fs = isolated();
        for name in ["p/x1.csv", "p/x2.csv", "p/y1.csv", "p/deep/x3.csv"] {
            fs.write(name, b"x\n", &OpenArgs::default()).unwrap();
        }
        assert_eq!(fs.glob("p/x[12].csv").unwrap(), vec!["p/x1.csv", "p/x2.csv"]);
        assert_eq!(fs.glob("p/{x,y}1.csv").unwrap(), vec!["p/x1.csv", "p/y1.csv"]);
        assert_eq!(fs.glob("p/*.csv").unwrap().len(), 3);
        assert!(fs.glob("p/[x").is_err());
    }

    #[cfg(feature = "http")]
    #[test]
    fn http_stores_are_built_per_host() {
        let fs = ObjectStoreFileSystem::for_protocol(Protocol::new("https"), &OptionMap::new())
            .unwrap();
        let (_, location, host) = fs.locate("example.com/data/x.csv").unwrap();
        assert_eq!(host, "example.com");
        assert_eq!(location.as_ref(), "data/x.csv");
    }

    #[test]
    fn open_args_are_checked_per_mode() {
        let fs = isolated();
        let save = OpenArgs::from_value(Some(&json!({"content_type": "text/csv", "mode": "w"})))
            .unwrap();
        fs.write("c/a.csv", b"x\n", &save).unwrap();
        assert!(fs.read("c/a.csv", &save).is_err());

        let bogus = OpenArgs::from_value(Some(&json!({"block_size": "5"}))).unwrap();
        assert!(fs.write("c/a.csv", b"x\n", &bogus).is_err());
    }

    #[test]
    fn s3_options_use_object_store_names() {
        let options: OptionMap = serde_json::from_value(json!({
            "key": "fake_access_key",
            "secret": "fake_secret_key",
            "client_kwargs": {"endpoint_url": "http://127.0.0.1:5555/"},
            "auto_mkdir": true,
            "config_kwargs": {"retries": 3},
        }))
        .unwrap();
        let translated = store_options("s3", &options);
        assert!(translated.contains(&("aws_access_key_id".into(), "fake_access_key".into())));
        assert!(translated.contains(&("aws_secret_access_key".into(), "fake_secret_key".into())));
        assert!(translated.contains(&("aws_endpoint".into(), "http://127.0.0.1:5555/".into())));
        assert!(translated.contains(&("allow_http".into(), "true".into())));
        assert!(!translated.iter().any(|(k, _)| k == "auto_mkdir"));
        assert!(!translated.iter().any(|(k, _)| k == "config_kwargs"));
    }

    #[test]
    fn bucketed_paths_need_a_bucket() {
        let fs = ObjectStoreFileSystem::for_protocol(Protocol::new("s3"), &OptionMap::new())
            .unwrap();
        assert!(fs.exists("/").is_err());
    }

    #[test]
    fn related_paths() {
        assert!(related("a/b", "a/b"));
        assert!(related("a/b/c", "a/b"));
        assert!(related("a", "a/b"));
        assert!(!related("a/bc", "a/b"));
    }
}
