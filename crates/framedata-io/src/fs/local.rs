//! Local disk through `std::fs`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use bytes::Bytes;
use framedata_core::options::{OptionMap, AUTO_MKDIR_KEY};
use framedata_core::protocol::Protocol;
use serde_json::Value;
use tracing::trace;

use super::{join, FileSystem, OpenArgs, OpenMode};
use crate::error::{Error, Result};
use crate::glob::{compile, has_magic, segments};

#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    protocol: Protocol,
    auto_mkdir: bool,
}

impl LocalFileSystem {
    pub fn new(auto_mkdir: bool) -> Self {
        Self {
            protocol: Protocol::local(),
            auto_mkdir,
        }
    }

    /// Reads `auto_mkdir` (default false); other storage options do not
    /// apply to local disk and are ignored.
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        let auto_mkdir = match options.get(AUTO_MKDIR_KEY) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(Error::Options(format!(
                    "'{}' expects a boolean, got {}",
                    AUTO_MKDIR_KEY, other
                )))
            }
        };
        Ok(Self::new(auto_mkdir))
    }

    pub fn auto_mkdir(&self) -> bool {
        self.auto_mkdir
    }
}

impl FileSystem for LocalFileSystem {
    fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(Path::new(path).try_exists()?)
    }

    fn is_dir(&self, path: &str) -> Result<bool> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn glob(&self, pattern: &str) -> Result<Vec<String>> {
        let mut frontier = vec![if pattern.starts_with('/') {
            "/".to_string()
        } else {
            String::new()
        }];

        for segment in segments(pattern) {
            let matcher = if has_magic(segment) {
                Some(compile(segment)?)
            } else {
                None
            };
            let mut next = Vec::new();
            for base in &frontier {
                let Some(matcher) = &matcher else {
                    let candidate = join(base, segment);
                    if Path::new(&candidate).try_exists()? {
                        next.push(candidate);
                    }
                    continue;
                };
                let dir = if base.is_empty() { "." } else { base.as_str() };
                if !Path::new(dir).is_dir() {
                    continue;
                }
                let entries = match fs::read_dir(dir) {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => return Err(e.into()),
                };
                for entry in entries {
                    let name = entry?.file_name().to_string_lossy().into_owned();
                    if matcher.is_match(&name) {
                        next.push(join(base, &name));
                    }
                }
            }
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        frontier.retain(|p| !p.is_empty() && p != "/");
        frontier.sort();
        Ok(frontier)
    }

    fn read(&self, path: &str, args: &OpenArgs) -> Result<Bytes> {
        args.validate(self, OpenMode::Read)?;
        match fs::read(path) {
            Ok(data) => {
                trace!(path, bytes = data.len(), "read local file");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, path: &str, data: &[u8], args: &OpenArgs) -> Result<()> {
        args.validate(self, OpenMode::Write)?;
        if self.auto_mkdir {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        fs::write(path, data)?;
        trace!(path, bytes = data.len(), "wrote local file");
        Ok(())
    }

    fn invalidate_cache(&self, _path: &str) {}

    fn open_arg_keys(&self, _mode: OpenMode) -> &'static [&'static str] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(dir: &tempfile::TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[test]
    fn write_creates_parents_when_auto_mkdir() {
        let dir = tempfile::tempdir().unwrap();
        let path = format!("{}/a/b/c.csv", root(&dir));

        let strict = LocalFileSystem::new(false);
        assert!(strict.write(&path, b"x", &OpenArgs::default()).is_err());

        let fs = LocalFileSystem::new(true);
        fs.write(&path, b"a,b\n1,2\n", &OpenArgs::default()).unwrap();
        assert!(fs.exists(&path).unwrap());
        assert!(!fs.is_dir(&path).unwrap());
        assert!(fs.is_dir(&format!("{}/a/b", root(&dir))).unwrap());
        assert_eq!(&fs.read(&path, &OpenArgs::default()).unwrap()[..], b"a,b\n1,2\n");
    }

    #[test]
    fn missing_files_read_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::new(true);
        let err = fs
            .read(&format!("{}/nope.csv", root(&dir)), &OpenArgs::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn glob_expands_version_directories() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::new(true);
        let base = format!("{}/cars.csv", root(&dir));
        for v in ["v2", "v1", "v3"] {
            fs.write(&format!("{}/{}/cars.csv", base, v), b"a\n", &OpenArgs::default())
                .unwrap();
        }
        fs.write(&format!("{}/v4/other.csv", base), b"a\n", &OpenArgs::default())
            .unwrap();

        let found = fs.glob(&format!("{}/*/cars.csv", base)).unwrap();
        assert_eq!(
            found,
            vec![
                format!("{}/v1/cars.csv", base),
                format!("{}/v2/cars.csv", base),
                format!("{}/v3/cars.csv", base),
            ]
        );
        assert!(fs
            .glob(&format!("{}/missing/*/x.csv", root(&dir)))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn glob_wildcards_do_not_cross_directories() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::new(true);
        for name in ["a1.csv", "a2.csv", "b1.csv", "sub/a3.csv"] {
            fs.write(&format!("{}/{}", root(&dir), name), b"x\n", &OpenArgs::default())
                .unwrap();
        }

        let found = fs.glob(&format!("{}/a*", root(&dir))).unwrap();
        assert_eq!(
            found,
            vec![format!("{}/a1.csv", root(&dir)), format!("{}/a2.csv", root(&dir))]
        );
        let found = fs.glob(&format!("{}/{{a,b}}1.csv", root(&dir))).unwrap();
        assert_eq!(
            found,
            vec![format!("{}/a1.csv", root(&dir)), format!("{}/b1.csv", root(&dir))]
        );
        assert!(fs.glob(&format!("{}/[ab", root(&dir))).is_err());
    }

    #[test]
    fn auto_mkdir_option_must_be_bool() {
        let opts: OptionMap = [(AUTO_MKDIR_KEY.to_string(), Value::from("yes"))]
            .into_iter()
            .collect();
        assert!(LocalFileSystem::from_options(&opts).is_err());
        let opts: OptionMap = [(AUTO_MKDIR_KEY.to_string(), Value::from(true))]
            .into_iter()
            .collect();
        assert!(LocalFileSystem::from_options(&opts).unwrap().auto_mkdir());
    }
}
