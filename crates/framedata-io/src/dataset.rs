//! Format-aware view over files behind a `FileSystem`.
//!
//! Used for remote stores, where there is no local path to scan. The view
//! resolves its fragments when built; bytes are fetched when the scan runs.

use std::fmt;
use std::sync::Arc;

use framedata_core::format::FileFormat;
use framedata_core::options::OptionMap;

use crate::error::{Error, Result};
use crate::frame::{DataFrame, LazyFrame, Scan};
use crate::fs::{join, FileSystem, OpenArgs};
use crate::registry::{FormatRegistry, ReadFn};

pub struct FileDataset {
    path: String,
    format: FileFormat,
    fs: Arc<dyn FileSystem>,
    fragments: Vec<String>,
    read: ReadFn,
    open_args: OpenArgs,
}

impl FileDataset {
    /// View of `path`: a single file, or every file directly inside a
    /// directory in name order.
    pub fn new(path: &str, fs: Arc<dyn FileSystem>, format: FileFormat) -> Result<Self> {
        let read = FormatRegistry::global()
            .get(format)
            .map(|r| r.read)
            .ok_or_else(|| Error::Unsupported(format!("no {} reader in this build", format)))?;

        if !fs.exists(path)? {
            return Err(Error::NotFound(path.to_string()));
        }
        let fragments = if fs.is_dir(path)? {
            let mut files = Vec::new();
            for candidate in fs.glob(&join(path, "*"))? {
                if !fs.is_dir(&candidate)? {
                    files.push(candidate);
                }
            }
            files
        } else {
            vec![path.to_string()]
        };
        tracing::debug!(path, fragments = fragments.len(), %format, "resolved file dataset");

        Ok(Self {
            path: path.to_string(),
            format,
            fs,
            fragments,
            read,
            open_args: OpenArgs::default(),
        })
    }

    /// Arguments for every fragment's open call.
    pub fn with_open_args(mut self, args: OpenArgs) -> Self {
        self.open_args = args;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Deferred read of every fragment with default decode options.
    pub fn scan(self) -> LazyFrame {
        LazyFrame::new(self)
    }
}

impl fmt::Debug for FileDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDataset")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("fragments", &self.fragments)
            .finish()
    }
}

impl Scan for FileDataset {
    fn describe(&self) -> String {
        format!(
            "{} dataset scan of {}://{}",
            self.format,
            self.fs.protocol(),
            self.path
        )
    }

    fn execute(self: Box<Self>) -> Result<DataFrame> {
        let defaults = OptionMap::new();
        let mut frames = Vec::with_capacity(self.fragments.len());
        for fragment in &self.fragments {
            let data = self.fs.read(fragment, &self.open_args)?;
            tracing::trace!(fragment = %fragment, bytes = data.len(), "fetched fragment");
            let frame = (self.read)(data, &defaults).map_err(|e| e.with_context(fragment.clone()))?;
            frames.push(frame);
        }
        concat_frames(frames)
    }
}

/// Stack frames with matching columns.
fn concat_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut iter = frames.into_iter();
    let Some(first) = iter.next() else {
        return Err(Error::Schema("dataset has no files to read".into()));
    };
    let schema = first.schema();
    let mut batches = first.batches().to_vec();
    for frame in iter {
        let other = frame.schema();
        let same = schema.fields().len() == other.fields().len()
            && schema
                .fields()
                .iter()
                .zip(other.fields().iter())
                .all(|(a, b)| a.name() == b.name() && a.data_type() == b.data_type());
        if !same {
            return Err(Error::Schema(format!(
                "fragment columns {:?} do not match {:?}",
                frame.column_names(),
                first.column_names()
            )));
        }
        batches.extend(frame.batches().iter().cloned());
    }
    DataFrame::new(schema, batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ObjectStoreFileSystem;
    use crate::writers::csv::write_csv;
    use arrow_array::{ArrayRef, Int64Array};

    fn frame(values: Vec<i64>) -> DataFrame {
        DataFrame::from_columns(vec![("n", Arc::new(Int64Array::from(values)) as ArrayRef)])
            .unwrap()
    }

    fn memory() -> Arc<dyn FileSystem> {
        Arc::new(ObjectStoreFileSystem::memory().unwrap())
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = FileDataset::new("/io-dataset/missing.csv", memory(), FileFormat::Csv)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn single_file_scan_is_lazy() {
        let fs = memory();
        let data = write_csv(&frame(vec![1, 2]), &OptionMap::new()).unwrap();
        fs.write("/io-dataset/single.csv", &data, &OpenArgs::default()).unwrap();

        let ds = FileDataset::new("/io-dataset/single.csv", Arc::clone(&fs), FileFormat::Csv)
            .unwrap();
        assert_eq!(ds.fragments(), ["/io-dataset/single.csv".to_string()]);
        let lf = ds.scan();
        assert!(lf.describe().contains("memory://"));
        assert_eq!(lf.collect().unwrap(), frame(vec![1, 2]));
    }

    #[test]
    fn directory_fragments_are_stacked_in_name_order() {
        let fs = memory();
        for (name, values) in [("b.csv", vec![3, 4]), ("a.csv", vec![1, 2])] {
            let data = write_csv(&frame(values), &OptionMap::new()).unwrap();
            fs.write(&format!("/io-dataset/dir/{}", name), &data, &OpenArgs::default())
                .unwrap();
        }
        let df = FileDataset::new("/io-dataset/dir", fs, FileFormat::Csv)
            .unwrap()
            .scan()
            .collect()
            .unwrap();
        assert_eq!(df, frame(vec![1, 2, 3, 4]));
    }
}
