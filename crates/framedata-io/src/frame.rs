//! In-memory frames.
//!
//! `DataFrame` is a schema plus Arrow record batches. `LazyFrame` defers a
//! `Scan` until `collect`, so building one reads no rows.

use std::fmt;
use std::sync::Arc;

use arrow_array::{new_empty_array, Array, ArrayRef, RecordBatch};
use arrow_schema::SchemaRef;
use arrow_select::concat::{concat, concat_batches};

use crate::error::{Error, Result};

#[derive(Clone)]
pub struct DataFrame {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl DataFrame {
    /// Batches must all carry `schema`'s columns, in order.
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<Self> {
        for batch in &batches {
            let names: Vec<&String> = batch.schema_ref().fields().iter().map(|f| f.name()).collect();
            let expected: Vec<&String> = schema.fields().iter().map(|f| f.name()).collect();
            if names != expected {
                return Err(Error::Schema(format!(
                    "batch columns {:?} do not match frame columns {:?}",
                    names, expected
                )));
            }
        }
        Ok(Self { schema, batches })
    }

    /// Frame from named columns of equal length.
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use arrow_array::{ArrayRef, Int64Array};
    /// use framedata_io::DataFrame;
    ///
    /// let df = DataFrame::from_columns(vec![
    ///     ("col1", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
    ///     ("col2", Arc::new(Int64Array::from(vec![4, 5])) as ArrayRef),
    /// ])
    /// .unwrap();
    /// assert_eq!(df.num_rows(), 2);
    /// ```
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ArrayRef)>,
        S: AsRef<str>,
    {
        let batch = RecordBatch::try_from_iter(columns)?;
        Ok(Self::from(batch))
    }

    pub fn empty(schema: SchemaRef) -> Self {
        Self {
            schema,
            batches: Vec::new(),
        }
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.fields().iter().map(|f| f.name().as_str()).collect()
    }

    /// The named column across all batches.
    pub fn column(&self, name: &str) -> Result<ArrayRef> {
        let idx = self
            .schema
            .index_of(name)
            .map_err(|_| Error::Schema(format!("unknown column '{}'", name)))?;
        self.column_at(idx)
    }

    fn column_at(&self, idx: usize) -> Result<ArrayRef> {
        let parts: Vec<&dyn Array> = self
            .batches
            .iter()
            .map(|b| b.column(idx).as_ref())
            .collect();
        match parts.as_slice() {
            [] => Ok(new_empty_array(self.schema.field(idx).data_type())),
            [single] => Ok(single.slice(0, single.len())),
            _ => Ok(concat(&parts)?),
        }
    }

    /// All rows as a single batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        Ok(concat_batches(&self.schema, &self.batches)?)
    }

    /// First `n` rows.
    pub fn head(mut self, n: usize) -> Self {
        let mut remaining = n;
        let mut kept = Vec::with_capacity(self.batches.len());
        for batch in self.batches.drain(..) {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(batch.num_rows());
            kept.push(batch.slice(0, take));
            remaining -= take;
        }
        self.batches = kept;
        self
    }

    pub fn lazy(self) -> LazyFrame {
        LazyFrame::new(FrameScan(self))
    }
}

impl From<RecordBatch> for DataFrame {
    fn from(batch: RecordBatch) -> Self {
        Self {
            schema: batch.schema(),
            batches: vec![batch],
        }
    }
}

/// Equal when column names, data types and values match. Field nullability
/// and batch boundaries are ignored.
impl PartialEq for DataFrame {
    fn eq(&self, other: &Self) -> bool {
        if self.num_columns() != other.num_columns() || self.num_rows() != other.num_rows() {
            return false;
        }
        let fields = self.schema.fields().iter().zip(other.schema.fields().iter());
        for (idx, (a, b)) in fields.enumerate() {
            if a.name() != b.name() || a.data_type() != b.data_type() {
                return false;
            }
            match (self.column_at(idx), other.column_at(idx)) {
                (Ok(x), Ok(y)) if x.to_data() == y.to_data() => {}
                _ => return false,
            }
        }
        true
    }
}

impl fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFrame")
            .field("columns", &self.column_names())
            .field("rows", &self.num_rows())
            .field("batches", &self.batches.len())
            .finish()
    }
}

/// A deferred read. `execute` does the I/O.
pub trait Scan: Send {
    /// One-line description of the source, e.g. `csv scan of data/cars.csv`.
    fn describe(&self) -> String;

    fn execute(self: Box<Self>) -> Result<DataFrame>;
}

struct FrameScan(DataFrame);

impl Scan for FrameScan {
    fn describe(&self) -> String {
        format!("in-memory frame ({} rows)", self.0.num_rows())
    }

    fn execute(self: Box<Self>) -> Result<DataFrame> {
        Ok(self.0)
    }
}

pub struct LazyFrame {
    scan: Box<dyn Scan>,
    limit: Option<usize>,
}

impl LazyFrame {
    pub fn new(scan: impl Scan + 'static) -> Self {
        Self {
            scan: Box::new(scan),
            limit: None,
        }
    }

    /// Keep at most `n` rows once collected.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(self.limit.map_or(n, |current| current.min(n)));
        self
    }

    pub fn describe(&self) -> String {
        match self.limit {
            Some(n) => format!("{} limit {}", self.scan.describe(), n),
            None => self.scan.describe(),
        }
    }

    /// Run the scan and materialize the result.
    pub fn collect(self) -> Result<DataFrame> {
        let frame = self.scan.execute()?;
        Ok(match self.limit {
            Some(n) => frame.head(n),
            None => frame,
        })
    }
}

impl fmt::Debug for LazyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LazyFrame({})", self.describe())
    }
}

/// Data handed to a save: either already materialized or still lazy.
#[derive(Debug)]
pub enum Frame {
    Eager(DataFrame),
    Lazy(LazyFrame),
}

impl Frame {
    pub fn collect(self) -> Result<DataFrame> {
        match self {
            Frame::Eager(df) => Ok(df),
            Frame::Lazy(lf) => lf.collect(),
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Frame::Lazy(_))
    }
}

impl From<DataFrame> for Frame {
    fn from(df: DataFrame) -> Self {
        Frame::Eager(df)
    }
}

impl From<LazyFrame> for Frame {
    fn from(lf: LazyFrame) -> Self {
        Frame::Lazy(lf)
    }
}
