//! Format writers. Each serializes a whole `DataFrame` into an in-memory
//! buffer; the caller hands the bytes to a `FileSystem`.

pub mod csv;
#[cfg(feature = "parquet")]
pub mod parquet;
