//! Tabular input and output
//!
//! Loading the raw export and writing the tidy table are thin wrappers over
//! polars; the pipeline itself only sees [`RawRecord`](crate::RawRecord)s.

pub mod frame;
pub mod reader;
pub mod writer;

pub use frame::to_dataframe;
pub use reader::{load_raw_records, read_raw_table, records_from_frame};
pub use writer::write_table;
