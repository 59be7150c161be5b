#![forbid(unsafe_code)]
//! olapq-io: where leaf columns come from.
//!
//! The engine asks a `LeafSource` for the column of every leaf step before
//! scheduling. `MemoryTable` answers by filtering, grouping and aggregating
//! fact rows held in memory; `readers::csv` loads such rows from disk.

pub mod error;
pub mod memory_table;
pub mod readers;
pub mod source;

pub use error::IoError;
pub use memory_table::MemoryTable;
pub use source::LeafSource;
