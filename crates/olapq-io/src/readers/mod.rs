//! Readers that load fact rows into `RowBatch`es.

pub mod csv;
