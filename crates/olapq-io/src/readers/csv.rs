//! CSV → `RowBatch` loader.
//!
//! Cell types are inferred per cell: empty → null, then integer, float,
//! boolean, and finally string.

use std::io::Read;
use std::path::Path;

use olapq_core::types::{Column, RowBatch, Scalar};

use crate::error::IoError;

pub fn read_csv_path(path: impl AsRef<Path>) -> Result<RowBatch, IoError> {
    let file = std::fs::File::open(path.as_ref())?;
    read_csv(file)
}

pub fn read_csv<R: Read>(reader: R) -> Result<RowBatch, IoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut columns: Vec<Column> = headers
        .iter()
        .map(|h| Column {
            name: h.to_string(),
            values: Vec::new(),
        })
        .collect();

    for record in rdr.records() {
        let record = record?;
        for (i, col) in columns.iter_mut().enumerate() {
            col.values.push(record.get(i).map(infer).unwrap_or(Scalar::Null));
        }
    }

    tracing::debug!(
        columns = columns.len(),
        rows = columns.first().map(|c| c.len()).unwrap_or(0),
        "loaded csv"
    );
    Ok(RowBatch { columns })
}

fn infer(cell: &str) -> Scalar {
    if cell.is_empty() {
        return Scalar::Null;
    }
    if let Ok(v) = cell.parse::<i64>() {
        return Scalar::I64(v);
    }
    if let Ok(v) = cell.parse::<f64>() {
        return Scalar::F64(v);
    }
    match cell {
        "true" | "TRUE" => Scalar::Bool(true),
        "false" | "FALSE" => Scalar::Bool(false),
        _ => Scalar::Str(cell.to_string()),
    }
}
