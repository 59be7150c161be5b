//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use olapq_core::config::EngineConfig;
use olapq_core::measure::{Aggregation, Combination, CustomMeasure, Measure};
use olapq_core::types::{RowBatch, Scalar};
use olapq_exec::Engine;
use olapq_io::MemoryTable;
use olapq_operators::Registry;
use olapq_planner::MeasureForest;

/// The two-row fact table: `{k1: 1, k2: 5}`, `{k1: 9, k2: 2}`.
pub fn two_row_table() -> MemoryTable {
    let batch = RowBatch::from_rows(
        &["country", "city", "k1", "k2"],
        vec![
            vec![
                Scalar::Str("FR".into()),
                Scalar::Str("Paris".into()),
                Scalar::I64(1),
                Scalar::I64(5),
            ],
            vec![
                Scalar::Str("DE".into()),
                Scalar::Str("Berlin".into()),
                Scalar::I64(9),
                Scalar::I64(2),
            ],
        ],
    )
    .expect("valid fixture rows");
    MemoryTable::new("facts", batch)
}

/// `rows` synthetic sales rows over 4 countries and 10 cities.
pub fn sales_table(rows: usize) -> MemoryTable {
    let countries = ["FR", "DE", "IT", "ES"];
    let mut data = Vec::with_capacity(rows);
    for i in 0..rows {
        data.push(vec![
            Scalar::Str(countries[i % 4].to_string()),
            Scalar::Str(format!("city-{}", i % 10)),
            Scalar::I64((i % 17) as i64),
            Scalar::I64((i % 5) as i64 + 1),
        ]);
    }
    let batch = RowBatch::from_rows(&["country", "city", "k1", "k2"], data)
        .expect("valid synthetic rows");
    MemoryTable::new("sales", batch)
}

/// `A = sum(k1)`, `B = sum(k2)`, `C = max(A, B)`.
pub fn abc_forest() -> MeasureForest {
    MeasureForest::from_measures(
        "abc",
        [
            Measure::aggregator("A", "k1", Aggregation::Sum),
            Measure::aggregator("B", "k2", Aggregation::Sum),
            Measure::combinator("C", ["A", "B"], Combination::Max),
        ],
    )
    .expect("valid forest")
}

pub fn engine(
    forest: MeasureForest,
    table: MemoryTable,
    registry: Registry,
    concurrent: bool,
) -> Engine {
    let cfg = EngineConfig {
        concurrent,
        max_parallel_tasks: 4,
        ..EngineConfig::default()
    };
    Engine::new(cfg, Arc::new(forest), Arc::new(table)).with_registry(registry)
}

pub fn custom(name: &str, key: &str, underlyings: &[&str]) -> Measure {
    Measure::Custom(CustomMeasure {
        name: name.to_string(),
        key: key.to_string(),
        underlyings: underlyings.iter().map(|s| s.to_string()).collect(),
        params: BTreeMap::new(),
    })
}

static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);

/// Fresh scratch directory under the system temp dir.
pub fn create_temp_dir() -> String {
    let dir = std::env::temp_dir().join(format!(
        "olapq-test-{}-{}",
        std::process::id(),
        NEXT_DIR.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::create_dir_all(&dir).expect("Failed to create temp dir");
    dir.to_string_lossy().into_owned()
}
