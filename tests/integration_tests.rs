//! End-to-end queries: plan, schedule, evaluate, assemble.

use std::collections::BTreeSet;
use std::sync::Arc;

use olapq_core::config::EngineConfig;
use olapq_core::error::ErrorKind;
use olapq_core::filter::Filter;
use olapq_core::measure::{Aggregation, Combination, Measure, Unfiltrator};
use olapq_core::query::{CubeQuery, QueryOption};
use olapq_core::step::GroupBy;
use olapq_core::types::{Carrier, MeasureValue, Scalar, Slice};
use olapq_exec::{Engine, Strategy};
use olapq_io::readers::csv::read_csv_path;
use olapq_io::MemoryTable;
use olapq_operators::Registry;
use olapq_planner::MeasureForest;

mod test_data_gen;
use test_data_gen::{abc_forest, create_temp_dir, engine, sales_table, two_row_table};

fn int(v: i64) -> MeasureValue {
    MeasureValue::Scalar(Scalar::I64(v))
}

#[test]
fn test_grand_total_under_both_strategies() {
    for concurrent in [false, true] {
        let engine = engine(abc_forest(), two_row_table(), Registry::new(), concurrent);
        let result = engine
            .execute(&CubeQuery::new().measure_refs(["A", "B", "C"]))
            .expect("query should run");

        let gt = Slice::grand_total();
        assert_eq!(result.view.len(), 1);
        assert_eq!(result.view.get(&gt, "A"), Some(&int(10)));
        assert_eq!(result.view.get(&gt, "B"), Some(&int(7)));
        assert_eq!(result.view.get(&gt, "C"), Some(&int(10)));
        assert_eq!(result.report.strategy, Strategy::from_flag(concurrent));
        assert_eq!(result.report.steps, 3);
    }
}

#[test]
fn test_concurrent_option_overrides_config() {
    let engine = engine(abc_forest(), two_row_table(), Registry::new(), false);
    let query = CubeQuery::new()
        .measure_refs(["C"])
        .option(QueryOption::Concurrent);
    let result = engine.execute(&query).expect("query should run");
    assert_eq!(result.report.strategy, Strategy::Parallel);
    assert_eq!(
        result.view.get(&Slice::grand_total(), "C"),
        Some(&int(10))
    );
}

#[test]
fn test_group_by_country() {
    let engine = engine(abc_forest(), two_row_table(), Registry::new(), true);
    let query = CubeQuery::new()
        .measure_refs(["A", "B", "C"])
        .group_by(GroupBy::of(["country"]));
    let result = engine.execute(&query).expect("query should run");

    let fr = Slice::from_pairs([("country", "FR")]);
    let de = Slice::from_pairs([("country", "DE")]);
    assert_eq!(result.view.len(), 2);
    assert_eq!(result.view.get(&fr, "A"), Some(&int(1)));
    assert_eq!(result.view.get(&fr, "C"), Some(&int(5)));
    assert_eq!(result.view.get(&de, "C"), Some(&int(9)));

    let order: Vec<&Slice> = result
        .view
        .sorted_rows()
        .into_iter()
        .map(|(s, _)| s)
        .collect();
    assert_eq!(order, vec![&de, &fr]);
}

#[test]
fn test_filtered_and_share_of_total() {
    let forest = MeasureForest::from_measures(
        "share",
        [
            Measure::aggregator("amount", "k1", Aggregation::Sum),
            Measure::filtrator("de_amount", "amount", Filter::equals("country", "DE")),
            Measure::Unfiltrator(Unfiltrator {
                name: "all_countries".into(),
                underlying: "amount".into(),
                columns: BTreeSet::from(["country".to_string()]),
            }),
            Measure::combinator("share", ["amount", "all_countries"], Combination::Ratio),
        ],
    )
    .expect("valid forest");

    for concurrent in [false, true] {
        let engine = engine(forest.clone(), two_row_table(), Registry::new(), concurrent);

        let query = CubeQuery::new()
            .measure_refs(["amount", "all_countries", "share"])
            .filter(Filter::equals("country", "FR"));
        let result = engine.execute(&query).expect("query should run");
        let gt = Slice::grand_total();
        assert_eq!(result.view.get(&gt, "amount"), Some(&int(1)));
        assert_eq!(result.view.get(&gt, "all_countries"), Some(&int(10)));
        assert_eq!(
            result.view.get(&gt, "share"),
            Some(&MeasureValue::Scalar(Scalar::F64(0.1)))
        );

        // The filtrator narrows on top of the query filter: FR and DE is empty.
        let result = engine
            .execute(&CubeQuery::new().measure_refs(["de_amount"]))
            .expect("query should run");
        assert_eq!(result.view.get(&gt, "de_amount"), Some(&int(9)));
        let result = engine
            .execute(&query.clone().measure_refs(["de_amount"]))
            .expect("query should run");
        assert_eq!(result.view.get(&gt, "de_amount"), None);
    }
}

#[test]
fn test_average_carriers() {
    let forest = MeasureForest::from_measures(
        "avg",
        [Measure::aggregator("avg_k2", "k2", Aggregation::Avg)],
    )
    .expect("valid forest");
    let engine = engine(forest, two_row_table(), Registry::new(), false);
    let gt = Slice::grand_total();

    let result = engine
        .execute(&CubeQuery::new().measure_refs(["avg_k2"]))
        .expect("query should run");
    assert_eq!(
        result.view.get(&gt, "avg_k2"),
        Some(&MeasureValue::Scalar(Scalar::F64(3.5)))
    );

    let wrapped = CubeQuery::new()
        .measure_refs(["avg_k2"])
        .option(QueryOption::AggregationCarriersStayWrapped);
    let result = engine.execute(&wrapped).expect("query should run");
    assert_eq!(
        result.view.get(&gt, "avg_k2"),
        Some(&MeasureValue::Carrier(Carrier::Avg {
            sum: 7.0,
            count: 2
        }))
    );
}

fn failing_forest() -> MeasureForest {
    MeasureForest::from_measures(
        "failing",
        [
            Measure::aggregator("A", "k1", Aggregation::Sum),
            Measure::aggregator("top_city", "city", Aggregation::Max),
            Measure::combinator("bad", ["A", "top_city"], Combination::Sum),
        ],
    )
    .expect("valid forest")
}

#[test]
fn test_computation_failure_names_the_measure() {
    for concurrent in [false, true] {
        let engine = engine(failing_forest(), two_row_table(), Registry::new(), concurrent);
        let err = engine
            .execute(&CubeQuery::new().measure_refs(["A", "bad"]))
            .expect_err("combining a string must fail");
        assert_eq!(err.kind(), ErrorKind::Computation);
        assert!(err.to_string().contains("bad <- [A, top_city]"), "{err}");
    }
}

#[test]
fn test_exceptions_as_measure_values() {
    for concurrent in [false, true] {
        let engine = engine(failing_forest(), two_row_table(), Registry::new(), concurrent);
        let query = CubeQuery::new()
            .measure_refs(["A", "bad"])
            .option(QueryOption::ExceptionsAsMeasureValue);
        let result = engine.execute(&query).expect("failure is captured");

        let gt = Slice::grand_total();
        assert_eq!(result.view.get(&gt, "A"), Some(&int(10)));
        match result.view.get(&gt, "bad") {
            Some(MeasureValue::Error { error }) => assert!(error.contains("bad"), "{error}"),
            other => panic!("expected an error value, got {other:?}"),
        }
    }
}

#[test]
fn test_strategies_agree_on_larger_model() {
    let mut measures = vec![
        Measure::aggregator("qty", "k1", Aggregation::Sum),
        Measure::aggregator("price", "k2", Aggregation::Max),
        Measure::aggregator("rows", olapq_io::memory_table::COUNT_STAR, Aggregation::Count),
        Measure::aggregator("avg_qty", "k1", Aggregation::Avg),
    ];
    for i in 0..12 {
        let prev = if i == 0 {
            "qty".to_string()
        } else {
            format!("m{}", i - 1)
        };
        let combination = match i % 4 {
            0 => Combination::Sum,
            1 => Combination::Max,
            2 => Combination::Difference,
            _ => Combination::Product,
        };
        measures.push(Measure::combinator(
            format!("m{i}"),
            [prev, "price".to_string(), "rows".to_string()],
            combination,
        ));
    }
    measures.push(Measure::combinator(
        "per_row",
        ["qty", "rows"],
        Combination::Ratio,
    ));
    let forest = MeasureForest::from_measures("big", measures).expect("valid forest");

    let query = CubeQuery::new()
        .measure_refs(["m11", "m5", "per_row", "avg_qty", "qty"])
        .group_by(GroupBy::of(["country", "city"]));

    let sequential = engine(forest.clone(), sales_table(400), Registry::new(), false)
        .execute(&query)
        .expect("sequential run");
    let parallel = engine(forest, sales_table(400), Registry::new(), true)
        .execute(&query)
        .expect("parallel run");

    assert!(!sequential.view.is_empty());
    assert_eq!(sequential.view, parallel.view);
    assert_eq!(sequential.report.plan_hash, parallel.report.plan_hash);
}

#[test]
fn test_facts_from_csv_file() {
    let dir = create_temp_dir();
    let path = std::path::Path::new(&dir).join("facts.csv");
    std::fs::write(
        &path,
        "country,city,k1,k2\nFR,Paris,1,5\nDE,Berlin,9,2\nFR,Lyon,4,\n",
    )
    .expect("write csv");

    let batch = read_csv_path(&path).expect("read csv");
    let table = MemoryTable::new("facts", batch);
    let cfg = EngineConfig {
        max_parallel_tasks: 2,
        ..EngineConfig::default()
    };
    let engine = Engine::new(cfg, Arc::new(abc_forest()), Arc::new(table));

    let query = CubeQuery::new()
        .measure_refs(["A", "B"])
        .group_by(GroupBy::of(["country"]));
    let result = engine.execute(&query).expect("query should run");

    let fr = Slice::from_pairs([("country", "FR")]);
    assert_eq!(result.view.get(&fr, "A"), Some(&int(5)));
    assert_eq!(result.view.get(&fr, "B"), Some(&int(5)));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_report_serializes_feedback() {
    let engine = engine(abc_forest(), two_row_table(), Registry::new(), false);
    let result = engine
        .execute(&CubeQuery::new().measure_refs(["C"]))
        .expect("query should run");

    assert_eq!(result.report.feedback.len(), 3);
    let c = result
        .report
        .feedback
        .iter()
        .find(|f| f.measure == "C")
        .expect("feedback for C");
    assert_eq!(c.size, 1);

    let json = result.report.to_json_pretty().expect("serialize report");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(parsed["steps"], 3);
    assert_eq!(parsed["strategy"], "sequential");
}
