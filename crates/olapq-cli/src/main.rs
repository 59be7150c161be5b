//! olapq CLI: run, validate and explain cube models.

use clap::{Parser, Subcommand};
use olapq_core::config::EngineConfig;
use olapq_core::types::{MeasureValue, RowBatch};
use olapq_exec::{Engine, TabularView};
use olapq_io::readers::csv::read_csv_path;
use olapq_io::MemoryTable;
use olapq_operators::Registry;
use olapq_planner::dsl::yaml::TableDef;
use olapq_planner::explain::explain_plan;
use olapq_planner::{parse_yaml_model, ModelFile, PlanBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "olapq")]
#[command(about = "olapq: measure-graph cube query engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the query of a YAML model file
    Run {
        /// Path to the model YAML file
        #[arg(short, long)]
        model: PathBuf,

        /// Use the parallel strategy (overrides config)
        #[arg(long)]
        concurrent: bool,

        /// Worker pool size (overrides config)
        #[arg(long)]
        max_parallel: Option<usize>,

        /// Print the query report as JSON after the rows
        #[arg(long)]
        report: bool,
    },

    /// Validate a model file: parse it and build its plan
    Validate {
        /// Path to the model YAML file
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Show the plan of a model's query (EXPLAIN)
    Explain {
        /// Path to the model YAML file
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            model,
            concurrent,
            max_parallel,
            report,
        } => {
            if let Err(e) = run_model(&model, concurrent, max_parallel, report) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { model } => {
            if let Err(e) = validate_model(&model) {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
            println!("✓ Model is valid");
        }
        Commands::Explain { model } => {
            if let Err(e) = explain_model(&model) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_model(path: &Path) -> Result<ModelFile, Box<dyn std::error::Error>> {
    let yaml = fs::read_to_string(path)?;
    Ok(parse_yaml_model(&yaml)?)
}

fn load_table(def: &TableDef) -> Result<MemoryTable, Box<dyn std::error::Error>> {
    let batch = match &def.csv {
        Some(path) => read_csv_path(path)?,
        None => {
            let columns: Vec<&str> = def.columns.iter().map(String::as_str).collect();
            RowBatch::from_rows(&columns, def.rows.clone())?
        }
    };
    Ok(MemoryTable::new(def.name.clone(), batch))
}

fn run_model(
    path: &Path,
    concurrent: bool,
    max_parallel: Option<usize>,
    report: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(path)?;

    let mut config = model.config.clone().unwrap_or_else(EngineConfig::from_env);
    if concurrent {
        config.concurrent = true;
    }
    if let Some(n) = max_parallel {
        config.max_parallel_tasks = n;
    }
    config.validate()?;

    let table = load_table(&model.table)?;
    println!("Loaded table '{}' ({} rows)", table.name(), table.num_rows());

    let engine = Engine::new(config, Arc::new(model.forest()?), Arc::new(table));
    let result = engine.execute(&model.cube_query())?;

    print_view(&result.view);
    if report {
        println!("{}", result.report.to_json_pretty()?);
    }
    Ok(())
}

fn validate_model(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(path)?;
    let forest = model.forest()?;
    let registry = Registry::new();
    let plan = PlanBuilder::new(&forest, &registry).build(&model.cube_query())?;
    println!(
        "Model '{}': {} measures, plan of {} steps",
        model.name,
        forest.len(),
        plan.len()
    );
    Ok(())
}

fn explain_model(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_model(path)?;
    let forest = model.forest()?;
    let registry = Registry::new();
    let plan = PlanBuilder::new(&forest, &registry).build(&model.cube_query())?;

    println!("=== Plan ===");
    for line in explain_plan(&plan) {
        println!("{line}");
    }
    println!();
    println!("=== Shape ===");
    println!("Steps: {}", plan.len());
    println!("Roots: {}", plan.roots().len());
    println!("Leaves: {}", plan.leaves().len());
    println!("Max depth: {}", plan.max_depth());
    Ok(())
}

fn print_view(view: &TabularView) {
    let measures: Vec<&str> = view.measure_names().into_iter().collect();
    println!("slice\t{}", measures.join("\t"));
    for (slice, row) in view.sorted_rows() {
        let cells: Vec<String> = measures
            .iter()
            .map(|m| row.get(*m).map(cell).unwrap_or_default())
            .collect();
        println!("{}\t{}", slice, cells.join("\t"));
    }
}

fn cell(value: &MeasureValue) -> String {
    match value {
        MeasureValue::Scalar(s) if s.is_null() => String::new(),
        other => serde_json::to_string(other).unwrap_or_else(|_| other.to_string()),
    }
}
