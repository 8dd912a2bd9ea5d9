//! Command-line interface for training, inspection, and prediction

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::*;

use crate::data::{DataLoader, DatasetSummary};
use crate::evaluation::ModelEvaluator;
use crate::persistence::{
    find_model_file, load_model, load_preprocessing_params, predict_from_csv,
    predict_single_patient, save_model, save_preprocessing_params, ClassLabels,
};
use crate::preprocessing::{prepare_data, PrepareConfig, ScalerMethod};
use crate::report::EvaluationReport;
use crate::resampling::BalanceMethod;
use crate::training::ModelTrainer;

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).len();
    let pad = if visible_len < W { W - visible_len } else { 0 };
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).len();
    let total_pad = if visible_len < W { W - visible_len } else { 0 };
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn wait_enter() {
    println!();
    println!("  {}", dim("press enter to continue"));
    let mut input = String::new();
    let _ = std::io::stdin().read_line(&mut input);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "parkinson-detect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parkinson's disease detection from voice measurements")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train every registered model and save the best one
    Train {
        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Target column name
        #[arg(short, long, default_value = "status")]
        target: String,

        /// Identifier columns to drop before modeling
        #[arg(long, default_value = "name")]
        drop: Vec<String>,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Scaling method (standard, minmax, none)
        #[arg(long, default_value = "standard")]
        scale: String,

        /// Balancing method (smote, undersample, smotetomek, none)
        #[arg(long, default_value = "smote")]
        balance: String,

        /// Random seed for splitting, balancing, and seeded models
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Directory for model, scaler, manifest, and report artifacts
        #[arg(short, long, default_value = "models")]
        output: PathBuf,
    },

    /// Batch-predict a CSV file using saved artifacts
    Predict {
        /// Directory holding the model, scaler, and feature manifest
        #[arg(short, long, default_value = "models")]
        models: PathBuf,

        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,

        /// Output predictions file (default: <input>_predictions.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show dataset information
    Info {
        /// Input data file (CSV)
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    data_path: &PathBuf,
    target: &str,
    drop: &[String],
    test_fraction: f64,
    scale: &str,
    balance: &str,
    seed: u64,
    output: &PathBuf,
) -> anyhow::Result<()> {
    section("Train");

    // Configuration errors fail fast, before any work
    let scale_method = match scale {
        "none" => None,
        other => Some(ScalerMethod::from_str(other)?),
    };
    let balance_method = match balance {
        "none" => None,
        other => Some(BalanceMethod::from_str(other)?),
    };

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let summary = DatasetSummary::describe(&df, Some(target))?;
    if !summary.class_counts.is_empty() {
        let dist: Vec<String> = summary
            .class_counts
            .iter()
            .map(|(class, count)| format!("{}: {}", class, count))
            .collect();
        println!("  {:<16} {}", muted("Classes"), dist.join("  "));
    }

    step_run("Preparing data");
    let start = Instant::now();
    let config = PrepareConfig::new(target)
        .with_drop_columns(drop.to_vec())
        .with_test_fraction(test_fraction)
        .with_seed(seed)
        .with_scale(scale_method)
        .with_balance(balance_method);
    let prepared = prepare_data(&df, &config)?;
    step_done(&format!(
        "{} train / {} test rows in {:?}",
        prepared.x_train.nrows(),
        prepared.x_test.nrows(),
        start.elapsed()
    ));

    let trainer = ModelTrainer::new();
    println!();
    println!(
        "  {:<24} {:>10} {:>10} {:>10}",
        muted("Model"),
        muted("Accuracy"),
        muted("F1"),
        muted("ROC-AUC")
    );
    println!("  {}", dim(&"─".repeat(58)));

    let fitted = trainer.train_all_models(&prepared.x_train, &prepared.y_train);
    let records = ModelEvaluator::evaluate_all_models(&fitted, &prepared.x_test, &prepared.y_test);

    for record in &records {
        let auc = record
            .roc_auc
            .map_or("n/a".to_string(), |v| format!("{:.4}", v));
        println!(
            "  {:<24} {:>10.4} {:>10.4} {:>10}",
            record.model_name, record.accuracy, record.f1, auc
        );
    }
    println!("  {}", dim(&"─".repeat(58)));

    let Some(best) = records.first() else {
        anyhow::bail!("No model trained successfully");
    };
    println!();
    println!(
        "  {} {} {} {:.4}",
        ok("best"),
        best.model_name.white().bold(),
        muted("accuracy:"),
        best.accuracy
    );

    step_run(&format!("Saving artifacts → {}", output.display()));
    let best_fitted = fitted
        .iter()
        .find(|f| f.name == best.model_name)
        .ok_or_else(|| anyhow::anyhow!("ranked model {} was not fitted", best.model_name))?;
    save_model(best_fitted, output)?;
    save_preprocessing_params(prepared.scaler.as_ref(), &prepared.feature_names, output)?;
    EvaluationReport::new(records).write(output)?;
    step_done("model, scaler, manifest, report");

    println!();
    Ok(())
}

pub fn cmd_predict(
    models_dir: &PathBuf,
    data_path: &PathBuf,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading artifacts");
    let model_path = find_model_file(models_dir)?;
    let fitted = load_model(&model_path)?;
    let (scaler, feature_names) = load_preprocessing_params(models_dir)?;
    step_done(&format!("{}", model_path.display()));

    step_run("Predicting");
    let start = Instant::now();
    let (out_path, n_rows) = predict_from_csv(
        &fitted,
        scaler.as_ref(),
        &feature_names,
        data_path,
        output,
        &ClassLabels::default(),
    )?;
    step_done(&format!("{} rows in {:?}", n_rows, start.elapsed()));

    println!();
    println!("  {:<12} {}", muted("Model"), fitted.name);
    println!("  {:<12} {}", muted("Output"), out_path.display());
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &PathBuf) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::load_csv(data_path)?;
    let summary = DatasetSummary::describe(&df, None)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), summary.n_rows);
    println!("  {:<12} {}", muted("Columns"), summary.n_cols);
    if let Some(target) = &summary.target_column {
        let dist: Vec<String> = summary
            .class_counts
            .iter()
            .map(|(class, count)| format!("{}: {}", class, count))
            .collect();
        println!("  {:<12} {} ({})", muted("Target"), target, dist.join("  "));
    }
    println!();

    println!("  {:<24} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(54)));

    for col in &summary.columns {
        println!(
            "  {:<24} {:<12} {:>6} {:>8}",
            col.name,
            col.dtype.truecolor(140, 140, 140),
            col.null_count,
            col.n_unique
        );
    }

    println!();
    Ok(())
}

// ─── Interactive mode ──────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("       {}", "parkinson-detect".truecolor(120, 170, 255).bold());
    println!("       {}", dim(&format!("voice-based screening  ·  v{}", env!("CARGO_PKG_VERSION"))));
    println!();
}

fn interactive_csv_prediction(theme: &dialoguer::theme::ColorfulTheme) -> anyhow::Result<()> {
    use dialoguer::Input;

    let models_dir: String = Input::with_theme(theme)
        .with_prompt("Artifacts directory")
        .default("models".to_string())
        .interact_text()?;
    let data_path: String = Input::with_theme(theme)
        .with_prompt("CSV file to predict")
        .interact_text()?;

    cmd_predict(&PathBuf::from(models_dir), &PathBuf::from(data_path), None)
}

fn interactive_manual_entry(theme: &dialoguer::theme::ColorfulTheme) -> anyhow::Result<()> {
    use dialoguer::Input;

    let models_dir: String = Input::with_theme(theme)
        .with_prompt("Artifacts directory")
        .default("models".to_string())
        .interact_text()?;
    let models_dir = PathBuf::from(models_dir);

    let model_path = find_model_file(&models_dir)?;
    let fitted = load_model(&model_path)?;
    let (scaler, feature_names) = load_preprocessing_params(&models_dir)?;

    section("Measurements");
    let mut record = BTreeMap::new();
    for name in &feature_names {
        // Input<f64> re-prompts until the value parses
        let value: f64 = Input::with_theme(theme).with_prompt(name.as_str()).interact_text()?;
        record.insert(name.clone(), value);
    }

    let result = predict_single_patient(
        &fitted,
        &record,
        scaler.as_ref(),
        &feature_names,
        &ClassLabels::default(),
    )?;

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", result.label.white().bold()));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Model       ", &fitted.name));
    line_box(&kv("Class       ", &result.class.to_string()));
    match (result.probability_healthy, result.probability_parkinson) {
        (Some(healthy), Some(parkinson)) => {
            line_box(&kv("P(Healthy)  ", &format!("{:.4}", healthy)));
            line_box(&kv("P(Parkinson)", &format!("{:.4}", parkinson)));
        }
        _ => {
            line_box(&kv("Probability ", "not available for this model"));
        }
    }
    line_box_empty();
    line_box_bottom();
    println!();

    Ok(())
}

pub fn cmd_interactive() -> anyhow::Result<()> {
    use dialoguer::{theme::ColorfulTheme, Select};

    print_banner();

    let theme = ColorfulTheme {
        active_item_prefix: dialoguer::console::style("  ›".to_string()).for_stderr().cyan(),
        active_item_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        inactive_item_prefix: dialoguer::console::style("   ".to_string()).for_stderr(),
        inactive_item_style: dialoguer::console::Style::new().for_stderr().color256(245),
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    };

    loop {
        let items = &[
            "Predict from file     batch predictions for a CSV",
            "Enter measurements    single prediction, typed by hand",
            "Exit",
        ];

        println!();
        let sel = Select::with_theme(&theme)
            .with_prompt("What would you like to do")
            .items(items)
            .default(0)
            .interact_opt()?;

        match sel {
            Some(0) => {
                // Bad paths or artifacts are reported, not fatal
                if let Err(e) = interactive_csv_prediction(&theme) {
                    println!();
                    println!("  {}", format!("{}", e).red());
                }
                wait_enter();
            }
            Some(1) => {
                if let Err(e) = interactive_manual_entry(&theme) {
                    println!();
                    println!("  {}", format!("{}", e).red());
                }
                wait_enter();
            }
            Some(2) | None => {
                println!();
                println!("  {}", dim("goodbye"));
                println!();
                break;
            }
            _ => {}
        }
    }

    Ok(())
}
