//! CLI entry point for the EPC preprocessing pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use epc_processing::{
    DropReason, Estimator, FittedPreprocessor, FittedTransform, Preprocessor, PreprocessorConfig,
    RareThreshold,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "EPC record cleaning, feature selection and imputation",
    long_about = "Fits a preprocessing state on a training CSV of EPC records and \
                  replays it on new data.\n\n\
                  EXAMPLES:\n  \
                  # Fit with default settings\n  \
                  epc-processing fit -i train.csv -s state.json\n\n  \
                  # Fit without free-text columns, collapsing categories under 1%\n  \
                  epc-processing fit -i train.csv -s state.json --no-text --rare-threshold 0.01\n\n  \
                  # Transform new records with a saved state\n  \
                  epc-processing transform -i new.csv -s state.json -o features.csv"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Only log warnings and errors, and skip the summary
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a preprocessing state on a training CSV
    Fit(FitArgs),
    /// Transform a CSV with a previously fitted state
    Transform(TransformArgs),
}

#[derive(Args, Debug)]
struct FitArgs {
    /// Training CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the fitted state (JSON)
    #[arg(short, long)]
    state: PathBuf,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Missing fraction above which a column is dropped, in (0, 1]
    #[arg(long)]
    missing_threshold: Option<f64>,

    /// Rare-category threshold: an integer count or a frequency in (0, 1)
    #[arg(long, value_parser = parse_rare_threshold)]
    rare_threshold: Option<RareThreshold>,

    /// Exclude the free-text description columns
    #[arg(long)]
    no_text: bool,

    /// Disable rare-category reduction
    #[arg(long)]
    no_rare: bool,
}

#[derive(Args, Debug)]
struct TransformArgs {
    /// CSV file to transform
    #[arg(short, long)]
    input: PathBuf,

    /// Fitted state written by `fit`
    #[arg(short, long)]
    state: PathBuf,

    /// Output CSV file
    #[arg(short, long)]
    output: PathBuf,
}

fn parse_rare_threshold(raw: &str) -> std::result::Result<RareThreshold, String> {
    RareThreshold::parse(raw).map_err(|e| e.to_string())
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.quiet);

    match cli.command {
        Command::Fit(args) => run_fit(&args, cli.quiet),
        Command::Transform(args) => run_transform(&args),
    }
}

/// Merge the optional config file with command-line overrides.
fn build_config(args: &FitArgs) -> Result<PreprocessorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str::<PreprocessorConfig>(&json)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => PreprocessorConfig::default(),
    };

    if let Some(threshold) = args.missing_threshold {
        config.feature.missing_threshold = threshold;
    }
    if let Some(threshold) = args.rare_threshold {
        config.rare.threshold = threshold;
    }
    if args.no_text {
        config.feature.include_text = false;
    }
    if args.no_rare {
        config.rare.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

fn run_fit(args: &FitArgs, quiet: bool) -> Result<()> {
    let config = build_config(args)?;
    let preprocessor = Preprocessor::builder().config(config).build()?;

    info!("Loading training data from: {}", args.input.display());
    let data = load_csv(&args.input)?;
    info!("Training data loaded: {:?}", data.shape());

    let fitted = preprocessor.fit(&data)?;
    fitted.save(&args.state)?;

    if !quiet {
        print_fit_summary(&fitted, &args.state);
    }
    Ok(())
}

fn run_transform(args: &TransformArgs) -> Result<()> {
    let fitted = FittedPreprocessor::load(&args.state)?;
    debug!(
        "State fitted at {} on {} rows",
        fitted.metadata().fitted_at,
        fitted.metadata().n_samples
    );

    info!("Loading data from: {}", args.input.display());
    let data = load_csv(&args.input)?;

    let mut result = fitted.transform(&data)?;
    write_csv(&mut result, &args.output)?;
    info!(
        "Wrote {} rows x {} columns to {}",
        result.height(),
        result.width(),
        args.output.display()
    );
    Ok(())
}

/// Load a CSV, falling back to reading every column as text.
///
/// EPC exports often mix numbers and free text in one column, which breaks
/// schema inference; the components accept numeric text.
fn load_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(anyhow!("Input file not found: {}", path.display()));
    }

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Typed loading failed, retrying as text: {}", e);
        }
    }

    CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("reading {}", path.display()))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Print what the fit kept, dropped and learned.
///
/// Uses `println!` so the summary shows regardless of log level.
fn print_fit_summary(fitted: &FittedPreprocessor, state_path: &Path) {
    println!("\n{}", "=".repeat(60));
    println!("FIT SUMMARY");
    println!("{}", "=".repeat(60));
    println!("  Rows:     {}", fitted.metadata().n_samples);
    println!("  Retained: {} columns", fitted.output_columns().len());

    let dropped = fitted.feature_pipeline().dropped_columns();
    if !dropped.is_empty() {
        println!("\nDROPPED COLUMNS");
        println!("{}", "-".repeat(40));
        for column in dropped {
            match &column.reason {
                DropReason::HighMissing { fraction, .. } => {
                    println!("  {:<32} {:.1}% missing", column.name, fraction * 100.0)
                }
                DropReason::Redundant => println!("  {:<32} redundant", column.name),
            }
        }
    }

    if let Some(rare) = fitted.rare_reducer() {
        println!("\nRARE CATEGORIES (threshold {})", rare.threshold());
        println!("{}", "-".repeat(40));
        for column in rare.columns() {
            println!("  {:<32} {} rare", column, rare.rare_values(column).len());
        }
    }

    if let Some(imputer) = fitted.imputer() {
        println!("\nIMPUTATION MODELS (predictor {})", imputer.predictor());
        println!("{}", "-".repeat(40));
        for model in imputer.models() {
            let d = model.diagnostics();
            println!(
                "  {:<32} n={} R²={:.3} MAE={:.2}",
                model.target(),
                d.n_samples,
                d.r_squared,
                d.mean_absolute_error
            );
        }
    }

    println!("\nState written to {}", state_path.display());
    println!("{}", "=".repeat(60));
}
