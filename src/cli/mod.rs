//! Command-line parsing for `fitscan`.
//!
//! Argument parsing and command dispatch stay separate from the fitting code:
//! everything here is plain clap structs, turned into library config values in
//! `app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::data::COUNT_SIGMA_FLOOR;
use crate::domain::StartStrategy;
use crate::models::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "fitscan",
    version,
    about = "Profile scans and goodness-of-fit checks for nonlinear curve fits"
)]
pub struct Cli {
    /// Log filter directive (e.g. `info`, `debug`, `fitscan::fit::profile=trace`).
    #[arg(long, global = true, env = "FITSCAN_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a model, print parameters with errors, chi2 and the goodness-of-fit verdict.
    Fit(FitArgs),
    /// Profile chi-square scan: fix one parameter on a grid and refit the rest.
    Profile(ProfileArgs),
    /// Fit once per starting value of one parameter and show where each start ends up.
    Guesses(GuessArgs),
    /// Evaluate P(chi2) and the verdict for a chi2/dof pair.
    Gof(GofArgs),
    /// Generate a synthetic dataset from a built-in model.
    Simulate(SimulateArgs),
    /// Estimate a drifting calibration from a sequence of readings.
    Drift(DriftArgs),
    /// Monte Carlo distribution of P(chi2) for a true and an alternative hypothesis.
    MonteCarlo(MonteCarloArgs),
}

/// Where the observations come from.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Counts JSON (`{"exp_y_values": [...], "x_values": [...]}`); errors are sqrt(counts).
    #[arg(long, value_name = "JSON", conflicts_with = "csv", required_unless_present = "csv")]
    pub counts: Option<PathBuf>,

    /// Dataset CSV with header `x,y,sigma`.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// First x value when the counts file carries no `x_values`.
    #[arg(long, allow_hyphen_values = true)]
    pub x_start: Option<f64>,

    /// End of the x grid (exclusive).
    #[arg(long, allow_hyphen_values = true)]
    pub x_stop: Option<f64>,

    /// Spacing of the x grid.
    #[arg(long)]
    pub x_step: Option<f64>,

    /// Smallest counting error, used for bins with few or zero counts.
    #[arg(long, default_value_t = COUNT_SIGMA_FLOOR)]
    pub sigma_floor: f64,

    /// Fit log10(y) instead of y, propagating the errors.
    #[arg(long)]
    pub log10: bool,

    /// Fit ignoring the error bars (all sigma = 1). `fit` still reports chi2
    /// and pulls with the real errors; scans minimize the unit-error chi2.
    #[arg(long)]
    pub unweighted: bool,
}

/// Optimizer limits and tuning.
#[derive(Debug, Args, Clone)]
pub struct SolverArgs {
    /// Iteration cap per fit.
    #[arg(long, default_value_t = 2000)]
    pub max_iters: u64,

    /// Wall-clock limit per fit, in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Convergence tolerance on the spread of simplex costs.
    #[arg(long, default_value_t = 1e-10)]
    pub sd_tolerance: f64,

    /// Emit a trace event per solver iteration (visible with `--log-level trace`).
    #[arg(long)]
    pub trace_iterations: bool,
}

/// Goodness-of-fit verdict thresholds on P(chi2).
#[derive(Debug, Args, Clone, Copy)]
pub struct ThresholdArgs {
    /// P(chi2) below this is "suspiciously good" (chi2 too small).
    #[arg(long, default_value_t = 0.01)]
    pub suspiciously_good: f64,

    /// P(chi2) above this is "poor" (chi2 too large).
    #[arg(long, default_value_t = 0.99)]
    pub poor: f64,
}

/// Terminal plot options.
#[derive(Debug, Args, Clone, Copy)]
pub struct PlotArgs {
    /// Render an ASCII plot.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Model to fit.
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Initial guess, one value per model parameter.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub guess: Vec<f64>,

    #[command(flatten)]
    pub solver: SolverArgs,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Show the N points with the largest pulls.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Model to fit.
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Name of the parameter to scan.
    #[arg(long)]
    pub param: String,

    /// First scan value.
    #[arg(long, allow_hyphen_values = true)]
    pub from: f64,

    /// End of the scan (exclusive).
    #[arg(long, allow_hyphen_values = true)]
    pub to: f64,

    /// Scan spacing.
    #[arg(long)]
    pub step: f64,

    /// Initial guess for the remaining free parameters, in model order.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub guess: Vec<f64>,

    /// Where each refit starts.
    #[arg(long, value_enum, default_value_t = StartStrategy::Fixed)]
    pub start: StartStrategy,

    /// Solve scan points in parallel (fixed start only).
    #[arg(long)]
    pub parallel: bool,

    /// Chi-square rise on both sides for a dip to count as a local minimum.
    #[arg(long, default_value_t = 1.0)]
    pub min_rise: f64,

    #[command(flatten)]
    pub solver: SolverArgs,

    /// Write the scan as CSV.
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Write the scan as JSON.
    #[arg(long, value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    #[command(flatten)]
    pub plot: PlotArgs,
}

#[derive(Debug, Args, Clone)]
pub struct GuessArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Name of the parameter whose starting value is varied.
    #[arg(long)]
    pub param: String,

    /// Base guess, one value per model parameter.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub guess: Vec<f64>,

    /// First starting value.
    #[arg(long, allow_hyphen_values = true)]
    pub from: f64,

    /// End of the starting values (exclusive).
    #[arg(long, allow_hyphen_values = true)]
    pub to: f64,

    #[arg(long)]
    pub step: f64,

    #[command(flatten)]
    pub solver: SolverArgs,
}

#[derive(Debug, Args, Clone)]
pub struct GofArgs {
    #[arg(long)]
    pub chi2: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub dof: i64,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

/// Noise applied to synthetic data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NoiseArg {
    Exact,
    Poisson,
    Gaussian,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// True parameter values, one per model parameter.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub params: Vec<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub x_start: f64,

    /// End of the x grid (exclusive).
    #[arg(long, allow_hyphen_values = true)]
    pub x_stop: f64,

    #[arg(long)]
    pub x_step: f64,

    #[arg(long, value_enum, default_value_t = NoiseArg::Poisson)]
    pub noise: NoiseArg,

    /// Standard deviation for `--noise gaussian`.
    #[arg(long, default_value_t = 1.0)]
    pub noise_sigma: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write a counts JSON file (with x values).
    #[arg(long, value_name = "JSON", required_unless_present = "output_csv")]
    pub output: Option<PathBuf>,

    /// Write a dataset CSV (`x,y,sigma`).
    #[arg(long, value_name = "CSV")]
    pub output_csv: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DriftArgs {
    /// Calibrated readings in measurement order.
    #[arg(long, value_delimiter = ',', required = true)]
    pub readings: Vec<f64>,

    /// Calibration constant measured before the readings.
    #[arg(long)]
    pub c0: f64,

    /// Calibration constant measured after the readings.
    #[arg(long)]
    pub c1: f64,

    /// Reading intervals between the first calibration and the first reading.
    #[arg(long, default_value_t = 1)]
    pub lead_steps: u32,

    /// Reading intervals between the last reading and the second calibration.
    #[arg(long, default_value_t = 2)]
    pub trail_steps: u32,

    /// Uncertainty of a single reading.
    #[arg(long)]
    pub reading_error: f64,
}

#[derive(Debug, Args, Clone)]
pub struct MonteCarloArgs {
    #[arg(long, value_enum)]
    pub model: ModelKind,

    /// Parameters the pseudo-data are drawn from.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub truth: Vec<f64>,

    /// Parameters of the competing hypothesis.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub alternative: Vec<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub x_start: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub x_stop: f64,

    #[arg(long)]
    pub x_step: f64,

    #[arg(long, default_value_t = 1000)]
    pub trials: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Histogram bins over [0, 1].
    #[arg(long, default_value_t = 10)]
    pub bins: usize,
}
