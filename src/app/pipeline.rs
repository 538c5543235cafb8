//! Shared plumbing between the subcommands: loading the dataset and turning
//! CLI flags into library configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::cli::{DataArgs, NoiseArg, SolverArgs, ThresholdArgs};
use crate::data::{Noise, log10_transform, unweighted};
use crate::domain::{Dataset, GofThresholds, SolveLimits};
use crate::error::{AppError, FitError};
use crate::fit::{GoodnessOfFitReporter, SimplexConfig, SimplexOptimizer, TracingObserver, arange};
use crate::models::ParametricModel;

/// Attach `what` to a library error, keeping its exit code.
pub fn context(what: &'static str) -> impl FnOnce(FitError) -> AppError {
    move |e| AppError::new(e.exit_code(), format!("{what}: {e}"))
}

/// Load the observations selected by `args`, with `--log10` applied.
///
/// The result keeps its real uncertainties; `--unweighted` only changes what
/// the optimizer sees (see [`fit_view`]).
pub fn load_dataset(args: &DataArgs) -> Result<Dataset, AppError> {
    let dataset = match (&args.counts, &args.csv) {
        (Some(path), _) => {
            let counts = crate::io::read_counts_file(path)?;
            let grid = x_grid(args)?;
            counts
                .to_dataset(grid.as_deref(), args.sigma_floor)
                .map_err(|e| AppError::new(e.exit_code(), format!("Counts JSON '{}': {e}", path.display())))?
        }
        (None, Some(path)) => crate::io::read_dataset_file(path)?,
        (None, None) => return Err(AppError::new(2, "Either --counts or --csv is required.")),
    };
    tracing::info!(points = dataset.len(), "dataset loaded");

    if args.log10 {
        return log10_transform(&dataset).map_err(context("Cannot fit log10 of the data"));
    }
    Ok(dataset)
}

/// The dataset the optimizer minimizes: unit errors with `--unweighted`.
pub fn fit_view(args: &DataArgs, dataset: &Dataset) -> Dataset {
    if args.unweighted {
        tracing::info!("fitting without error bars");
        unweighted(dataset)
    } else {
        dataset.clone()
    }
}

/// The `--x-start/--x-stop/--x-step` grid, if all three were given.
fn x_grid(args: &DataArgs) -> Result<Option<Vec<f64>>, AppError> {
    match (args.x_start, args.x_stop, args.x_step) {
        (Some(start), Some(stop), Some(step)) => arange(start, stop, step).map(Some).map_err(context("Bad x grid")),
        (None, None, None) => Ok(None),
        _ => Err(AppError::new(2, "--x-start, --x-stop and --x-step must be given together.")),
    }
}

/// Nelder-Mead optimizer and per-fit limits from the solver flags.
pub fn optimizer_from(args: &SolverArgs) -> (SimplexOptimizer, SolveLimits) {
    let config = SimplexConfig {
        max_iters: args.max_iters,
        sd_tolerance: args.sd_tolerance,
        ..SimplexConfig::default()
    };
    let mut optimizer = SimplexOptimizer::new(config);
    if args.trace_iterations {
        optimizer = optimizer.with_observer(Arc::new(TracingObserver));
    }
    let limits = SolveLimits {
        max_iters: Some(args.max_iters),
        timeout: args.timeout_ms.map(Duration::from_millis),
    };
    (optimizer, limits)
}

pub fn reporter_from(args: &ThresholdArgs) -> Result<GoodnessOfFitReporter, AppError> {
    GoodnessOfFitReporter::new(GofThresholds {
        suspiciously_good: args.suspiciously_good,
        poor: args.poor,
    })
    .map_err(context("Bad goodness-of-fit thresholds"))
}

pub fn noise_from(noise: NoiseArg, sigma: f64) -> Noise {
    match noise {
        NoiseArg::Exact => Noise::Exact,
        NoiseArg::Poisson => Noise::Poisson,
        NoiseArg::Gaussian => Noise::Gaussian { sigma },
    }
}

/// Index of the parameter called `name`.
pub fn param_index(model: &dyn ParametricModel, name: &str) -> Result<usize, AppError> {
    model.parameter_index(name).ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "Unknown parameter '{name}'; the model has [{}].",
                model.parameter_names().join(", ")
            ),
        )
    })
}
