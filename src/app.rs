//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real entry point:
//! - loads `.env` and parses CLI arguments
//! - installs the logger
//! - runs the requested analysis and prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, DriftArgs, FitArgs, GofArgs, GuessArgs, MonteCarloArgs, ProfileArgs, SimulateArgs};
use crate::data::{SynthConfig, synthesize};
use crate::domain::ProfileConfig;
use crate::error::AppError;
use crate::fit::{
    CalibrationDrift, Hypothesis, MonteCarloConfig, arange, best_estimate, chi2_probability_study, drift_estimates,
    fit_and_report_against, profile, scan_initial_guesses,
};
use crate::io::CountsFile;
use crate::models::{ParametricModel, evaluate};
use crate::report::{largest_pulls, residual_rows};

use self::pipeline::{context, fit_view, load_dataset, noise_from, optimizer_from, param_index, reporter_from};

pub mod pipeline;

/// Entry point for the `fitscan` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    crate::logger::setup_log(&cli.log_level)?;

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Profile(args) => handle_profile(args),
        Command::Guesses(args) => handle_guesses(args),
        Command::Gof(args) => handle_gof(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Drift(args) => handle_drift(args),
        Command::MonteCarlo(args) => handle_montecarlo(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let dataset = load_dataset(&args.data)?;
    let fit_data = fit_view(&args.data, &dataset);
    let (optimizer, limits) = optimizer_from(&args.solver);
    let reporter = reporter_from(&args.thresholds)?;

    // Judged against the real error bars even when the fit ignored them.
    let report = fit_and_report_against(
        &args.model,
        &fit_data,
        &dataset,
        &args.guess,
        &optimizer,
        &limits,
        &reporter,
    )
    .map_err(context("Fit failed"))?;
    println!(
        "{}",
        crate::report::format_fit_summary(&report, args.model.display_name(), dataset.len())
    );

    if args.top > 0 {
        let predicted = evaluate(&args.model, report.fit.params(), dataset.x()).map_err(context("Fit failed"))?;
        let rows = residual_rows(&dataset, &predicted).map_err(context("Fit failed"))?;
        println!("{}", crate::report::format_outliers(&largest_pulls(&rows, args.top)));
    }

    if args.plot.plot {
        let plot = crate::plot::render_fit_plot(
            &dataset,
            &args.model,
            report.fit.params(),
            args.plot.width,
            args.plot.height,
        )
        .map_err(context("Plot failed"))?;
        println!("{plot}");
    }
    Ok(())
}

fn handle_profile(args: ProfileArgs) -> Result<(), AppError> {
    let dataset = fit_view(&args.data, &load_dataset(&args.data)?);
    let index = param_index(&args.model, &args.param)?;
    let values = arange(args.from, args.to, args.step).map_err(context("Bad scan range"))?;
    let (optimizer, limits) = optimizer_from(&args.solver);
    let config = ProfileConfig {
        parallel: args.parallel,
        limits,
        ..ProfileConfig::new(args.start)
    };

    let scan = profile(&args.model, &dataset, index, &values, &args.guess, &optimizer, &config)
        .map_err(context("Profile scan failed"))?;
    println!("{}", crate::report::format_profile_summary(&scan, args.min_rise));

    if args.plot.plot {
        println!(
            "{}",
            crate::plot::render_profile_plot(&scan, args.plot.width, args.plot.height)
        );
    }

    if let Some(path) = &args.export_csv {
        crate::io::write_profile_csv_file(path, &scan, &args.model.parameter_names())?;
    }
    if let Some(path) = &args.export_json {
        crate::io::write_profile_json_file(path, &scan)?;
    }
    Ok(())
}

fn handle_guesses(args: GuessArgs) -> Result<(), AppError> {
    let dataset = fit_view(&args.data, &load_dataset(&args.data)?);
    let index = param_index(&args.model, &args.param)?;
    let guesses = arange(args.from, args.to, args.step).map_err(context("Bad guess range"))?;
    let (optimizer, limits) = optimizer_from(&args.solver);

    let scan = scan_initial_guesses(&args.model, &dataset, index, &guesses, &args.guess, &optimizer, &limits)
        .map_err(context("Initial-guess scan failed"))?;
    println!("{}", crate::report::format_guess_scan(&scan));
    Ok(())
}

fn handle_gof(args: GofArgs) -> Result<(), AppError> {
    let reporter = reporter_from(&args.thresholds)?;
    let gof = reporter
        .evaluate(args.chi2, args.dof)
        .map_err(context("Goodness of fit failed"))?;
    print!("chi2={:.4} dof={}\n{}", gof.chi2, gof.dof, crate::report::format_gof(&gof));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let xs = arange(args.x_start, args.x_stop, args.x_step).map_err(context("Bad x grid"))?;
    let config = SynthConfig {
        seed: args.seed,
        noise: noise_from(args.noise, args.noise_sigma),
    };
    let dataset = synthesize(&args.model, &args.params, &xs, &config).map_err(context("Simulation failed"))?;

    if let Some(path) = &args.output {
        let counts = CountsFile {
            exp_y_values: dataset.y().to_vec(),
            x_values: Some(dataset.x().to_vec()),
        };
        crate::io::write_counts_file(path, &counts)?;
        println!("Wrote {} points to {}", dataset.len(), path.display());
    }
    if let Some(path) = &args.output_csv {
        crate::io::write_dataset_file(path, &dataset)?;
        println!("Wrote {} points to {}", dataset.len(), path.display());
    }
    Ok(())
}

fn handle_drift(args: DriftArgs) -> Result<(), AppError> {
    let drift = CalibrationDrift {
        c0: args.c0,
        c1: args.c1,
        lead_steps: args.lead_steps,
        trail_steps: args.trail_steps,
        reading_error: args.reading_error,
    };
    let estimates = drift_estimates(&args.readings, &drift).map_err(context("Drift estimate failed"))?;
    println!(
        "{}",
        crate::report::format_drift(&estimates, best_estimate(&estimates))
    );
    Ok(())
}

fn handle_montecarlo(args: MonteCarloArgs) -> Result<(), AppError> {
    let xs = arange(args.x_start, args.x_stop, args.x_step).map_err(context("Bad x grid"))?;
    let config = MonteCarloConfig {
        trials: args.trials,
        seed: args.seed,
        noise: crate::data::Noise::Poisson,
    };
    let truth = Hypothesis {
        model: &args.model,
        params: &args.truth,
    };
    let alternative = Hypothesis {
        model: &args.model,
        params: &args.alternative,
    };
    let study = chi2_probability_study(truth, alternative, &xs, &config).map_err(context("Monte Carlo failed"))?;
    println!("{}", crate::report::format_montecarlo(&study, args.bins));
    Ok(())
}
