//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation, and
//! output changes are localized.

use crate::domain::{GoodnessOfFit, ProfileScan};
use crate::fit::{DriftEstimate, FitReport, GuessScan, MonteCarloStudy, probability_histogram};
use crate::report::ResidualRow;

/// Fitted parameters, their errors and the fit diagnostics.
pub fn format_fit_summary(report: &FitReport, model_name: &str, n_points: usize) -> String {
    let mut out = String::new();

    out.push_str("=== fitscan - fit ===\n");
    out.push_str(&format!("Model: {model_name}\n"));
    out.push_str(&format!(
        "Points: n={} | params={} | iterations={}\n",
        n_points,
        report.names.len(),
        report.fit.iterations()
    ));

    out.push_str("\nParameters:\n");
    let errors = report.fit.standard_errors();
    for (i, (name, value)) in report.names.iter().zip(report.fit.params()).enumerate() {
        match errors.as_ref().and_then(|e| e.get(i)) {
            Some(err) => out.push_str(&format!("  {:<12} {value:>14.6} +/- {err:.6}\n", truncate(name, 12))),
            None => out.push_str(&format!("  {:<12} {value:>14.6}\n", truncate(name, 12))),
        }
    }
    if report.fit.is_covariance_singular() {
        out.push_str("  (covariance singular: parameter errors not available)\n");
    }

    out.push_str(&format!("\nchi2={:.4} dof={}\n", report.fit.chi2(), report.dof));
    match &report.goodness {
        Some(g) => out.push_str(&format_gof(g)),
        None => out.push_str("goodness of fit: n/a (dof < 1)\n"),
    }
    if let Some(s) = &report.pull_summary {
        out.push_str(&format!("pulls: n={} mean={:.4} stdev={:.4}\n", s.n, s.mean, s.stdev));
    }

    out
}

/// One-line goodness-of-fit summary.
pub fn format_gof(g: &GoodnessOfFit) -> String {
    format!(
        "chi2/dof={:.4} P(chi2)={:.6} verdict: {}\n",
        g.reduced_chi2(),
        g.probability,
        g.verdict.describe()
    )
}

/// Best point, local minima and failures of a profile scan.
pub fn format_profile_summary(scan: &ProfileScan, min_rise: f64) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== fitscan - profile of {} ===\n", scan.scan_name()));
    out.push_str(&format!(
        "Points: n={} | failed={} | dof={}\n",
        scan.len(),
        scan.failure_count(),
        scan.dof()
    ));

    match scan.best() {
        Some(best) => {
            out.push_str(&format!(
                "Best: {}={:.4} chi2={:.4}\n",
                scan.scan_name(),
                best.fixed_value(),
                best.chi2()
            ));
            if let Some(params) = best.parameters() {
                out.push_str(&format!("- params: {}\n", fmt_vec(params)));
            }
        }
        None => out.push_str("Best: none (no point converged)\n"),
    }

    let minima = scan.local_minima(min_rise);
    if minima.len() > 1 {
        out.push_str(&format!("\nLocal minima (rise >= {min_rise}):\n"));
        for p in minima {
            out.push_str(&format!("  {}={:>12.4} chi2={:.4}\n", scan.scan_name(), p.fixed_value(), p.chi2()));
        }
    }

    if scan.failure_count() > 0 {
        out.push_str("\nFailed points:\n");
        for p in scan.failures() {
            let detail = p.failure().map(|f| f.to_string()).unwrap_or_default();
            out.push_str(&format!("  {}={:>12.4} {}\n", scan.scan_name(), p.fixed_value(), truncate(&detail, 72)));
        }
    }

    out
}

/// Start value, end value and chi-square for each initial guess.
pub fn format_guess_scan(scan: &GuessScan) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== fitscan - initial guesses for {} ===\n", scan.param_name));

    out.push_str(
        format!("{:>12} {:>14} {:>14} {:<10}\n", "start", "final", "chi2", "status").trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<14} {:-<14} {:-<10}\n", "", "", "", "").trim_end());
    out.push('\n');

    for p in &scan.points {
        let line = match p.final_value(scan.param_index) {
            Some(v) => format!(
                "{:>12.4} {:>14.6} {:>14.4} {:<10}\n",
                p.start_value,
                v,
                p.chi2(),
                "converged"
            ),
            None => format!("{:>12.4} {:>14} {:>14} {:<10}\n", p.start_value, "-", "-", "failed"),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if let Some(best) = scan.best() {
        out.push_str(&format!(
            "Best start: {:.4} (chi2={:.4}) | failed={}\n",
            best.start_value,
            best.chi2(),
            scan.failure_count()
        ));
    }
    out
}

/// Per-prefix drift estimates with the best one marked.
pub fn format_drift(estimates: &[DriftEstimate], best: Option<&DriftEstimate>) -> String {
    let mut out = String::new();
    out.push_str("=== fitscan - calibration drift ===\n");
    out.push_str(
        format!(
            "  {:>4} {:>14} {:>12} {:>12} {:>12}\n",
            "n", "value", "stat", "syst", "total"
        )
        .trim_end(),
    );
    out.push('\n');

    for e in estimates {
        let chosen = if best.is_some_and(|b| b.n == e.n) { "*" } else { " " };
        out.push_str(&format!(
            "{chosen} {:>4} {:>14.5} {:>12.5} {:>12.5} {:>12.5}\n",
            e.n, e.value, e.statistical, e.systematic, e.total
        ));
    }
    if let Some(b) = best {
        out.push_str(&format!(
            "\nBest: first {} readings -> {:.5} +/- {:.5}\n",
            b.n, b.value, b.total
        ));
    }
    out
}

/// Means and side-by-side histograms of `P(chi2)`.
pub fn format_montecarlo(study: &MonteCarloStudy, bins: usize) -> String {
    let mut out = String::new();
    out.push_str("=== fitscan - P(chi2) Monte Carlo ===\n");
    out.push_str(&format!(
        "Trials: {} | dof={}\n",
        study.truth.len(),
        study.dof
    ));
    out.push_str(&format!("mean P(chi2): truth={:.4} alternative={:.4}\n\n", study.truth_mean(), study.alternative_mean()));

    let truth = probability_histogram(&study.truth, bins);
    let alt = probability_histogram(&study.alternative, bins);
    let scale = truth.iter().chain(&alt).copied().max().unwrap_or(0).max(1);
    const BAR: usize = 30;

    out.push_str(format!("{:<11} {:<width$} {}\n", "P range", "truth", "alternative", width = BAR + 7).trim_end());
    out.push('\n');
    for (i, (t, a)) in truth.iter().zip(&alt).enumerate() {
        let lo = i as f64 / bins as f64;
        let hi = (i + 1) as f64 / bins as f64;
        let t_bar = "#".repeat(t * BAR / scale);
        let a_bar = "#".repeat(a * BAR / scale);
        out.push_str(
            format!(
                "[{lo:.2},{hi:.2}) {t:>5} {t_bar:<BAR$} {a:>5} {a_bar}\n"
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Table of the points with the largest pulls.
pub fn format_outliers(rows: &[ResidualRow]) -> String {
    let mut out = String::new();
    out.push_str("Largest pulls:\n");
    out.push_str(
        format!(
            "{:>6} {:>12} {:>12} {:>12} {:>10}\n",
            "index", "x", "y", "y_fit", "pull"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<12} {:-<12} {:-<12} {:-<10}\n", "", "", "", "", "").trim_end());
    out.push('\n');
    for r in rows {
        out.push_str(
            format!(
                "{:>6} {:>12.4} {:>12.4} {:>12.4} {:>10.3}\n",
                r.index, r.x, r.y, r.y_fit, r.pull
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

pub(crate) fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitResult, FitVerdict, ProfilePoint};
    use crate::error::OptimizerFailure;
    use crate::fit::PullSummary;

    fn report(covariance: bool) -> FitReport {
        let cov = covariance.then(|| nalgebra::DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]));
        FitReport {
            names: vec!["x0".to_string(), "norm".to_string()],
            fit: FitResult::new(vec![60.0, 4.5], cov, 36.0, 42),
            pulls: vec![0.5, -0.5],
            pull_summary: PullSummary::from_pulls(&[0.5, -0.5]),
            dof: 38,
            goodness: Some(GoodnessOfFit {
                chi2: 36.0,
                dof: 38,
                probability: 0.44,
                verdict: FitVerdict::Plausible,
            }),
        }
    }

    #[test]
    fn fit_summary_shows_errors() {
        let txt = format_fit_summary(&report(true), "narrow peak", 40);
        assert!(txt.contains("Model: narrow peak"));
        assert!(txt.contains("x0                60.000000 +/- 0.200000"));
        assert!(txt.contains("norm               4.500000 +/- 0.100000"));
        assert!(txt.contains("verdict: plausible"));
        assert!(!txt.contains("covariance singular"));
    }

    #[test]
    fn fit_summary_flags_singular_covariance() {
        let txt = format_fit_summary(&report(false), "narrow peak", 40);
        assert!(txt.contains("covariance singular"));
        assert!(!txt.contains("+/-"));
    }

    #[test]
    fn profile_summary_lists_failures() {
        let mut scan = ProfileScan::new(0, "x0".to_string(), 38, 3);
        scan.push(ProfilePoint::converged(1.0, 50.0, vec![1.0, 2.0]));
        scan.push(ProfilePoint::converged(2.0, 40.0, vec![2.0, 2.5]));
        scan.push(ProfilePoint::failed(3.0, OptimizerFailure::Evaluation("nan".to_string())));

        let txt = format_profile_summary(&scan, 1.0);
        assert!(txt.contains("Points: n=3 | failed=1 | dof=38"));
        assert!(txt.contains("Best: x0=2.0000 chi2=40.0000"));
        assert!(txt.contains("model evaluation failed: nan"));
    }

    #[test]
    fn histogram_rows_match_bins() {
        let study = MonteCarloStudy {
            dof: 5,
            truth: vec![0.1, 0.6, 0.9],
            alternative: vec![0.95, 0.99, 0.97],
        };
        let txt = format_montecarlo(&study, 4);
        assert_eq!(txt.lines().filter(|l| l.starts_with('[')).count(), 4);
        assert!(txt.contains("[0.75,1.00)     1"));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("lifetime", 12), "lifetime");
        assert_eq!(truncate("a_very_long_name", 6), "a_ver.");
    }
}
