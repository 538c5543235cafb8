//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output:
//! - observed points / profile points: `o`
//! - model curve: `-`
//! - best profile point: `*`
//! - failed profile points: `x` on the bottom row

use crate::domain::{Dataset, ProfileScan};
use crate::error::Result;
use crate::models::{ParametricModel, evaluate};

/// Data points with the model curve drawn through them.
pub fn render_fit_plot(
    dataset: &Dataset,
    model: &dyn ParametricModel,
    params: &[f64],
    width: usize,
    height: usize,
) -> Result<String> {
    let width = width.max(10);
    let (x_min, x_max) = pad_if_flat(dataset.x_range());
    let xs: Vec<f64> = (0..width)
        .map(|i| x_min + (x_max - x_min) * i as f64 / (width as f64 - 1.0))
        .collect();
    let ys = evaluate(model, params, &xs)?;
    let curve: Vec<(f64, f64)> = xs.into_iter().zip(ys).collect();

    let marks: Vec<(f64, f64, char)> = dataset
        .x()
        .iter()
        .zip(dataset.y())
        .map(|(&x, &y)| (x, y, 'o'))
        .collect();

    Ok(render_plot(&marks, Some(&curve), (x_min, x_max), width, height, "x", "y"))
}

/// Chi-square against the scanned value.
pub fn render_profile_plot(scan: &ProfileScan, width: usize, height: usize) -> String {
    let fixed: Vec<f64> = scan.points().iter().map(|p| p.fixed_value()).collect();
    let x_range = pad_if_flat(min_max(fixed.iter().copied()).unwrap_or((0.0, 1.0)));

    let best = scan.best().map(|b| b.fixed_value());
    let converged: Vec<(f64, f64, char)> = scan
        .points()
        .iter()
        .filter(|p| p.is_converged() && p.chi2().is_finite())
        .map(|p| {
            let ch = if Some(p.fixed_value()) == best { '*' } else { 'o' };
            (p.fixed_value(), p.chi2(), ch)
        })
        .collect();

    let mut out = render_plot(&converged, None, x_range, width, height, scan.scan_name(), "chi2");

    if scan.failure_count() > 0 {
        let width = width.max(10);
        let mut row = vec![' '; width];
        for p in scan.failures() {
            row[map_x(p.fixed_value(), x_range.0, x_range.1, width)] = 'x';
        }
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn render_plot(
    marks: &[(f64, f64, char)],
    curve: Option<&[(f64, f64)]>,
    (x_min, x_max): (f64, f64),
    width: usize,
    height: usize,
    x_label: &str,
    y_label: &str,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let ys = marks
        .iter()
        .map(|m| m.1)
        .chain(curve.into_iter().flatten().map(|c| c.1));
    let (y_min, y_max) = min_max(ys).map(pad_if_flat).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = curve {
        draw_curve(&mut grid, curve, (x_min, x_max), (y_min, y_max));
    }
    for &(x, y, ch) in marks {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = ch;
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {x_label}=[{x_min:.3}, {x_max:.3}] | {y_label}=[{y_min:.2}, {y_max:.2}]\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    out
}

fn min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    (lo <= hi).then_some((lo, hi))
}

fn pad_if_flat((min, max): (f64, f64)) -> (f64, f64) {
    if max > min { (min, max) } else { (min - 0.5, max + 0.5) }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // max is row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], (x_min, x_max): (f64, f64), (y_min, y_max): (f64, f64)) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve.iter().filter(|c| c.1.is_finite()) {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        match prev {
            Some((c0, r0)) => draw_line(grid, (c0, r0), (col, row), '-'),
            None => grid[row][col] = '-',
        }
        prev = Some((col, row));
    }
}

/// Bresenham line, only writing blank cells.
fn draw_line(grid: &mut [Vec<char>], (x0, y0): (usize, usize), (x1, y1): (usize, usize), ch: char) {
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
            .filter(|c| **c == ' ')
        {
            *cell = ch;
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProfilePoint;
    use crate::error::OptimizerFailure;
    use crate::models::ModelKind;

    #[test]
    fn fit_plot_golden_snapshot_small() {
        let ds = Dataset::with_constant_error(vec![0.0, 9.0], vec![0.0, 9.0], 1.0).unwrap();
        let txt = render_fit_plot(&ds, &ModelKind::Line, &[0.0, 1.0], 10, 5).unwrap();
        let expected = concat!(
            "Plot: x=[0.000, 9.000] | y=[-0.45, 9.45]\n",
            "         o\n",
            "      ---\n",
            "    --\n",
            " ---\n",
            "o\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn profile_plot_marks_best_and_failures() {
        let mut scan = ProfileScan::new(0, "x0".to_string(), 10, 4);
        scan.push(ProfilePoint::converged(0.0, 20.0, vec![0.0, 1.0]));
        scan.push(ProfilePoint::converged(1.0, 10.0, vec![1.0, 1.0]));
        scan.push(ProfilePoint::failed(2.0, OptimizerFailure::Solver("x".to_string())));
        scan.push(ProfilePoint::converged(3.0, 20.0, vec![3.0, 1.0]));

        let txt = render_profile_plot(&scan, 10, 5);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with("Plot: x0=[0.000, 3.000] | chi2="));
        assert_eq!(lines[1], "o        o");
        assert_eq!(lines[5], "   *");
        assert_eq!(lines[6], "      x");
    }
}
