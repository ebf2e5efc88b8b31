use colored::Colorize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::analysis::{DensityCurve, Histogram};

/// Character grid that maps data coordinates onto rows and columns.
struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Vec<char>>,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

fn padded_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return None;
    }
    if hi - lo < f64::EPSILON {
        Some((lo - 0.5, hi + 0.5))
    } else {
        Some((lo, hi))
    }
}

impl Canvas {
    fn new(width: usize, height: usize, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        let width = width.max(2);
        let height = height.max(2);
        Self {
            width,
            height,
            cells: vec![vec![' '; width]; height],
            x_range,
            y_range,
        }
    }

    fn column(&self, x: f64) -> Option<usize> {
        let (lo, hi) = self.x_range;
        let t = (x - lo) / (hi - lo);
        (0.0..=1.0)
            .contains(&t)
            .then(|| (t * (self.width - 1) as f64).round() as usize)
    }

    fn row(&self, y: f64) -> Option<usize> {
        let (lo, hi) = self.y_range;
        let t = (y - lo) / (hi - lo);
        (0.0..=1.0)
            .contains(&t)
            .then(|| self.height - 1 - (t * (self.height - 1) as f64).round() as usize)
    }

    fn plot(&mut self, x: f64, y: f64, glyph: char) {
        if let (Some(c), Some(r)) = (self.column(x), self.row(y)) {
            let cell = &mut self.cells[r][c];
            // Overlapping points show as '#'
            *cell = if *cell == ' ' || *cell == '-' || *cell == '.' || *cell == glyph {
                glyph
            } else {
                '#'
            };
        }
    }

    fn horizontal_line(&mut self, y: f64) {
        if let Some(r) = self.row(y) {
            for cell in self.cells[r].iter_mut().filter(|c| **c == ' ') {
                *cell = '-';
            }
        }
    }

    /// Dotted y = x reference line.
    fn diagonal(&mut self) {
        for c in 0..self.width {
            let (lo, hi) = self.x_range;
            let x = lo + (hi - lo) * c as f64 / (self.width - 1) as f64;
            if let Some(r) = self.row(x) {
                if self.cells[r][c] == ' ' {
                    self.cells[r][c] = '.';
                }
            }
        }
    }

    fn render(&self, x_label: &str, y_label: &str) -> String {
        let top = format!("{:.3}", self.y_range.1);
        let bottom = format!("{:.3}", self.y_range.0);
        let margin = top.len().max(bottom.len());

        let mut out = format!("  {y_label}\n");
        for (i, row) in self.cells.iter().enumerate() {
            let label = if i == 0 {
                top.as_str()
            } else if i == self.height - 1 {
                bottom.as_str()
            } else {
                ""
            };
            let line: String = row.iter().collect();
            out.push_str(&format!("  {label:>margin$} |{line}\n"));
        }
        out.push_str(&format!("  {:>margin$} +{}\n", "", "-".repeat(self.width)));
        let left = format!("{:.3}", self.x_range.0);
        let right = format!("{:.3}", self.x_range.1);
        let gap = self.width.saturating_sub(left.len() + right.len());
        out.push_str(&format!(
            "  {:>margin$}  {left}{}{right}\n",
            "",
            " ".repeat(gap)
        ));
        out.push_str(&format!("  {:>margin$}  {x_label:^w$}\n", "", w = self.width));
        out
    }
}

fn heading(title: &str) -> String {
    format!("\n{}\n{}\n", title.bold().green(), "=".repeat(60))
}

/// Format a horizontal-bar histogram as a string.
pub fn format_histogram(title: &str, hist: &Histogram) -> String {
    let mut output = heading(title);

    if hist.bins.is_empty() {
        output.push_str("  No data available.\n");
        return output;
    }

    let max_count = hist.max_count();
    let bar_width = 40;

    output.push_str(&format!("  {:>21}  {:>6}  Distribution\n", "Bin", "Count"));
    output.push_str(&format!("  {}\n", "-".repeat(70)));

    for bin in &hist.bins {
        let bar_len = if max_count > 0 {
            ((bin.count as f64 / max_count as f64) * bar_width as f64).round() as usize
        } else {
            0
        };
        let bar = "\u{2588}".repeat(bar_len);
        output.push_str(&format!(
            "  {:>10.3}-{:<10.3}  {:>6}  {}\n",
            bin.lower,
            bin.upper,
            bin.count,
            bar.green()
        ));
    }

    output.push('\n');
    output
}

pub fn print_histogram(title: &str, hist: &Histogram) {
    print!("{}", format_histogram(title, hist));
}

/// Scatter plot of `y` against `x`; residual plots get a zero reference line.
pub fn format_scatter(
    title: &str,
    x: &[f64],
    y: &[f64],
    labels: (&str, &str),
    size: (usize, usize),
    zero_line: bool,
) -> String {
    let mut output = heading(title);
    let (Some(x_range), Some(y_range)) = (
        padded_range(x.iter().copied()),
        padded_range(y.iter().copied()),
    ) else {
        output.push_str("  No data available.\n");
        return output;
    };

    let mut canvas = Canvas::new(size.0, size.1, x_range, y_range);
    if zero_line {
        canvas.horizontal_line(0.0);
    }
    for (&a, &b) in x.iter().zip(y) {
        canvas.plot(a, b, 'o');
    }
    output.push_str(&canvas.render(labels.0, labels.1));
    output
}

pub fn print_scatter(
    title: &str,
    x: &[f64],
    y: &[f64],
    labels: (&str, &str),
    size: (usize, usize),
    zero_line: bool,
) {
    print!("{}", format_scatter(title, x, y, labels, size, zero_line));
}

/// Theoretical standard normal quantiles at plotting positions (i - 0.5)/n.
pub fn normal_scores(n: usize) -> Vec<f64> {
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return Vec::new();
    };
    (1..=n)
        .map(|i| normal.inverse_cdf((i as f64 - 0.5) / n as f64))
        .collect()
}

/// Normal Q-Q plot with a dotted y = x reference.
pub fn format_qq_plot(title: &str, residuals: &[f64], size: (usize, usize)) -> String {
    let mut sample: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
    sample.sort_by(f64::total_cmp);
    let theoretical = normal_scores(sample.len());

    let mut output = heading(title);
    let Some(range) = padded_range(sample.iter().chain(theoretical.iter()).copied()) else {
        output.push_str("  No data available.\n");
        return output;
    };

    let mut canvas = Canvas::new(size.0, size.1, range, range);
    canvas.diagonal();
    for (&t, &s) in theoretical.iter().zip(&sample) {
        canvas.plot(t, s, 'o');
    }
    output.push_str(&canvas.render("Theoretical quantiles", "Sample quantiles"));
    output
}

pub fn print_qq_plot(title: &str, residuals: &[f64], size: (usize, usize)) {
    print!("{}", format_qq_plot(title, residuals, size));
}

const CURVE_GLYPHS: [char; 6] = ['*', '+', 'x', 'o', '%', '@'];

/// Overlay one or more density curves, each with its own glyph.
pub fn format_density_plot(title: &str, curves: &[DensityCurve], size: (usize, usize)) -> String {
    let mut output = heading(title);
    let x_range = padded_range(curves.iter().flat_map(|c| c.points.iter().map(|p| p.0)));
    let y_max = curves.iter().map(|c| c.max_density()).fold(0.0, f64::max);
    let Some(x_range) = x_range.filter(|_| y_max > 0.0) else {
        output.push_str("  No data available.\n");
        return output;
    };

    let mut canvas = Canvas::new(size.0, size.1, x_range, (0.0, y_max));
    for (curve, glyph) in curves.iter().zip(CURVE_GLYPHS.iter().cycle()) {
        for &(x, d) in &curve.points {
            canvas.plot(x, d, *glyph);
        }
    }
    output.push_str(&canvas.render("y", "density"));
    for (curve, glyph) in curves.iter().zip(CURVE_GLYPHS.iter().cycle()) {
        output.push_str(&format!(
            "  {glyph}  {}: mean {}, dispersion {}\n",
            curve.family, curve.mean, curve.dispersion
        ));
    }
    output
}

pub fn print_density_plot(title: &str, curves: &[DensityCurve], size: (usize, usize)) {
    print!("{}", format_density_plot(title, curves, size));
}
