use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, ContentArrangement, Table};

use crate::analysis::{ConfidenceInterval, DescriptiveSummary, GroupSummary, MeanVarianceFit};
use crate::case_studies::ModelComparisonRow;
use crate::glm::{CoefficientTable, DevianceTable, FitSummary};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn section(title: &str) -> String {
    format!("\n{}\n{}\n", title.bold().green(), "=".repeat(50))
}

fn opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

/// Scientific notation for tiny p-values, fixed otherwise.
fn format_pvalue(p: f64) -> String {
    if p.is_nan() {
        "-".to_string()
    } else if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

/// Format descriptive statistics, one row per variable.
pub fn format_descriptive_table(title: &str, summaries: &[(String, DescriptiveSummary)]) -> String {
    let mut output = section(title);
    let mut table = new_table(vec![
        "Variable", "n", "Min", "Q1", "Median", "Mean", "Q3", "Max", "SD", "CV", "Skew",
    ]);
    for (name, s) in summaries {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(s.n),
            Cell::new(format!("{:.3}", s.min)),
            Cell::new(format!("{:.3}", s.q1)),
            Cell::new(format!("{:.3}", s.median)),
            Cell::new(format!("{:.3}", s.mean)),
            Cell::new(format!("{:.3}", s.q3)),
            Cell::new(format!("{:.3}", s.max)),
            Cell::new(format!("{:.3}", s.std_dev)),
            Cell::new(format!("{:.3}", s.cv)),
            Cell::new(format!("{:.3}", s.skewness)),
        ]);
    }
    output.push_str(&format!("{table}\n"));
    output
}

pub fn print_descriptive_table(title: &str, summaries: &[(String, DescriptiveSummary)]) {
    print!("{}", format_descriptive_table(title, summaries));
}

/// Format group means and variances, one row per level or cell.
pub fn format_group_table(title: &str, groups: &[GroupSummary]) -> String {
    let mut output = section(title);
    let mut table = new_table(vec!["Group", "n", "Mean", "Variance", "SD"]);
    for g in groups {
        table.add_row(vec![
            Cell::new(&g.label),
            Cell::new(g.n),
            Cell::new(format!("{:.4}", g.mean)),
            Cell::new(format!("{:.4}", g.variance)),
            Cell::new(format!("{:.4}", g.std_dev)),
        ]);
    }
    output.push_str(&format!("{table}\n"));
    output
}

pub fn print_group_table(title: &str, groups: &[GroupSummary]) {
    print!("{}", format_group_table(title, groups));
}

pub fn format_confidence_interval(label: &str, ci: &ConfidenceInterval) -> String {
    format!(
        "  Mean {label}: {:.4} ({:.0}% CI {:.4} to {:.4}, n = {})\n",
        ci.mean,
        ci.confidence_level * 100.0,
        ci.lower,
        ci.upper,
        ci.sample_size
    )
}

/// Format the log-variance on log-mean regression.
pub fn format_mean_variance(fit: &MeanVarianceFit) -> String {
    let mut output = section("Mean-Variance Relationship");
    let mut table = new_table(vec!["Statistic", "Value"]);
    table.add_row(vec![Cell::new("Groups"), Cell::new(fit.num_groups)]);
    table.add_row(vec![
        Cell::new("Slope (variance power)"),
        Cell::new(format!("{:.3}", fit.slope)),
    ]);
    table.add_row(vec![
        Cell::new("Intercept"),
        Cell::new(format!("{:.3}", fit.intercept)),
    ]);
    table.add_row(vec![
        Cell::new("R-squared"),
        Cell::new(format!("{:.3}", fit.r_squared)),
    ]);
    table.add_row(vec![
        Cell::new("Suggested family"),
        Cell::new(
            fit.suggested_family()
                .map_or_else(|| "-".to_string(), |f| f.to_string()),
        ),
    ]);
    output.push_str(&format!("{table}\n"));
    output
}

pub fn print_mean_variance(fit: &MeanVarianceFit) {
    print!("{}", format_mean_variance(fit));
}

/// Format a coefficient table; log-link tables gain exp(estimate) columns.
pub fn format_coefficient_table(coefs: &CoefficientTable) -> String {
    let mut output = section("Coefficients");
    output.push_str(&format!(
        "{}\n",
        format!(
            "Dispersion: {:.5} | Residual df: {} | {:.0}% t intervals",
            coefs.dispersion,
            coefs.df_residual,
            coefs.confidence * 100.0
        )
        .dimmed()
    ));

    let multiplicative = coefs.rows.iter().any(|r| r.exp_estimate.is_some());
    let mut header = vec!["Term", "Estimate", "Std. Error", "t value", "Pr(>|t|)", "", "Lower", "Upper"];
    if multiplicative {
        header.extend(["exp(Est.)", "exp(Lower)", "exp(Upper)"]);
    }
    let mut table = new_table(header);

    for row in &coefs.rows {
        let mut cells = vec![
            Cell::new(&row.name),
            Cell::new(format!("{:.5}", row.estimate)),
            Cell::new(format!("{:.5}", row.std_error)),
            Cell::new(format!("{:.3}", row.t_value)),
            Cell::new(format_pvalue(row.p_value)),
            Cell::new(&row.stars),
            Cell::new(format!("{:.5}", row.lower)),
            Cell::new(format!("{:.5}", row.upper)),
        ];
        if multiplicative {
            cells.push(Cell::new(opt(row.exp_estimate, 4)));
            cells.push(Cell::new(opt(row.exp_lower, 4)));
            cells.push(Cell::new(opt(row.exp_upper, 4)));
        }
        table.add_row(cells);
    }

    output.push_str(&format!("{table}\n"));
    output.push_str(&format!(
        "{}\n",
        "Signif. codes: 0 '***' 0.001 '**' 0.01 '*' 0.05 '.' 0.1 ' ' 1".dimmed()
    ));
    output
}

pub fn print_coefficient_table(coefs: &CoefficientTable) {
    print!("{}", format_coefficient_table(coefs));
}

/// Format the sequential analysis of deviance.
pub fn format_deviance_table(anova: &DevianceTable) -> String {
    let mut output = section("Analysis of Deviance");
    output.push_str(&format!(
        "{}\n",
        format!(
            "{} | {} family, {} link | F tests with dispersion {:.5}",
            anova.formula, anova.family, anova.link, anova.dispersion
        )
        .dimmed()
    ));
    let mut table = new_table(vec!["Term", "Df", "Deviance", "Resid. Df", "Resid. Dev", "F", "Pr(>F)"]);
    for row in &anova.rows {
        let term = if row.converged {
            row.term.clone()
        } else {
            format!("{} (not converged)", row.term)
        };
        table.add_row(vec![
            Cell::new(term),
            Cell::new(row.df.map_or_else(|| "-".to_string(), |d| d.to_string())),
            Cell::new(opt(row.deviance, 4)),
            Cell::new(row.residual_df),
            Cell::new(format!("{:.4}", row.residual_deviance)),
            Cell::new(opt(row.f_value, 3)),
            Cell::new(row.p_value.map_or_else(|| "-".to_string(), format_pvalue)),
        ]);
    }
    output.push_str(&format!("{table}\n"));
    output
}

pub fn print_deviance_table(anova: &DevianceTable) {
    print!("{}", format_deviance_table(anova));
}

/// Format a link or family comparison.
pub fn format_model_comparison(title: &str, rows: &[ModelComparisonRow]) -> String {
    let mut output = section(title);
    let mut table = new_table(vec!["Family", "Link", "Converged", "Iterations", "Deviance", "AIC"]);
    for row in rows {
        let converged = if row.converged {
            Cell::new("yes")
        } else {
            Cell::new("no").fg(comfy_table::Color::Red)
        };
        table.add_row(vec![
            Cell::new(row.family),
            Cell::new(row.link),
            converged,
            Cell::new(row.iterations),
            Cell::new(opt(row.deviance, 4)),
            Cell::new(opt(row.aic, 2)),
        ]);
    }
    output.push_str(&format!("{table}\n"));
    output
}

pub fn print_model_comparison(title: &str, rows: &[ModelComparisonRow]) {
    print!("{}", format_model_comparison(title, rows));
}

/// Format fit statistics followed by the coefficient table.
pub fn format_fit_summary(summary: &FitSummary) -> String {
    let mut output = section("Model Fit");
    let mut table = new_table(vec!["Statistic", "Value"]);
    table.add_row(vec![Cell::new("Formula"), Cell::new(&summary.formula)]);
    table.add_row(vec![
        Cell::new("Family / link"),
        Cell::new(format!("{} / {}", summary.family, summary.link)),
    ]);
    table.add_row(vec![Cell::new("Observations"), Cell::new(summary.num_obs)]);
    table.add_row(vec![
        Cell::new("Null deviance"),
        Cell::new(format!("{:.4} on {} df", summary.null_deviance, summary.df_null)),
    ]);
    table.add_row(vec![
        Cell::new("Residual deviance"),
        Cell::new(format!("{:.4} on {} df", summary.deviance, summary.df_residual)),
    ]);
    table.add_row(vec![
        Cell::new("IRLS iterations"),
        Cell::new(summary.iterations),
    ]);
    table.add_row(vec![
        Cell::new("Converged"),
        Cell::new(if summary.converged { "yes" } else { "no" }),
    ]);
    if let Some(diag) = &summary.diagnostics {
        table.add_row(vec![
            Cell::new("Dispersion (Pearson)"),
            Cell::new(format!("{:.5}", diag.dispersion_pearson)),
        ]);
        table.add_row(vec![
            Cell::new("Dispersion (deviance)"),
            Cell::new(format!("{:.5}", diag.dispersion_deviance)),
        ]);
        table.add_row(vec![
            Cell::new("Log-likelihood"),
            Cell::new(format!("{:.3}", diag.log_likelihood)),
        ]);
        table.add_row(vec![Cell::new("AIC"), Cell::new(format!("{:.3}", diag.aic))]);
        table.add_row(vec![Cell::new("BIC"), Cell::new(format!("{:.3}", diag.bic))]);
    }
    output.push_str(&format!("{table}\n"));

    if let Some(issue) = &summary.convergence_issue {
        output.push_str(&format!("{} {issue}\n", "Warning:".yellow().bold()));
    }
    if let Some(coefs) = &summary.coefficients {
        output.push_str(&format_coefficient_table(coefs));
    }
    output
}

pub fn print_fit_summary(summary: &FitSummary) {
    print!("{}", format_fit_summary(summary));
}

/// Bulleted narrative notes.
pub fn format_notes(notes: &[String]) -> String {
    let mut output = section("Notes");
    for note in notes {
        output.push_str(&format!("  - {note}\n"));
    }
    output
}

pub fn print_notes(notes: &[String]) {
    print!("{}", format_notes(notes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glm::{CoefficientRow, DevianceRow, FamilyKind, LinkKind};

    fn coef_row(name: &str, exp: bool) -> CoefficientRow {
        CoefficientRow {
            name: name.to_string(),
            estimate: 0.5,
            std_error: 0.1,
            t_value: 5.0,
            p_value: 0.00001,
            lower: 0.3,
            upper: 0.7,
            exp_estimate: exp.then(|| 0.5f64.exp()),
            exp_lower: exp.then(|| 0.3f64.exp()),
            exp_upper: exp.then(|| 0.7f64.exp()),
            stars: "***".to_string(),
        }
    }

    #[test]
    fn test_format_descriptive_table() {
        let s = DescriptiveSummary::compute(&[1.0, 2.0, 3.0]).unwrap();
        let output = format_descriptive_table("Summary", &[("Foliage".to_string(), s)]);
        assert!(output.contains("Summary"));
        assert!(output.contains("Foliage"));
        assert!(output.contains("Median"));
        assert!(output.contains("2.000"));
    }

    #[test]
    fn test_format_group_table() {
        let groups = vec![GroupSummary {
            label: "Natural".to_string(),
            n: 4,
            mean: 0.25,
            variance: 0.01,
            std_dev: 0.1,
        }];
        let output = format_group_table("Foliage by Origin", &groups);
        assert!(output.contains("Natural"));
        assert!(output.contains("0.2500"));
    }

    #[test]
    fn test_format_coefficient_table_log_link() {
        let coefs = CoefficientTable {
            rows: vec![coef_row("(Intercept)", true), coef_row("log(DBH)", true)],
            dispersion: 0.2,
            df_residual: 10,
            confidence: 0.95,
        };
        let output = format_coefficient_table(&coefs);
        assert!(output.contains("exp(Est.)"));
        assert!(output.contains("log(DBH)"));
        assert!(output.contains("***"));
        assert!(output.contains("1.00e-5"));
        assert!(output.contains("Residual df: 10"));
    }

    #[test]
    fn test_format_coefficient_table_without_exp() {
        let coefs = CoefficientTable {
            rows: vec![coef_row("x", false)],
            dispersion: 0.2,
            df_residual: 10,
            confidence: 0.95,
        };
        assert!(!format_coefficient_table(&coefs).contains("exp(Est.)"));
    }

    #[test]
    fn test_format_deviance_table() {
        let anova = DevianceTable {
            formula: "Perm ~ Mach".to_string(),
            family: FamilyKind::InverseGaussian,
            link: LinkKind::Log,
            dispersion: 0.001,
            rows: vec![
                DevianceRow {
                    term: "NULL".to_string(),
                    df: None,
                    deviance: None,
                    residual_df: 80,
                    residual_deviance: 0.2,
                    f_value: None,
                    p_value: None,
                    converged: true,
                },
                DevianceRow {
                    term: "Mach".to_string(),
                    df: Some(2),
                    deviance: Some(0.05),
                    residual_df: 78,
                    residual_deviance: 0.15,
                    f_value: Some(12.5),
                    p_value: Some(0.0123),
                    converged: false,
                },
            ],
        };
        let output = format_deviance_table(&anova);
        assert!(output.contains("Analysis of Deviance"));
        assert!(output.contains("NULL"));
        assert!(output.contains("Mach (not converged)"));
        assert!(output.contains("0.0123"));
        assert!(output.contains("Inverse Gaussian family"));
    }

    #[test]
    fn test_format_model_comparison() {
        let rows = vec![
            ModelComparisonRow {
                family: FamilyKind::Gamma,
                link: LinkKind::Log,
                converged: true,
                iterations: 6,
                deviance: Some(6.19),
                aic: Some(-726.0),
                issue: None,
            },
            ModelComparisonRow {
                family: FamilyKind::Gamma,
                link: LinkKind::Identity,
                converged: false,
                iterations: 1,
                deviance: None,
                aic: None,
                issue: Some("no valid coefficients".to_string()),
            },
        ];
        let output = format_model_comparison("Link Comparison", &rows);
        assert!(output.contains("Link Comparison"));
        assert!(output.contains("identity"));
        assert!(output.contains("-726.00"));
        assert!(output.contains("no"));
    }

    #[test]
    fn test_format_notes() {
        let output = format_notes(&["first".to_string(), "second".to_string()]);
        assert!(output.contains("  - first"));
        assert!(output.contains("  - second"));
    }

    #[test]
    fn test_format_pvalue() {
        assert_eq!(format_pvalue(0.05), "0.0500");
        assert_eq!(format_pvalue(f64::NAN), "-");
        assert!(format_pvalue(1e-8).contains('e'));
    }
}
