use colored::Colorize;

use super::charts::{format_qq_plot, format_scatter};
use super::tables::{
    format_confidence_interval, format_deviance_table, format_descriptive_table,
    format_fit_summary, format_group_table, format_mean_variance, format_model_comparison,
    format_notes,
};
use crate::case_studies::{FoliageReport, PermeabilityReport, ResidualData};
use crate::config::ReportConfig;

fn title(text: &str) -> String {
    format!("\n{}\n", text.bold().cyan())
}

/// Residual-vs-fitted and Q-Q plots for a fitted model.
pub fn format_residual_plots(residuals: &ResidualData, config: &ReportConfig) -> String {
    let size = (config.plot_width, config.plot_height);
    let mut output = format_scatter(
        "Standardized Deviance Residuals vs Fitted",
        &residuals.fitted,
        &residuals.standardized_residuals,
        ("fitted mean", "standardized residual"),
        size,
        true,
    );
    output.push_str(&format_qq_plot(
        "Normal Q-Q Plot of Quantile Residuals",
        &residuals.quantile_residuals,
        size,
    ));
    output
}

pub fn format_foliage_report(report: &FoliageReport, config: &ReportConfig) -> String {
    let mut output = title(&format!(
        "Foliage Biomass Study: {} ({} trees)",
        report.dataset, report.num_trees
    ));
    output.push_str(&format_descriptive_table("Descriptive Statistics", &report.summaries));
    output.push_str(&format_confidence_interval("foliage", &report.foliage_mean_ci));
    if let Some(r) = report.foliage_dbh_correlation {
        output.push_str(&format!("  Correlation of foliage and DBH: {r:.3}\n"));
    }
    output.push_str(&format_group_table("Foliage by Origin", &report.foliage_by_origin));
    if let Some(mv) = &report.mean_variance {
        output.push_str(&format_mean_variance(mv));
    }
    output.push_str(&format_model_comparison("Link Comparison (Gamma)", &report.link_comparison));
    output.push_str(&format_fit_summary(&report.model));
    if let Some(anova) = &report.analysis_of_deviance {
        output.push_str(&format_deviance_table(anova));
    }
    if let Some(residuals) = &report.residuals {
        output.push_str(&format_residual_plots(residuals, config));
    }
    output.push_str(&format_notes(&report.notes));
    output
}

pub fn print_foliage_report(report: &FoliageReport, config: &ReportConfig) {
    print!("{}", format_foliage_report(report, config));
}

pub fn format_permeability_report(report: &PermeabilityReport, config: &ReportConfig) -> String {
    let mut output = title(&format!(
        "Permeability Study: {} ({} sheets)",
        report.dataset, report.num_sheets
    ));
    output.push_str(&format_descriptive_table(
        "Descriptive Statistics",
        &[("Perm".to_string(), report.summary.clone())],
    ));
    output.push_str(&format_group_table("Permeability by Machine", &report.by_machine));
    output.push_str(&format_group_table("Permeability by Day", &report.by_day));
    if let Some(mv) = &report.mean_variance {
        output.push_str(&format_mean_variance(mv));
    }
    output.push_str(&format_model_comparison(
        "Family Comparison (log link)",
        &report.family_comparison,
    ));
    output.push_str(&format_fit_summary(&report.model));
    if let Some(anova) = &report.analysis_of_deviance {
        output.push_str(&format_deviance_table(anova));
    }
    if let Some(residuals) = &report.residuals {
        output.push_str(&format_residual_plots(residuals, config));
    }
    output.push_str(&format_notes(&report.notes));
    output
}

pub fn print_permeability_report(report: &PermeabilityReport, config: &ReportConfig) {
    print!("{}", format_permeability_report(report, config));
}
