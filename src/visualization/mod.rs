mod charts;
mod report;
mod tables;

pub use charts::{
    format_density_plot, format_histogram, format_qq_plot, format_scatter, normal_scores,
    print_density_plot, print_histogram, print_qq_plot, print_scatter,
};
pub use report::{
    format_foliage_report, format_permeability_report, format_residual_plots,
    print_foliage_report, print_permeability_report,
};
pub use tables::{
    format_coefficient_table, format_confidence_interval, format_descriptive_table,
    format_deviance_table, format_fit_summary, format_group_table, format_mean_variance,
    format_model_comparison, format_notes, print_coefficient_table, print_descriptive_table,
    print_deviance_table, print_fit_summary, print_group_table, print_mean_variance,
    print_model_comparison, print_notes,
};
