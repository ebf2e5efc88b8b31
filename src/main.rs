use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use positive_glm_analyzer::{
    analysis::{density_curve, positive_grid, Analyzer},
    case_studies::{
        compare_links, comparison_notes, FoliageStudy, PermeabilityStudy, ResidualData,
    },
    config::AnalysisConfig,
    glm::{FamilyKind, FitSummary, LinkKind, ModelSpec},
    io::{self, DatasetKind},
    models::{ModelFrame, PermeabilityDataset, TreeDataset},
    visualization::{
        format_residual_plots, print_density_plot, print_descriptive_table, print_fit_summary,
        print_foliage_report, print_group_table, print_histogram, print_mean_variance,
        print_model_comparison, print_notes, print_permeability_report,
    },
};

#[derive(Parser)]
#[command(
    name = "glm-analyzer",
    about = "Exploratory analysis and gamma / inverse-Gaussian GLMs for positive responses",
    version,
    author
)]
struct Cli {
    /// TOML file with fit and report settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary statistics and histogram of a dataset
    Describe {
        /// Path to a tree or permeability CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Numeric column to summarize by group (defaults to the dataset's response)
        #[arg(short, long)]
        response: Option<String>,

        /// Categorical column to group by
        #[arg(short, long)]
        by: Option<String>,
    },

    /// Fit a GLM and show coefficients, dispersion and diagnostics
    Fit {
        /// Path to a tree or permeability CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Model formula, e.g. "Foliage ~ Origin * log(DBH)"
        #[arg(short = 'F', long)]
        formula: String,

        /// Response family: gamma or inverse-gaussian
        #[arg(short = 'a', long, default_value = "gamma")]
        family: String,

        /// Link function: log, inverse, identity or inverse-square
        #[arg(short, long, default_value = "log")]
        link: String,

        /// Confidence level for coefficient intervals (0.0-1.0)
        #[arg(short, long)]
        confidence: Option<f64>,

        /// Write the fit summary as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Fit the same model with several links and compare them
    CompareLinks {
        /// Path to a tree or permeability CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Model formula
        #[arg(short = 'F', long)]
        formula: String,

        /// Response family: gamma or inverse-gaussian
        #[arg(short = 'a', long, default_value = "gamma")]
        family: String,

        /// Comma-separated links to try
        #[arg(short, long, value_delimiter = ',', default_value = "log,inverse,identity")]
        links: Vec<String>,
    },

    /// Run a complete case study: foliage or permeability
    Report {
        /// Which study to run
        study: String,

        /// Path to the study's CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Confidence level for intervals (0.0-1.0)
        #[arg(short, long)]
        confidence: Option<f64>,

        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Plot gamma or inverse-Gaussian densities for a mean and several dispersions
    Density {
        /// Family: gamma or inverse-gaussian
        #[arg(short = 'a', long, default_value = "gamma")]
        family: String,

        /// Mean of the distribution
        #[arg(short, long, default_value = "1.0")]
        mean: f64,

        /// One or more dispersion values
        #[arg(short, long, num_args = 1.., default_value = "0.5")]
        dispersion: Vec<f64>,

        /// Upper end of the plotted range (defaults to 4 x mean)
        #[arg(long)]
        upper: Option<f64>,
    },
}

/// Either of the two supported datasets.
enum Dataset {
    Trees(TreeDataset),
    Permeability(PermeabilityDataset),
}

impl Dataset {
    fn frame(&self) -> &dyn ModelFrame {
        match self {
            Dataset::Trees(d) => d,
            Dataset::Permeability(d) => d,
        }
    }

    fn response(&self) -> &'static str {
        match self {
            Dataset::Trees(_) => "Foliage",
            Dataset::Permeability(_) => "Perm",
        }
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let dataset = match io::detect_dataset_kind(path)? {
        DatasetKind::Trees => Dataset::Trees(io::read_trees_csv(path)?),
        DatasetKind::Permeability => Dataset::Permeability(io::read_permeability_csv(path)?),
    };
    info!(rows = dataset.frame().num_rows(), "loaded {}", path.display());
    Ok(dataset)
}

fn load_config(path: Option<&Path>, confidence: Option<f64>) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(p) => AnalysisConfig::from_file(p)?,
        None => AnalysisConfig::default(),
    };
    if let Some(c) = confidence {
        config.report.confidence = c;
        config.validate()?;
    }
    Ok(config)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Describe {
            input,
            response,
            by,
        } => {
            let config = load_config(cli.config.as_deref(), None)?;
            let dataset = load_dataset(&input)?;
            let frame = dataset.frame();
            let analyzer = Analyzer::new(frame);
            let response = response.unwrap_or_else(|| dataset.response().to_string());

            println!(
                "\n{}",
                format!("Dataset: {} ({} rows)", frame.name(), frame.num_rows())
                    .bold()
                    .cyan()
            );
            print_descriptive_table("Descriptive Statistics", &analyzer.numeric_summaries()?);

            let hist = analyzer.histogram(&response, config.report.histogram_bins)?;
            print_histogram(&format!("Distribution of {response}"), &hist);

            if let Some(factor) = by {
                let groups = analyzer.summary_by(&response, &factor)?;
                print_group_table(&format!("{response} by {factor}"), &groups);
                match analyzer.mean_variance_by_cells(&response, &[factor.as_str()]) {
                    Ok(fit) => print_mean_variance(&fit),
                    Err(e) => eprintln!("{}: {e}", "Warning".yellow()),
                }
            }
        }

        Commands::Fit {
            input,
            formula,
            family,
            link,
            confidence,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), confidence)?;
            let dataset = load_dataset(&input)?;
            let spec = ModelSpec::new(&formula, family.parse()?, link.parse()?)?;

            println!("\n{}", format!("GLM: {spec}").bold().cyan());
            let fit = spec.fit(dataset.frame(), &config.fit)?;
            let summary = FitSummary::from_fit(&fit, config.report.confidence)?;
            print_fit_summary(&summary);

            if fit.converged && fit.df_residual > 0 {
                print!(
                    "{}",
                    format_residual_plots(&ResidualData::from_fit(&fit), &config.report)
                );
            }

            if let Some(path) = json {
                io::write_report_json(&summary, &path, true)?;
                println!(
                    "{} Wrote fit summary to {}",
                    "Success:".green().bold(),
                    path.display()
                );
            }
        }

        Commands::CompareLinks {
            input,
            formula,
            family,
            links,
        } => {
            let config = load_config(cli.config.as_deref(), None)?;
            let dataset = load_dataset(&input)?;
            let family: FamilyKind = family.parse()?;
            let links = links
                .iter()
                .map(|l| l.parse::<LinkKind>())
                .collect::<Result<Vec<_>, _>>()?;
            if links.is_empty() {
                anyhow::bail!("At least one link is required");
            }

            let base = ModelSpec::new(&formula, family, links[0])?;
            let rows = compare_links(&base, &links, dataset.frame(), &config.fit);
            print_model_comparison(&format!("Link Comparison: {}", base.formula), &rows);
            print_notes(&comparison_notes(&rows));
        }

        Commands::Report {
            study,
            input,
            confidence,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), confidence)?;

            match study.to_lowercase().as_str() {
                "foliage" | "trees" | "lime" => {
                    let data = io::read_trees_csv(&input)?;
                    let report = FoliageStudy::new(&data, &config).run()?;
                    print_foliage_report(&report, &config.report);
                    if let Some(path) = json {
                        io::write_report_json(&report, &path, true)?;
                    }
                }
                "permeability" | "perm" => {
                    let data = io::read_permeability_csv(&input)?;
                    let report = PermeabilityStudy::new(&data, &config).run()?;
                    print_permeability_report(&report, &config.report);
                    if let Some(path) = json {
                        io::write_report_json(&report, &path, true)?;
                    }
                }
                _ => anyhow::bail!("Unknown study: {study}. Use: foliage or permeability"),
            }
        }

        Commands::Density {
            family,
            mean,
            dispersion,
            upper,
        } => {
            let config = load_config(cli.config.as_deref(), None)?;
            let family: FamilyKind = family.parse()?;
            let grid = positive_grid(upper.unwrap_or(4.0 * mean), 200);
            let curves = dispersion
                .iter()
                .map(|&phi| density_curve(family, mean, phi, &grid))
                .collect::<Result<Vec<_>, _>>()?;

            print_density_plot(
                &format!("{family} densities with mean {mean}"),
                &curves,
                (config.report.plot_width, config.report.plot_height),
            );
        }
    }

    Ok(())
}
