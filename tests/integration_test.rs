use std::io::Write;

use positive_glm_analyzer::{
    analysis::{Analyzer, DescriptiveSummary},
    case_studies::{compare_links, FoliageStudy, PermeabilityStudy},
    config::AnalysisConfig,
    error::GlmError,
    glm::{
        analysis_of_deviance, DispersionMethod, FamilyKind, FitConfig, FitSummary, Formula,
        LinkKind, ModelSpec,
    },
    io,
    models::{
        Machine, Origin, PermeabilityDataset, PermeabilityRecord, TreeDataset, TreeRecord,
        NUM_DAYS,
    },
};

/// Multiplicative noise with mean close to one.
const NOISE: [f64; 12] = [
    1.21, 0.83, 1.07, 0.92, 1.15, 0.78, 1.02, 0.96, 1.31, 0.88, 0.99, 0.90,
];

fn create_tree_dataset() -> TreeDataset {
    let mut dataset = TreeDataset::new("lime");
    let origins = [Origin::Coppice, Origin::Natural, Origin::Planted];
    for i in 0..60 {
        let dbh = 3.0 + 0.6 * i as f64;
        let origin = origins[i % 3];
        let (a, b) = match origin {
            Origin::Coppice => (-4.5, 1.8),
            Origin::Natural => (-5.0, 2.0),
            Origin::Planted => (-4.2, 1.6),
        };
        dataset.records.push(TreeRecord {
            foliage: (a + b * dbh.ln()).exp() * NOISE[i % NOISE.len()],
            dbh,
            age: 8.0 + 1.5 * i as f64,
            origin,
        });
    }
    dataset
}

fn create_permeability_dataset() -> PermeabilityDataset {
    let mut dataset = PermeabilityDataset::new("permeability");
    let mut k = 0;
    for day in 1..=NUM_DAYS {
        for (machine, effect) in [(Machine::A, 1.0), (Machine::B, 0.78), (Machine::C, 0.86)] {
            for _ in 0..3 {
                let day_effect = 1.0 + 0.05 * f64::from(day % 3);
                dataset.records.push(PermeabilityRecord {
                    day,
                    machine,
                    perm: 48.0 * effect * day_effect * NOISE[k % NOISE.len()],
                });
                k += 1;
            }
        }
    }
    dataset
}

// --- IO ---

#[test]
fn test_trees_csv_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trees.csv");
    let original = create_tree_dataset();
    io::write_trees_csv(&original, &path).unwrap();

    let loaded = io::read_trees_csv(&path).unwrap();
    assert_eq!(loaded.name, "trees");
    assert_eq!(loaded.len(), original.len());
    assert_eq!(loaded.records[1].origin, Origin::Natural);
    assert!((loaded.records[5].foliage - original.records[5].foliage).abs() < 1e-9);
    assert_eq!(io::detect_dataset_kind(&path).unwrap(), io::DatasetKind::Trees);
}

#[test]
fn test_permeability_csv_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("perm.csv");
    let original = create_permeability_dataset();
    io::write_permeability_csv(&original, &path).unwrap();

    let loaded = io::read_permeability_csv(&path).unwrap();
    assert_eq!(loaded.len(), 81);
    assert_eq!(loaded.records[3].machine, Machine::B);
    assert_eq!(
        io::detect_dataset_kind(&path).unwrap(),
        io::DatasetKind::Permeability
    );
}

#[test]
fn test_invalid_row_reports_position() {
    let data = b"Foliage,DBH,Age,Origin\n0.1,4.0,10,Natural\n-0.2,5.0,12,Planted\n";
    let err = io::read_trees_from_bytes(data, "bad").unwrap_err();
    assert!(err.to_string().contains("row 2"));
}

#[test]
fn test_unknown_origin_rejected() {
    let data = b"Foliage,DBH,Age,Origin\n0.1,4.0,10,Seedling\n";
    assert!(io::read_trees_from_bytes(data, "bad").is_err());
}

#[test]
fn test_day_out_of_range_rejected() {
    let data = b"Day,Mach,Perm\n10,A,25.0\n";
    assert!(io::read_permeability_from_bytes(data, "bad").is_err());
}

// --- Exploratory analysis ---

#[test]
fn test_foliage_summary_is_right_skewed() {
    let data = create_tree_dataset();
    let summary = Analyzer::new(&data).summary("Foliage").unwrap();
    assert_eq!(summary.n, 60);
    assert!(summary.mean > summary.median);
    assert!(summary.skewness > 0.0);
}

#[test]
fn test_descriptive_summary_direct() {
    let summary = DescriptiveSummary::compute(&[2.0, 4.0, 4.0, 5.0]).unwrap();
    assert!((summary.mean - 3.75).abs() < 1e-12);
    assert!((summary.median - 4.0).abs() < 1e-12);
}

#[test]
fn test_permeability_groups() {
    let data = create_permeability_dataset();
    let analyzer = Analyzer::new(&data);
    let by_machine = analyzer.summary_by("Perm", "Mach").unwrap();
    assert_eq!(by_machine.len(), 3);
    assert!(by_machine[0].mean > by_machine[1].mean);
    let cells = analyzer.summary_by_cells("Perm", &["Mach", "Day"]).unwrap();
    assert_eq!(cells.len(), 27);
}

// --- Model fitting ---

#[test]
fn test_gamma_log_link_recovers_allometric_exponent() {
    let data = create_tree_dataset();
    let spec = ModelSpec::new("Foliage ~ log(DBH)", FamilyKind::Gamma, LinkKind::Log).unwrap();
    let fit = spec.fit(&data, &FitConfig::default()).unwrap();
    assert!(fit.converged);
    let slope = fit.coefficient("log(DBH)").unwrap();
    assert!((slope - 1.8).abs() < 0.25, "slope {slope}");
    assert!(fit.deviance < fit.null_deviance);
}

#[test]
fn test_interaction_model_columns() {
    let data = create_tree_dataset();
    let spec = ModelSpec::new(FoliageStudy::FORMULA, FamilyKind::Gamma, LinkKind::Log).unwrap();
    let fit = spec.fit(&data, &FitConfig::default()).unwrap();
    assert_eq!(
        fit.column_names(),
        &[
            "(Intercept)",
            "Origin[Natural]",
            "Origin[Planted]",
            "log(DBH)",
            "Origin[Natural]:log(DBH)",
            "Origin[Planted]:log(DBH)",
        ]
    );
    assert_eq!(fit.df_residual, 54);
}

#[test]
fn test_identity_link_failure_is_reported_not_raised() {
    let mut data = create_tree_dataset();
    // With no intercept, μ = β·Age is zero for a tree of age zero
    data.records[0].age = 0.0;
    let spec = ModelSpec::new("Foliage ~ Age - 1", FamilyKind::Gamma, LinkKind::Identity).unwrap();
    let fit = spec.fit(&data, &FitConfig::default()).unwrap();
    assert!(!fit.converged);
    assert!(fit.convergence_issue.is_some());

    let summary = FitSummary::from_fit(&fit, 0.95).unwrap();
    assert!(summary.coefficients.is_none());

    let rows = compare_links(
        &spec,
        &[LinkKind::Log, LinkKind::Identity],
        &data,
        &FitConfig::default(),
    );
    assert_eq!(rows.len(), 2);
    assert!(!rows[1].converged);
    assert!(rows[1].aic.is_none());
}

#[test]
fn test_dispersion_estimates_agree_roughly() {
    let data = create_permeability_dataset();
    let spec = ModelSpec::new("Perm ~ Mach + Day", FamilyKind::InverseGaussian, LinkKind::Log)
        .unwrap();
    let fit = spec.fit(&data, &FitConfig::default()).unwrap();
    let pearson = fit.dispersion(DispersionMethod::Pearson);
    let deviance = fit.dispersion(DispersionMethod::Deviance);
    assert!(pearson > 0.0 && deviance > 0.0);
    assert!((pearson / deviance - 1.0).abs() < 0.5);
}

#[test]
fn test_analysis_of_deviance_telescopes() {
    let data = create_tree_dataset();
    let formula = Formula::parse(FoliageStudy::FORMULA).unwrap();
    let table = analysis_of_deviance(
        &formula,
        &data,
        FamilyKind::Gamma,
        LinkKind::Log,
        &FitConfig::default(),
    )
    .unwrap();
    assert_eq!(table.rows.len(), 4);
    let drops: f64 = table.rows.iter().filter_map(|r| r.deviance).sum();
    let first = table.rows[0].residual_deviance;
    let last = table.rows[3].residual_deviance;
    assert!((drops - (first - last)).abs() < 1e-8);
    // log(DBH) explains most of the variation
    assert!(table.row("log(DBH)").unwrap().p_value.unwrap() < 0.001);
}

#[test]
fn test_unknown_column_is_error() {
    let data = create_tree_dataset();
    let spec = ModelSpec::new("Foliage ~ Height", FamilyKind::Gamma, LinkKind::Log).unwrap();
    assert!(matches!(
        spec.fit(&data, &FitConfig::default()),
        Err(GlmError::InvalidModel(_))
    ));
}

// --- Case studies ---

#[test]
fn test_foliage_study_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lime.csv");
    io::write_trees_csv(&create_tree_dataset(), &path).unwrap();

    let data = io::read_trees_csv(&path).unwrap();
    let config = AnalysisConfig::default();
    let report = FoliageStudy::new(&data, &config).run().unwrap();
    assert_eq!(report.dataset, "lime");
    assert!(report.model.converged);
    assert_eq!(report.link_comparison.len(), 3);
    assert!(!report.notes.is_empty());

    let json_path = dir.path().join("report.json");
    io::write_report_json(&report, &json_path, true).unwrap();
    let json = std::fs::read_to_string(&json_path).unwrap();
    assert!(json.contains("\"link_comparison\""));
}

#[test]
fn test_permeability_study_prefers_a_family() {
    let data = create_permeability_dataset();
    let config = AnalysisConfig::default();
    let report = PermeabilityStudy::new(&data, &config).run().unwrap();
    assert_eq!(report.family_comparison.len(), 2);
    assert!(report.family_comparison.iter().all(|r| r.aic.is_some()));
    assert!(report.notes.iter().any(|n| n.contains("smallest AIC")));
    let coefs = report.model.coefficients.unwrap();
    assert!(coefs.row("Mach[B]").unwrap().exp_estimate.unwrap() < 1.0);
}

#[test]
fn test_config_file_limits_iterations() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[fit]\nmax_iterations = 1").unwrap();
    let config = AnalysisConfig::from_file(file.path()).unwrap();

    let data = create_tree_dataset();
    let fit = FoliageStudy::new(&data, &config).fit_main_model().unwrap();
    assert!(!fit.converged);
    assert_eq!(fit.iterations, 1);
}
