//! Tests for linear regression models

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::base::ModelError;
use crate::lm::{lm, Diagnostics, IntervalKind, LinearConfig, LinearRegression, StandardErrorType};
use bootstat_core::data::{DataFrame, DataFrameBuilder, Series};
use bootstat_core::spec::{ModelSpec, SpecError};

// ==================== Test Fixtures ====================

/// Simple linear relationship: y = 2x + 1
fn simple_linear_data() -> DataFrame {
    DataFrameBuilder::new()
        .with_column("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .unwrap()
        .with_column("y", Series::float(vec![3.0, 5.0, 7.0, 9.0, 11.0]))
        .unwrap()
        .build()
        .unwrap()
}

/// Multiple regression: y = 1 + 2x1 + 3x2
fn multiple_regression_data() -> DataFrame {
    let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let x2 = vec![2.0, 1.0, 4.0, 3.0, 6.0, 2.0];
    let y = x1
        .iter()
        .zip(&x2)
        .map(|(a, b)| 1.0 + 2.0 * a + 3.0 * b)
        .collect::<Vec<f64>>();

    DataFrame::from_columns(vec![
        ("x1", Series::float(x1)),
        ("x2", Series::float(x2)),
        ("y", Series::float(y)),
    ])
    .unwrap()
}

/// Realistic dataset with some noise: y = 1 + 2x1 + 3x2 + e
fn noisy_data(seed: u64) -> DataFrame {
    let n = 100;
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.1).unwrap();

    let x1: Vec<f64> = (0..n).map(|i| i as f64 * 0.1).collect();
    let x2: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
    let y: Vec<f64> = x1
        .iter()
        .zip(&x2)
        .map(|(a, b)| 1.0 + 2.0 * a + 3.0 * b + noise.sample(&mut rng))
        .collect();

    DataFrame::from_columns(vec![
        ("x1", Series::float(x1)),
        ("x2", Series::float(x2)),
        ("y", Series::float(y)),
    ])
    .unwrap()
}

/// Basket size by store channel, with a per-item slope: y = 5 + 2q + 3[Store] - 1[Web]
fn channel_data() -> DataFrame {
    let channel = ["App", "Store", "Web", "App", "Store", "Web", "App", "Store", "Web"];
    let quantity = vec![1.0, 2.0, 3.0, 2.0, 3.0, 1.0, 3.0, 1.0, 2.0];
    let y = channel
        .iter()
        .zip(&quantity)
        .map(|(c, q)| {
            let shift = match *c {
                "Store" => 3.0,
                "Web" => -1.0,
                _ => 0.0,
            };
            5.0 + 2.0 * q + shift
        })
        .collect::<Vec<f64>>();

    DataFrame::from_columns(vec![
        ("channel", Series::categorical(&channel)),
        ("quantity", Series::float(quantity)),
        ("total", Series::float(y)),
    ])
    .unwrap()
}

// ==================== Basic Tests ====================

#[test]
fn test_linear_regression_basic_fit() {
    let df = simple_linear_data();

    let model = LinearRegression::new(ModelSpec::new("y").predictor("x"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let coeffs = model.coefficients().unwrap();
    assert_eq!(coeffs.len(), 2);
    assert_abs_diff_eq!(coeffs[0], 1.0, epsilon = 1e-10);
    assert_abs_diff_eq!(coeffs[1], 2.0, epsilon = 1e-10);

    let fitted = model.fitted_values().unwrap();
    let expected = array![3.0, 5.0, 7.0, 9.0, 11.0];
    assert_abs_diff_eq!(fitted, &expected, epsilon = 1e-10);

    let residuals = model.residuals().unwrap();
    assert_abs_diff_eq!(residuals.sum(), 0.0, epsilon = 1e-10);

    let summary = model.summary().unwrap();
    let r2 = summary.model_statistics.r_squared.unwrap();
    assert_abs_diff_eq!(r2, 1.0, epsilon = 1e-10);
    assert!(summary.coefficients[0].is_intercept);
    assert_eq!(summary.coefficients[1].name, "x");
}

#[test]
fn test_linear_regression_no_intercept() {
    let df = DataFrame::from_columns(vec![
        ("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0])),
        ("y", Series::float(vec![2.0, 4.0, 6.0, 8.0, 10.0])),
    ])
    .unwrap();

    let model = LinearRegression::new(ModelSpec::new("y").predictor("x").without_intercept())
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let coeffs = model.coefficients().unwrap();
    assert_eq!(coeffs.len(), 1);
    assert_abs_diff_eq!(coeffs[0], 2.0, epsilon = 1e-10);

    let summary = model.summary().unwrap();
    assert_abs_diff_eq!(
        summary.model_statistics.r_squared.unwrap(),
        1.0,
        epsilon = 1e-10
    );
    assert_eq!(summary.model_statistics.df_model, Some(1));
}

#[test]
fn test_linear_regression_multiple_predictors() {
    let model = lm(
        &ModelSpec::new("y").predictors(["x1", "x2"]),
        &multiple_regression_data(),
    )
    .unwrap();

    let coeffs = model.coefficients().unwrap();
    assert_eq!(coeffs.len(), 3);
    assert_abs_diff_eq!(coeffs[0], 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coeffs[1], 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coeffs[2], 3.0, epsilon = 1e-9);
}

#[test]
fn test_linear_regression_interaction() {
    // y = 1 + 2x1 + 3x2 + 4x1:x2
    let x1 = vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0];
    let x2 = vec![1.0, 1.0, 2.0, 3.0, 2.0, 4.0];
    let y: Vec<f64> = x1
        .iter()
        .zip(&x2)
        .map(|(a, b)| 1.0 + 2.0 * a + 3.0 * b + 4.0 * a * b)
        .collect();
    let df = DataFrame::from_columns(vec![
        ("x1", Series::float(x1)),
        ("x2", Series::float(x2)),
        ("y", Series::float(y)),
    ])
    .unwrap();

    let spec = ModelSpec::new("y")
        .predictors(["x1", "x2"])
        .interaction("x1", "x2");
    let model = lm(&spec, &df).unwrap();

    let coeffs = model.coefficients().unwrap();
    assert_eq!(coeffs.len(), 4);
    assert_abs_diff_eq!(coeffs[0], 1.0, epsilon = 1e-8);
    assert_abs_diff_eq!(coeffs[1], 2.0, epsilon = 1e-8);
    assert_abs_diff_eq!(coeffs[2], 3.0, epsilon = 1e-8);
    assert_abs_diff_eq!(coeffs[3], 4.0, epsilon = 1e-8);
    assert_eq!(model.result().unwrap().variable_names[3], "x1:x2");
}

#[test]
fn test_linear_regression_with_categorical() {
    let spec = ModelSpec::new("total").predictors(["channel", "quantity"]);
    let model = lm(&spec, &channel_data()).unwrap();

    let summary = model.summary().unwrap();
    let names: Vec<&str> = summary.coefficients.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["(Intercept)", "channel[Store]", "channel[Web]", "quantity"]
    );

    let coeffs = model.coefficients().unwrap();
    assert_abs_diff_eq!(coeffs[0], 5.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coeffs[1], 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coeffs[2], -1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(coeffs[3], 2.0, epsilon = 1e-9);
}

// ==================== Inference Tests ====================

#[test]
fn test_standard_errors_match_closed_form() {
    let df = noisy_data(7);
    let model = lm(&ModelSpec::new("y").predictor("x1"), &df).unwrap();
    let result = model.result().unwrap();

    // SE(slope) = s / sqrt(Sxx) for simple regression
    let x = df.column("x1").unwrap().to_f64_array().unwrap();
    let mean = x.mean().unwrap();
    let sxx: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let s = result.model_statistics.residual_std_error.unwrap();
    assert_relative_eq!(result.standard_errors[1], s / sxx.sqrt(), max_relative = 1e-9);

    // Covariance is symmetric with the squared errors on the diagonal
    let cov = result.cov_matrix();
    assert_relative_eq!(cov[(0, 1)], cov[(1, 0)], max_relative = 1e-12);
    assert_relative_eq!(cov[(1, 1)].sqrt(), result.standard_errors[1], max_relative = 1e-9);
}

#[test]
fn test_noisy_fit_recovers_coefficients() {
    let model = lm(&ModelSpec::new("y").predictors(["x1", "x2"]), &noisy_data(42)).unwrap();
    let summary = model.summary().unwrap();

    for (coeff, truth) in summary.coefficients.iter().zip([1.0, 2.0, 3.0]) {
        assert_abs_diff_eq!(coeff.estimate, truth, epsilon = 0.1);
        assert!(coeff.ci_lower.unwrap() < coeff.estimate && coeff.estimate < coeff.ci_upper.unwrap());
        assert!(coeff.p_value.unwrap() < 1e-6);
        assert_eq!(coeff.df, Some(97.0));
    }

    let stats = summary.model_statistics;
    assert!(stats.r_squared.unwrap() > 0.99);
    assert!(stats.adj_r_squared.unwrap() <= stats.r_squared.unwrap());
    assert!(stats.f_p_value.unwrap() < 1e-10);
    assert!(stats.aic.unwrap() < stats.bic.unwrap());
    assert_eq!(stats.df_residual, Some(97));
}

#[test]
fn test_robust_standard_errors() {
    let df = noisy_data(3);
    let spec = ModelSpec::new("y").predictors(["x1", "x2"]);

    let hc0 = LinearRegression::new(spec.clone())
        .unwrap()
        .data(&df)
        .robust(StandardErrorType::HC0)
        .fit()
        .unwrap();
    let hc1 = LinearRegression::new(spec.clone())
        .unwrap()
        .data(&df)
        .robust(StandardErrorType::HC1)
        .fit()
        .unwrap();
    let hc3 = LinearRegression::new(spec)
        .unwrap()
        .data(&df)
        .robust(StandardErrorType::HC3)
        .fit()
        .unwrap();

    let se0 = hc0.standard_errors().unwrap();
    let se1 = hc1.standard_errors().unwrap();
    let se3 = hc3.standard_errors().unwrap();
    let factor = (100.0_f64 / 97.0).sqrt();
    for j in 0..3 {
        assert_relative_eq!(se1[j], se0[j] * factor, max_relative = 1e-9);
        assert!(se3[j] > se0[j]);
    }
    // Point estimates do not depend on the standard error type
    assert_abs_diff_eq!(
        hc0.coefficients().unwrap(),
        hc3.coefficients().unwrap(),
        epsilon = 1e-12
    );
}

// ==================== Error Handling Tests ====================

#[test]
fn test_collinear_predictors_are_degenerate() {
    // x2 = x1 + 1 is aliased with the intercept and x1
    let df = DataFrame::from_columns(vec![
        ("x1", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0])),
        ("x2", Series::float(vec![2.0, 3.0, 4.0, 5.0, 6.0])),
        ("y", Series::float(vec![9.0, 13.0, 17.0, 21.0, 25.0])),
    ])
    .unwrap();

    let err = lm(&ModelSpec::new("y").predictors(["x1", "x2"]), &df).unwrap_err();
    match err {
        ModelError::DegenerateFit { terms } => assert_eq!(terms, vec!["x2".to_string()]),
        other => panic!("Expected DegenerateFit, got {:?}", other),
    }
}

#[test]
fn test_absent_level_is_degenerate() {
    let channel = Series::categorical_with_levels(
        &["App", "Store", "App", "Store", "App", "Store"],
        vec!["App".to_string(), "Store".to_string(), "Web".to_string()],
    )
    .unwrap();
    let df = DataFrame::from_columns(vec![
        ("channel", channel),
        ("total", Series::float(vec![1.0, 2.0, 1.5, 2.5, 0.5, 3.0])),
    ])
    .unwrap();

    let err = lm(&ModelSpec::new("total").predictor("channel"), &df).unwrap_err();
    assert!(matches!(
        err,
        ModelError::DegenerateFit { ref terms } if terms == &["channel[Web]".to_string()]
    ));
    assert!(err.to_string().contains("channel[Web]"));
}

#[test]
fn test_linear_regression_insufficient_data() {
    let df = DataFrameBuilder::new()
        .with_column("y", Series::float(vec![1.0, 2.0]))
        .unwrap()
        .with_column("x1", Series::float(vec![1.0, 2.0]))
        .unwrap()
        .with_column("x2", Series::float(vec![3.0, 4.0]))
        .unwrap()
        .with_column("x3", Series::float(vec![5.0, 6.0]))
        .unwrap()
        .build()
        .unwrap();

    let result = lm(&ModelSpec::new("y").predictors(["x1", "x2", "x3"]), &df);

    match result.unwrap_err() {
        ModelError::InsufficientData {
            n_samples,
            n_predictors,
        } => {
            assert_eq!(n_samples, 2);
            assert_eq!(n_predictors, 4);
        }
        other => panic!("Expected InsufficientData error, got {:?}", other),
    }
}

#[test]
fn test_linear_regression_missing_variable() {
    let result = lm(&ModelSpec::new("y").predictor("z"), &simple_linear_data());
    assert!(matches!(
        result.unwrap_err(),
        ModelError::Spec(SpecError::FieldNotFound { .. })
    ));
}

#[test]
fn test_linear_regression_invalid_spec() {
    let err = LinearRegression::new(ModelSpec::new("y").predictor("y")).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_linear_regression_no_data() {
    let model = LinearRegression::new(ModelSpec::new("y").predictor("x")).unwrap();
    let err = model.fit().unwrap_err();
    assert!(matches!(err, ModelError::InvalidArgument(ref m) if m.contains("no data")));
}

#[test]
fn test_invalid_confidence_level() {
    let config = LinearConfig {
        confidence_level: 1.5,
        ..LinearConfig::default()
    };
    let err = LinearRegression::new(ModelSpec::new("y").predictor("x"))
        .unwrap()
        .data(&simple_linear_data())
        .config(config)
        .fit()
        .unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_unfitted_model() {
    let model = LinearRegression::new(ModelSpec::new("y").predictor("x")).unwrap();
    assert!(!model.is_fitted());
    assert!(matches!(model.summary(), Err(ModelError::NotFitted)));
    assert!(matches!(
        model.predict(&simple_linear_data()),
        Err(ModelError::NotFitted)
    ));
}

// ==================== Prediction Tests ====================

#[test]
fn test_linear_regression_prediction() {
    let model = lm(&ModelSpec::new("y").predictor("x"), &simple_linear_data()).unwrap();
    let test_df = DataFrame::from_columns(vec![("x", Series::float(vec![6.0, 7.0]))]).unwrap();

    let predictions = model.predict(&test_df).unwrap();
    assert_eq!(predictions.len(), 2);
    assert_abs_diff_eq!(predictions[0], 13.0, epsilon = 1e-10);
    assert_abs_diff_eq!(predictions[1], 15.0, epsilon = 1e-10);
}

#[test]
fn test_prediction_with_categorical_levels() {
    let spec = ModelSpec::new("total").predictors(["channel", "quantity"]);
    let model = lm(&spec, &channel_data()).unwrap();

    let new_data = DataFrame::from_columns(vec![
        (
            "channel",
            Series::string(vec!["Web".to_string(), "App".to_string()]),
        ),
        ("quantity", Series::float(vec![4.0, 4.0])),
    ])
    .unwrap();

    let predictions = model.predict(&new_data).unwrap();
    assert_abs_diff_eq!(predictions, array![12.0, 13.0], epsilon = 1e-9);
}

#[test]
fn test_prediction_intervals_are_wider() {
    let model = lm(&ModelSpec::new("y").predictor("x1"), &noisy_data(11)).unwrap();
    let result = model.result().unwrap();
    let x_new = array![[1.0, 2.5], [1.0, 20.0]];

    let (cl, cu) = result
        .predict_interval(&x_new, 0.95, IntervalKind::Confidence)
        .unwrap();
    let (pl, pu) = result
        .predict_interval(&x_new, 0.95, IntervalKind::Prediction)
        .unwrap();

    let fit = result.predict(&x_new);
    for i in 0..2 {
        assert!(pl[i] < cl[i] && cl[i] < fit[i] && fit[i] < cu[i] && cu[i] < pu[i]);
    }
    // Extrapolation is less certain than interpolation
    assert!(cu[1] - cl[1] > cu[0] - cl[0]);

    assert!(result
        .predict_interval(&x_new, 0.0, IntervalKind::Confidence)
        .is_err());
}

// ==================== Diagnostics Tests ====================

#[test]
fn test_vif_orthogonal_predictors_is_one() {
    let df = DataFrame::from_columns(vec![
        ("a", Series::float(vec![-1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0])),
        ("b", Series::float(vec![-1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0])),
        ("y", Series::float(vec![0.3, 1.2, 0.8, 2.1, 0.1, 1.5, 0.9, 2.4])),
    ])
    .unwrap();

    let vifs = lm(&ModelSpec::new("y").predictors(["a", "b"]), &df)
        .unwrap()
        .vif()
        .unwrap();
    assert_eq!(vifs.len(), 2);
    for vif in vifs {
        assert_abs_diff_eq!(vif.gvif, 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(vif.tolerance, 1.0, epsilon = 1e-10);
    }
}

#[test]
fn test_vif_correlated_predictors() {
    let df = DataFrame::from_columns(vec![
        ("a", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])),
        ("b", Series::float(vec![1.1, 2.3, 2.8, 4.2, 5.1, 5.8])),
        ("y", Series::float(vec![2.0, 4.1, 5.9, 8.2, 9.8, 12.1])),
    ])
    .unwrap();

    let vifs = lm(&ModelSpec::new("y").predictors(["a", "b"]), &df)
        .unwrap()
        .vif()
        .unwrap();

    // With two predictors both VIFs equal 1 / (1 - r^2)
    let a = df.column("a").unwrap().to_f64_array().unwrap();
    let b = df.column("b").unwrap().to_f64_array().unwrap();
    let (ma, mb) = (a.mean().unwrap(), b.mean().unwrap());
    let sab: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let saa: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let sbb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    let r2 = sab * sab / (saa * sbb);

    for vif in &vifs {
        assert_relative_eq!(vif.gvif, 1.0 / (1.0 - r2), max_relative = 1e-8);
        assert!(vif.gvif > 10.0);
    }
}

#[test]
fn test_gvif_for_categorical_term() {
    let spec = ModelSpec::new("total").predictors(["channel", "quantity"]);
    let vifs = lm(&spec, &channel_data()).unwrap().vif().unwrap();

    assert_eq!(vifs[0].term, "channel");
    assert_eq!(vifs[0].df, 2);
    assert_relative_eq!(vifs[0].adjusted, vifs[0].gvif.powf(0.25), max_relative = 1e-12);
    assert!(vifs.iter().all(|v| v.gvif >= 1.0 - 1e-12));
}

#[test]
fn test_diagnostics_flag_outlier() {
    let mut y: Vec<f64> = (0..20)
        .map(|i| 1.0 + 0.5 * i as f64 + 0.05 * ((i * 7 % 5) as f64 - 2.0))
        .collect();
    y[19] += 15.0;
    let df = DataFrame::from_columns(vec![
        ("x", Series::float((0..20).map(|i| i as f64).collect::<Vec<f64>>())),
        ("y", Series::float(y)),
    ])
    .unwrap();

    let model = lm(&ModelSpec::new("y").predictor("x"), &df).unwrap();
    let result = model.result().unwrap();
    assert!(result.influential_points(None).contains(&19));

    let diagnostics = Diagnostics::run_all(result, model.layout().unwrap()).unwrap();
    assert!(diagnostics.cooks_outliers.iter().any(|o| o.index == 19));
    assert!(diagnostics.influence_points.iter().any(|o| o.index == 19));
    // A single predictor has no VIF
    assert!(diagnostics.vif.is_empty());
}

#[test]
fn test_summary_display() {
    let spec = ModelSpec::new("total").predictors(["channel", "quantity"]);
    let model = lm(&spec, &jittered_channel_data()).unwrap();
    let text = model.summary().unwrap().to_string();

    assert!(text.contains("Linear Regression"));
    assert!(text.contains("total ~ channel + quantity"));
    assert!(text.contains("channel[Store]"));
    assert!(text.contains("t-value"));
    assert!(text.contains("Residuals:"));
}

fn jittered_channel_data() -> DataFrame {
    let mut df = channel_data();
    df.mutate("total", |s| {
        let values = s.to_f64_array()?;
        let jitter = [0.1, -0.2, 0.05, 0.0, 0.15, -0.1, -0.05, 0.2, -0.15];
        Ok(Series::float(
            values
                .iter()
                .zip(jitter)
                .map(|(v, j)| v + j)
                .collect::<Vec<f64>>(),
        ))
    })
    .unwrap();
    df
}
