//! Tests for generalized linear models

use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};

use crate::base::{ModelError, ModelType};
use crate::glm::{Family, GeneralizedLinearModel, GlmConfig, MultinomialLogit};
use bootstat_core::data::{DataFrame, Series};
use bootstat_core::spec::ModelSpec;

// ==================== Test Fixtures ====================

fn sigmoid(eta: f64) -> f64 {
    1.0 / (1.0 + (-eta).exp())
}

/// Member purchases: P(member) = sigmoid(-0.5 + 1.2 * spend)
fn member_data(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();

    let spend: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();
    let member: Vec<bool> = spend
        .iter()
        .map(|&s| rng.random::<f64>() < sigmoid(-0.5 + 1.2 * s))
        .collect();

    DataFrame::from_columns(vec![
        ("spend", Series::float(spend)),
        ("member", Series::bool(member)),
    ])
    .unwrap()
}

/// Item counts: quantity ~ Poisson(exp(0.3 + 0.5 * spend))
fn quantity_data(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();

    let spend: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();
    let quantity: Vec<i64> = spend
        .iter()
        .map(|&s| {
            let lambda = (0.3 + 0.5 * s).exp();
            Poisson::new(lambda).unwrap().sample(&mut rng) as i64
        })
        .collect();

    DataFrame::from_columns(vec![
        ("spend", Series::float(spend)),
        ("quantity", Series::int(quantity)),
    ])
    .unwrap()
}

/// Payment method by spend: Card is the baseline,
/// log(P(Cash)/P(Card)) = 0.5 + 1.0 * spend, log(P(Mobile)/P(Card)) = -0.5 - 1.0 * spend
fn payment_data(n: usize, seed: u64) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();

    let spend: Vec<f64> = (0..n).map(|_| normal.sample(&mut rng)).collect();
    let payment: Vec<&str> = spend
        .iter()
        .map(|&s| {
            let cash = (0.5 + s).exp();
            let mobile = (-0.5 - s).exp();
            let total = 1.0 + cash + mobile;
            let u = rng.random::<f64>() * total;
            if u < 1.0 {
                "Card"
            } else if u < 1.0 + cash {
                "Cash"
            } else {
                "Mobile"
            }
        })
        .collect();

    DataFrame::from_columns(vec![
        ("spend", Series::float(spend)),
        ("payment", Series::categorical(&payment)),
    ])
    .unwrap()
}

/// X'(y - mu), zero at the maximum likelihood estimate
fn score(model: &GeneralizedLinearModel, df: &DataFrame) -> Array1<f64> {
    let x = model.layout().unwrap().design_matrix(df).unwrap();
    let result = model.result().unwrap();
    x.t().dot(&(&result.y - &result.fitted_values))
}

// ==================== Logistic Regression ====================

#[test]
fn test_logistic_recovers_coefficients() {
    let df = member_data(2000, 11);
    let model = GeneralizedLinearModel::logistic(ModelSpec::new("member").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let coeffs = model.coefficients().unwrap();
    assert_abs_diff_eq!(coeffs[0], -0.5, epsilon = 0.25);
    assert_abs_diff_eq!(coeffs[1], 1.2, epsilon = 0.25);

    let result = model.result().unwrap();
    assert!(result.model_statistics.converged.unwrap());
    assert!(result.deviance() < result.model_statistics.null_deviance.unwrap());
    assert!(result.p_values[1] < 1e-6);
}

#[test]
fn test_logistic_solves_score_equations() {
    let df = member_data(300, 5);
    let model = GeneralizedLinearModel::logistic(ModelSpec::new("member").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    for s in score(&model, &df).iter() {
        assert_abs_diff_eq!(*s, 0.0, epsilon = 1e-3);
    }
}

#[test]
fn test_odds_ratios_are_exponentiated() {
    let df = member_data(500, 3);
    let model = GeneralizedLinearModel::logistic(ModelSpec::new("member").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let result = model.result().unwrap();
    let odds = model.exp_coefficients().unwrap();
    assert_eq!(odds.len(), 2);
    for (i, or) in odds.iter().enumerate() {
        assert_relative_eq!(or.estimate, result.coefficients[i].exp(), epsilon = 1e-12);
        assert_relative_eq!(or.ci_lower.unwrap(), result.ci_lower[i].exp(), epsilon = 1e-12);
    }
    assert!(odds[1].estimate > 1.0);
}

#[test]
fn test_categorical_binomial_response() {
    let df = member_data(400, 8);
    let labels: Vec<&str> = match df.column("member").unwrap() {
        Series::Bool(values) => values.iter().map(|&m| if m { "Yes" } else { "No" }).collect(),
        _ => unreachable!(),
    };
    let relabeled = df
        .clone()
        .with_column("status", Series::categorical(&labels))
        .unwrap();

    let numeric = GeneralizedLinearModel::logistic(ModelSpec::new("member").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();
    let categorical =
        GeneralizedLinearModel::logistic(ModelSpec::new("status").predictor("spend"))
            .unwrap()
            .data(&relabeled)
            .fit()
            .unwrap();

    let a = numeric.coefficients().unwrap();
    let b = categorical.coefficients().unwrap();
    for i in 0..2 {
        assert_abs_diff_eq!(a[i], b[i], epsilon = 1e-10);
    }
}

#[test]
fn test_binomial_response_out_of_range() {
    let df = DataFrame::from_columns(vec![
        ("x", Series::float(vec![1.0, 2.0, 3.0, 4.0, 5.0])),
        ("y", Series::float(vec![0.0, 1.0, 2.0, 1.0, 0.0])),
    ])
    .unwrap();

    let result = GeneralizedLinearModel::logistic(ModelSpec::new("y").predictor("x"))
        .unwrap()
        .data(&df)
        .fit();
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn test_logistic_collinear_is_degenerate() {
    let df = member_data(100, 2);
    let spend = df.column("spend").unwrap().to_f64_array().unwrap();
    let df = df
        .with_column("double_spend", Series::float(&spend * 2.0))
        .unwrap();

    let result = GeneralizedLinearModel::logistic(
        ModelSpec::new("member").predictors(["spend", "double_spend"]),
    )
    .unwrap()
    .data(&df)
    .fit();

    match result {
        Err(ModelError::DegenerateFit { terms }) => assert_eq!(terms, vec!["double_spend"]),
        other => panic!("expected DegenerateFit, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_logistic_summary_uses_z_values() {
    let df = member_data(200, 4);
    let model = GeneralizedLinearModel::logistic(ModelSpec::new("member").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let summary = model.summary().unwrap();
    assert_eq!(summary.model_type, ModelType::LogisticRegression);
    assert_eq!(summary.formula, "member ~ spend");
    assert!(summary.to_string().contains("z-value"));
}

// ==================== Poisson Regression ====================

#[test]
fn test_poisson_recovers_coefficients() {
    let df = quantity_data(2000, 21);
    let model = GeneralizedLinearModel::poisson(ModelSpec::new("quantity").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let coeffs = model.coefficients().unwrap();
    assert_abs_diff_eq!(coeffs[0], 0.3, epsilon = 0.1);
    assert_abs_diff_eq!(coeffs[1], 0.5, epsilon = 0.1);

    // With an intercept the fitted means reproduce the total count
    let result = model.result().unwrap();
    assert_relative_eq!(result.fitted_values.sum(), result.y.sum(), epsilon = 1e-6);
}

#[test]
fn test_poisson_predict_is_rate() {
    let df = quantity_data(500, 9);
    let model = GeneralizedLinearModel::poisson(ModelSpec::new("quantity").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let new_data = DataFrame::from_columns(vec![("spend", Series::float(vec![0.0, 1.0]))]).unwrap();
    let rates = model.predict(&new_data).unwrap();
    let coeffs = model.coefficients().unwrap();
    assert_relative_eq!(rates[0], coeffs[0].exp(), epsilon = 1e-12);
    assert_relative_eq!(rates[1] / rates[0], coeffs[1].exp(), epsilon = 1e-10);
}

#[test]
fn test_poisson_rejects_negative_counts() {
    let df = DataFrame::from_columns(vec![
        ("x", Series::float(vec![1.0, 2.0, 3.0, 4.0])),
        ("y", Series::int(vec![1, -1, 2, 0])),
    ])
    .unwrap();

    let result = GeneralizedLinearModel::poisson(ModelSpec::new("y").predictor("x"))
        .unwrap()
        .data(&df)
        .fit();
    assert!(matches!(result, Err(ModelError::InvalidArgument(_))));
}

#[test]
fn test_not_converged_with_one_iteration() {
    let df = quantity_data(200, 1);
    let config = GlmConfig {
        max_iter: 1,
        ..GlmConfig::default()
    };
    let result = GeneralizedLinearModel::poisson(ModelSpec::new("quantity").predictor("spend"))
        .unwrap()
        .data(&df)
        .config(config)
        .fit();
    assert!(matches!(result, Err(ModelError::NotConverged { max_iter: 1 })));
}

#[test]
fn test_unfitted_glm() {
    let model =
        GeneralizedLinearModel::poisson(ModelSpec::new("quantity").predictor("spend")).unwrap();
    assert!(!model.is_fitted());
    assert!(matches!(model.summary(), Err(ModelError::NotFitted)));
}

#[test]
fn test_family_from_str() {
    assert_eq!("logit".parse::<Family>().unwrap(), Family::Binomial);
    assert_eq!("Binomial".parse::<Family>().unwrap(), Family::Binomial);
    assert_eq!("poisson".parse::<Family>().unwrap(), Family::Poisson);
    assert!("gamma".parse::<Family>().is_err());
}

// ==================== Multinomial Logit ====================

#[test]
fn test_multinomial_recovers_coefficients() {
    let df = payment_data(3000, 17);
    let model = MultinomialLogit::new(ModelSpec::new("payment").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let result = model.result().unwrap();
    assert_eq!(result.baseline(), "Card");
    assert_eq!(result.coefficients.dim(), (2, 2));
    assert_abs_diff_eq!(result.coefficients[(0, 0)], 0.5, epsilon = 0.25);
    assert_abs_diff_eq!(result.coefficients[(0, 1)], 1.0, epsilon = 0.25);
    assert_abs_diff_eq!(result.coefficients[(1, 0)], -0.5, epsilon = 0.25);
    assert_abs_diff_eq!(result.coefficients[(1, 1)], -1.0, epsilon = 0.25);

    let names: Vec<String> = result.to_coefficients().into_iter().map(|c| c.name).collect();
    assert_eq!(
        names,
        vec!["Cash/(Intercept)", "Cash/spend", "Mobile/(Intercept)", "Mobile/spend"]
    );
}

#[test]
fn test_multinomial_fitted_counts_match_observed() {
    let df = payment_data(500, 6);
    let model = MultinomialLogit::new(ModelSpec::new("payment").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let result = model.result().unwrap();
    let observed = df.column("payment").unwrap().level_counts().unwrap();
    let fitted = result.fitted_probabilities.sum_axis(ndarray::Axis(0));
    for (o, f) in observed.iter().zip(fitted.iter()) {
        assert_abs_diff_eq!(*o as f64, *f, epsilon = 1e-3);
    }

    let stats = result.model_statistics;
    assert!(stats.log_likelihood.unwrap() > -stats.null_deviance.unwrap() / 2.0);
    assert_eq!(stats.df_residual, Some(500 - 4));
}

#[test]
fn test_multinomial_probabilities_sum_to_one() {
    let df = payment_data(400, 12);
    let model = MultinomialLogit::new(ModelSpec::new("payment").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let new_data =
        DataFrame::from_columns(vec![("spend", Series::float(vec![-2.0, 0.0, 2.0]))]).unwrap();
    let proba = model.predict_proba(&new_data).unwrap();
    assert_eq!(proba.dim(), (3, 3));
    for row in proba.rows() {
        assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
    }

    let classes = model.predict(&new_data).unwrap();
    assert_eq!(classes[0], "Mobile");
    assert_eq!(classes[2], "Cash");
}

#[test]
fn test_multinomial_rejects_float_response() {
    let df = member_data(50, 1);
    let result = MultinomialLogit::new(ModelSpec::new("spend").predictor("member"))
        .unwrap()
        .data(&df)
        .fit();
    assert!(result.is_err());
}

#[test]
fn test_multinomial_summary() {
    let df = payment_data(300, 30);
    let model = MultinomialLogit::new(ModelSpec::new("payment").predictor("spend"))
        .unwrap()
        .data(&df)
        .fit()
        .unwrap();

    let summary = model.summary().unwrap();
    assert_eq!(summary.model_type, ModelType::MultinomialLogit);
    assert_eq!(summary.coefficients.len(), 4);
    assert!(summary.coefficients[0].is_intercept);

    let ratios = model.result().unwrap().relative_risk_ratios();
    assert_relative_eq!(
        ratios[1].estimate,
        summary.coefficients[1].estimate.exp(),
        epsilon = 1e-12
    );
}
