//! Run configuration loaded from a TOML file

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use bootstat_core::data::{read_csv, CsvOptions, DataFrame};
use bootstat_core::spec::ModelSpec;
use bootstat_models::bootstrap::BootstrapConfig;
use bootstat_models::{Family, GlmConfig, LinearConfig, LinearRegression};

/// Model family selected in the `[model]` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Linear,
    Logistic,
    Poisson,
    Multinomial,
}

impl ModelKind {
    /// GLM family, for the kinds fitted by IRLS
    pub fn family(&self) -> Option<Family> {
        match self {
            ModelKind::Logistic => Some(Family::Binomial),
            ModelKind::Poisson => Some(Family::Poisson),
            ModelKind::Linear | ModelKind::Multinomial => None,
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Linear => "linear",
            ModelKind::Logistic => "logistic",
            ModelKind::Poisson => "poisson",
            ModelKind::Multinomial => "multinomial",
        };
        write!(f, "{}", name)
    }
}

/// `[data]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSection {
    /// Delimited input file, relative to the config file
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
    /// Columns loaded as categorical
    #[serde(default)]
    pub categorical: Vec<String>,
    /// Drop rows with missing values in these columns before fitting
    #[serde(default)]
    pub drop_missing: Vec<String>,
}

fn default_delimiter() -> char {
    ','
}

fn default_has_headers() -> bool {
    true
}

/// `[model]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSection {
    #[serde(default)]
    pub kind: ModelKind,
    #[serde(flatten)]
    pub spec: ModelSpec,
}

/// Whole configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataSection,
    pub model: ModelSection,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub linear: LinearConfig,
    #[serde(default)]
    pub glm: GlmConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        if config.data.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.data.path = dir.join(&config.data.path);
            }
        }
        Ok(config)
    }

    /// Check every section on its own, before any data is read
    pub fn validate(&self) -> Result<()> {
        if !self.data.delimiter.is_ascii() {
            bail!("delimiter must be an ASCII character, got {:?}", self.data.delimiter);
        }
        self.model.spec.validate().context("invalid [model] table")?;
        self.bootstrap.validate().context("invalid [bootstrap] table")?;
        self.linear.validate().context("invalid [linear] table")?;
        self.glm.validate().context("invalid [glm] table")?;
        Ok(())
    }

    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.data.delimiter as u8,
            has_headers: self.data.has_headers,
            categorical: self.data.categorical.clone(),
        }
    }

    /// Load and clean the dataset named by the `[data]` table
    pub fn load_data(&self) -> Result<DataFrame> {
        let df = read_csv(&self.data.path, &self.csv_options())
            .with_context(|| format!("failed to load {}", self.data.path.display()))?;

        if self.data.drop_missing.is_empty() {
            return Ok(df);
        }
        let (cleaned, _) = df
            .drop_missing(&self.data.drop_missing)
            .context("failed to drop rows with missing values")?;
        Ok(cleaned)
    }

    /// Linear model over `data` using the `[model]` and `[linear]` tables
    pub fn linear_model(&self, data: &DataFrame) -> Result<LinearRegression> {
        Ok(LinearRegression::new(self.model.spec.clone())?
            .data(data)
            .config(self.linear.clone()))
    }
}

pub const EXAMPLE_CONFIG: &str = r#"# bootstat configuration file

[data]
path = "transactions.csv"
delimiter = ","
categorical = ["region", "payment_method"]
drop_missing = ["total_amount"]

[model]
# linear, logistic, poisson or multinomial
kind = "linear"
response = "total_amount"
predictors = ["quantity", "region"]
interactions = [["quantity", "region"]]
intercept = true

[bootstrap]
n_resamples = 2000
alpha = 0.05
seed = 42
min_valid_samples = 30
parallel = true
# timeout_secs = 60.0

[linear]
# Standard, HC0, HC1 or HC3
se_type = "Standard"
confidence_level = 0.95

[glm]
max_iter = 25
tolerance = 1e-8
"#;
