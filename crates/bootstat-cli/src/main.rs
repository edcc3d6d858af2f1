//! bootstat CLI - bootstrap percentile intervals for regression coefficients.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use bootstat_core::data::DataFrame;
use bootstat_core::spec::DesignLayout;
use bootstat_models::bootstrap::{
    Bootstrap, BootstrapReport, CoefficientFitter, GlmFitter, OlsFitter,
};
use bootstat_models::lm::Diagnostics;
use bootstat_models::{GeneralizedLinearModel, MultinomialLogit};

use config::{Config, ModelKind, EXAMPLE_CONFIG};

#[derive(Parser)]
#[command(name = "bootstat")]
#[command(version)]
#[command(about = "Regression fits and bootstrap percentile confidence intervals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "bootstat.toml")]
    config: PathBuf,

    /// Override the data file named in the configuration
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the model coefficients
    Run {
        /// Number of resamples
        #[arg(short = 'B', long)]
        resamples: Option<usize>,

        /// Two-sided miss rate of the intervals
        #[arg(short, long)]
        alpha: Option<f64>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Fit resamples one at a time
        #[arg(long)]
        sequential: bool,

        /// Stop fitting after this many seconds
        #[arg(long)]
        timeout: Option<f64>,

        /// Write the report as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fit the model once and print its summary
    Fit,

    /// Print generalized variance inflation factors of a linear model
    Vif,

    /// Validate the configuration against the dataset
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn load(cli: &Cli) -> Result<(Config, DataFrame)> {
    let mut config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;
    if let Some(path) = &cli.data {
        config.data.path = path.clone();
    }
    config.validate()?;

    let data = config.load_data()?;
    info!(
        rows = data.nrows(),
        columns = data.ncols(),
        path = %config.data.path.display(),
        "loaded dataset"
    );
    Ok((config, data))
}

fn fitter(config: &Config, data: &DataFrame) -> Result<Box<dyn CoefficientFitter>> {
    let spec = &config.model.spec;
    let fitter: Box<dyn CoefficientFitter> = match config.model.kind {
        ModelKind::Linear => Box::new(
            OlsFitter::new(spec, data)?.rank_tolerance(config.linear.rank_tolerance),
        ),
        ModelKind::Logistic | ModelKind::Poisson => {
            let family = config
                .model
                .kind
                .family()
                .context("model kind has no GLM family")?;
            Box::new(GlmFitter::new(spec, data, family)?.config(config.glm.clone())?)
        }
        ModelKind::Multinomial => {
            bail!("bootstrap supports linear, logistic and poisson models, not multinomial")
        }
    };
    Ok(fitter)
}

fn run_bootstrap(config: &Config, data: &DataFrame) -> Result<BootstrapReport> {
    let runner = Bootstrap::new(config.bootstrap.clone(), fitter(config, data)?)?;
    let report = runner.run(data).context("bootstrap run failed")?;
    Ok(report)
}

fn fit(config: &Config, data: &DataFrame) -> Result<()> {
    let spec = config.model.spec.clone();
    match config.model.kind {
        ModelKind::Linear => {
            let model = config.linear_model(data)?.fit()?;
            println!("{}", model.summary()?);
        }
        ModelKind::Logistic | ModelKind::Poisson => {
            let family = config
                .model
                .kind
                .family()
                .context("model kind has no GLM family")?;
            let model = GeneralizedLinearModel::new(spec, family)?
                .data(data)
                .config(config.glm.clone())
                .fit()?;
            println!("{}", model.summary()?);

            println!("Exponentiated coefficients ({}):", family.ratio_name());
            for coef in model.exp_coefficients()? {
                println!(
                    "  {:<30} {:>10.4}  [{:.4}, {:.4}]",
                    coef.name,
                    coef.estimate,
                    coef.ci_lower.unwrap_or(f64::NAN),
                    coef.ci_upper.unwrap_or(f64::NAN)
                );
            }
        }
        ModelKind::Multinomial => {
            let model = MultinomialLogit::new(spec)?
                .data(data)
                .config(config.glm.clone())
                .fit()?;
            println!("{}", model.summary()?);
        }
    }
    Ok(())
}

fn vif(config: &Config, data: &DataFrame) -> Result<()> {
    if config.model.kind != ModelKind::Linear {
        bail!("VIF is computed for linear models, got {}", config.model.kind);
    }

    let model = config.linear_model(data)?.fit()?;
    let vifs = model.vif()?;

    println!(
        "{:<30} {:>4} {:>12} {:>14}",
        "Term", "Df", "GVIF", "GVIF^(1/2Df)"
    );
    for v in &vifs {
        println!(
            "{:<30} {:>4} {:>12.4} {:>14.4}",
            v.term, v.df, v.gvif, v.adjusted
        );
    }

    let layout = model.layout().context("model has no design layout")?;
    let result = model.result().context("model has no result")?;
    let diagnostics = Diagnostics::run_all(result, layout)?;
    info!(
        durbin_watson = diagnostics.durbin_watson.statistic,
        cooks_outliers = diagnostics.cooks_outliers.len(),
        high_leverage = diagnostics.high_leverage.len(),
        "residual diagnostics"
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match &cli.command {
        Commands::Example => {
            println!("{EXAMPLE_CONFIG}");
        }

        Commands::Validate => {
            let (config, data) = load(&cli)?;
            let layout = DesignLayout::new(&config.model.spec, &data)
                .context("model does not fit the dataset")?;

            info!("Configuration is valid");
            info!("  Model: {} ({})", config.model.spec, config.model.kind);
            info!("  Rows: {}", data.nrows());
            info!("  Design columns: {}", layout.column_names().join(", "));
            info!(
                "  Bootstrap: B = {}, alpha = {}, seed = {}",
                config.bootstrap.n_resamples, config.bootstrap.alpha, config.bootstrap.seed
            );
        }

        Commands::Fit => {
            let (config, data) = load(&cli)?;
            fit(&config, &data)?;
        }

        Commands::Vif => {
            let (config, data) = load(&cli)?;
            vif(&config, &data)?;
        }

        Commands::Run {
            resamples,
            alpha,
            seed,
            sequential,
            timeout,
            output,
        } => {
            let (mut config, data) = load(&cli)?;

            // Command-line flags override the [bootstrap] table
            if let Some(b) = resamples {
                config.bootstrap.n_resamples = *b;
            }
            if let Some(a) = alpha {
                config.bootstrap.alpha = *a;
            }
            if let Some(s) = seed {
                config.bootstrap.seed = *s;
            }
            if *sequential {
                config.bootstrap.parallel = false;
            }
            if timeout.is_some() {
                config.bootstrap.timeout_secs = *timeout;
            }
            config.bootstrap.validate()?;

            info!("Model: {} ({})", config.model.spec, config.model.kind);
            let report = run_bootstrap(&config, &data)?;
            println!("{report}");

            if let Some(path) = output {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write report to {:?}", path))?;
                info!("Report written to {:?}", path);
            }
        }
    }

    Ok(())
}
