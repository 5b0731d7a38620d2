use anyhow::Context;
use clap::{Parser, Subcommand};
use fast_outlier_engine::cleaning::{drop_missing, fill_missing_median, normalize_data};
use fast_outlier_engine::insight_core::{
    add_return_features, train_baseline, write_evaluation_report, BaselineModel,
};
use fast_outlier_engine::storage::{read_dataset, write_dataset};
use fast_outlier_engine::synthetic::synthetic_dataset;
use fast_outlier_engine::{
    Dataset, OutlierEngine, PipelineConfig, RemovalRule, SensitivityReport, Statistics, Summary,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fast-outlier-engine")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Detect, remove and winsorize outliers in tabular data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root of the raw/interim/processed layout
    #[arg(long, env = "DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Raw dataset (generated when missing)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Cleaned input for the outliers stage
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Flagged input for the sensitivity stage
    #[arg(long, global = true)]
    flagged: Option<PathBuf>,

    /// Target numeric column
    #[arg(long, global = true)]
    target: Option<String>,

    /// Regression predictor column
    #[arg(long, global = true)]
    predictor: Option<String>,

    /// IQR fence multiplier
    #[arg(long, global = true)]
    k: Option<f64>,

    /// Z-score threshold
    #[arg(long, global = true)]
    z: Option<f64>,

    /// Lower winsorization quantile
    #[arg(long, global = true)]
    lower: Option<f64>,

    /// Upper winsorization quantile
    #[arg(long, global = true)]
    upper: Option<f64>,

    /// Removal rule: any or all
    #[arg(long, global = true)]
    how: Option<RemovalRule>,

    /// Seed for the synthetic dataset
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill, drop and scale missing data
    Preprocess,

    /// Flag, remove and winsorize outliers of the target column
    Outliers,

    /// Compare summaries and regressions across outlier strategies
    Sensitivity,

    /// Add return and rolling features from a price column
    Features {
        /// Price column
        #[arg(long, default_value = "close")]
        close: String,

        /// Output path (defaults to processed/features.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Fit the next-day return baseline and write its evaluation report
    Model {
        /// Report path (defaults to processed/model_evaluation.md)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run preprocess, outliers and sensitivity (default)
    All,
}

impl Cli {
    /// File and environment config with command-line overrides applied
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::load(self.config.as_deref())
            .with_context(|| format!("failed to load config {:?}", self.config))?;

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(data) = &self.data {
            config.data = Some(data.clone());
        }
        if let Some(target) = &self.target {
            config.target = Some(target.clone());
        }
        if let Some(predictor) = &self.predictor {
            config.predictor = predictor.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        let outliers = &mut config.outliers;
        outliers.k = self.k.unwrap_or(outliers.k);
        outliers.threshold = self.z.unwrap_or(outliers.threshold);
        outliers.lower = self.lower.unwrap_or(outliers.lower);
        outliers.upper = self.upper.unwrap_or(outliers.upper);
        outliers.how = self.how.unwrap_or(outliers.how);

        Ok(config)
    }
}

#[derive(Clone)]
struct Pipeline {
    config: PipelineConfig,
    engine: OutlierEngine,
    input: Option<PathBuf>,
    flagged: Option<PathBuf>,
}

fn load(path: &Path) -> anyhow::Result<Dataset> {
    read_dataset(path).with_context(|| format!("failed to read {}", path.display()))
}

fn save(dataset: &Dataset, path: &Path) -> anyhow::Result<()> {
    write_dataset(dataset, path).with_context(|| format!("failed to write {}", path.display()))
}

impl Pipeline {
    fn preprocess(&self) -> anyhow::Result<PathBuf> {
        info!("running preprocess");
        let raw_path = self.config.raw_path();

        let raw = if raw_path.exists() {
            load(&raw_path)?
        } else {
            let generated = synthetic_dataset(self.config.seed)?;
            save(&generated, &raw_path)?;
            println!("[preprocess] Generated synthetic dataset -> {}", raw_path.display());
            generated
        };

        let numeric = raw.numeric_column_names();
        let filled = fill_missing_median(&raw, &numeric)?;
        let dropped = drop_missing(&filled, 0.5)?;
        let scale = &numeric[..numeric.len().min(2)];
        let cleaned = normalize_data(&dropped, scale)?;

        let cleaned_path = self.config.cleaned_path();
        save(&cleaned, &cleaned_path)?;
        println!("[preprocess] Cleaned data saved -> {}", cleaned_path.display());
        print_stats(&Statistics::describe(&cleaned));
        Ok(cleaned_path)
    }

    fn outliers(&self) -> anyhow::Result<PathBuf> {
        info!("running outliers");
        let mut src = self
            .input
            .clone()
            .unwrap_or_else(|| self.config.cleaned_path());
        if !src.exists() {
            warn!(path = %src.display(), "no cleaned input found, running preprocess first");
            src = self.preprocess()?;
        }

        let dataset = load(&src)?;
        let target = OutlierEngine::resolve_target(&dataset, self.config.target.as_deref())?;
        let artifacts = self.engine.process(&dataset, &target)?;

        let outputs = [
            ("Flagged data", &artifacts.flagged, self.config.flagged_path()),
            ("Data with outliers removed", &artifacts.removed, self.config.removed_path()),
            ("Winsorized data", &artifacts.winsorized, self.config.winsorized_path()),
        ];
        for (label, dataset, path) in &outputs {
            save(dataset, path)?;
            println!("[outliers] {} saved -> {}", label, path.display());
        }

        Ok(self.config.flagged_path())
    }

    fn sensitivity(&self) -> anyhow::Result<SensitivityReport> {
        info!("running sensitivity");
        let mut src = self
            .flagged
            .clone()
            .unwrap_or_else(|| self.config.flagged_path());
        if !src.exists() {
            warn!(path = %src.display(), "no flagged dataset found, running outliers first");
            src = self.outliers()?;
        }

        let dataset = load(&src)?;
        let target = OutlierEngine::resolve_target(&dataset, self.config.target.as_deref())?;
        let report = self
            .engine
            .sensitivity(&dataset, &target, &self.config.predictor)?;

        let interim = self.config.interim_dir();
        let written = report
            .write_artifacts(&interim)
            .with_context(|| format!("failed to write reports under {}", interim.display()))?;

        print_report(&report);
        for path in &written {
            println!("[sensitivity] Saved -> {}", path.display());
        }
        Ok(report)
    }

    fn features(&self, close: &str, output: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        info!(column = close, "running features");
        let src = self.input.clone().unwrap_or_else(|| self.config.raw_path());
        let dataset = load(&src)?;
        let enriched = add_return_features(&dataset, close)?;

        let out = output.unwrap_or_else(|| self.config.features_path());
        save(&enriched, &out)?;
        println!("[features] Features saved -> {}", out.display());
        Ok(out)
    }

    fn model(&self, report: Option<PathBuf>) -> anyhow::Result<BaselineModel> {
        info!("running model");
        let mut src = self
            .input
            .clone()
            .unwrap_or_else(|| self.config.features_path());
        if !src.exists() {
            warn!(path = %src.display(), "no feature dataset found, running features first");
            let features = Pipeline {
                input: None,
                ..self.clone()
            };
            src = features.features("close", None)?;
        }

        let dataset = load(&src)?;
        let model = train_baseline(&dataset)
            .with_context(|| format!("failed to train baseline on {}", src.display()))?;

        let out = report.unwrap_or_else(|| self.config.evaluation_path());
        write_evaluation_report(&model, &out)
            .with_context(|| format!("failed to write {}", out.display()))?;

        println!(
            "[model] Features: {} | train={} test={}",
            model.features.join(", "),
            model.n_train,
            model.n_test
        );
        println!(
            "[model] Test R2={:.4} RMSE={:.6} MAE={:.6}",
            model.metrics.r2, model.metrics.rmse, model.metrics.mae
        );
        println!("[model] Evaluation report saved -> {}", out.display());
        Ok(model)
    }
}

fn print_stats(stats: &[Statistics]) {
    println!(
        "{:<20}{:>8}{:>8}{:>14}{:>14}{:>14}{:>14}{:>14}",
        "column", "count", "missing", "mean", "median", "std", "min", "max"
    );
    for s in stats {
        println!(
            "{:<20}{:>8}{:>8}{:>14.4}{:>14.4}{:>14}{:>14.4}{:>14.4}",
            s.field,
            s.count,
            s.missing,
            s.mean,
            s.median,
            fmt_value(s.std),
            s.min,
            s.max
        );
    }
}

fn fmt_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string())
}

fn print_report(report: &SensitivityReport) {
    println!("\n=== Sensitivity for '{}' ===", report.target);
    println!(
        "Flagged: IQR={:.2}%, Z-score={:.2}%",
        report.pct_flagged_iqr, report.pct_flagged_z
    );

    let rows: [(&str, &Summary); 3] = [
        ("all", &report.all),
        ("filtered_iqr", &report.filtered_iqr),
        ("winsorized", &report.winsorized),
    ];
    println!("{:<14}{:>12}{:>12}{:>12}", "", "mean", "median", "std");
    for (label, summary) in rows {
        println!(
            "{:<14}{:>12}{:>12}{:>12}",
            label,
            fmt_value(summary.mean),
            fmt_value(summary.median),
            fmt_value(summary.std)
        );
    }

    match &report.regression {
        Some(regression) => {
            for (label, fit) in [("all", &regression.all), ("filtered_iqr", &regression.filtered_iqr)] {
                match fit {
                    Some(fit) => println!(
                        "Regression {:<13} slope={:.4} intercept={:.4} r2={:.4} mae={:.4}",
                        label, fit.slope, fit.intercept, fit.r2, fit.mae
                    ),
                    None => println!("Regression {:<13} skipped", label),
                }
            }
        }
        None => println!("No numeric predictor column; skipped regression comparison"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.pipeline_config()?;
    let pipeline = Pipeline {
        engine: OutlierEngine::new(config.outliers.clone()),
        config,
        input: cli.input.clone(),
        flagged: cli.flagged.clone(),
    };

    match cli.command.unwrap_or(Commands::All) {
        Commands::Preprocess => {
            pipeline.preprocess()?;
        }
        Commands::Outliers => {
            pipeline.outliers()?;
        }
        Commands::Sensitivity => {
            pipeline.sensitivity()?;
        }
        Commands::Features { close, output } => {
            pipeline.features(&close, output)?;
        }
        Commands::Model { report } => {
            pipeline.model(report)?;
        }
        Commands::All => {
            let cleaned = pipeline.preprocess()?;
            let pipeline = Pipeline {
                input: Some(cleaned),
                ..pipeline
            };
            pipeline.outliers()?;
            pipeline.sensitivity()?;
        }
    }

    println!("\nPipeline step(s) completed successfully");
    Ok(())
}
