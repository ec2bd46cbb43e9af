use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use people_analytics_turnover::config::{self, ClassifierConfig, Config, TurnoverConfig};
use people_analytics_turnover::metrics::NumericPolicy;
use people_analytics_turnover::models::Selection;
use people_analytics_turnover::pipeline;
use people_analytics_turnover::thresholds::StrategyKind;

#[derive(Parser)]
#[command(name = "turnover-kpis")]
#[command(about = "Monthly turnover KPIs and classifier threshold reports", long_about = None)]
struct Cli {
    /// Path to a turnover.toml (defaults to ./turnover.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute turnover KPIs from a monthly series and write tables and a report
    Analyze {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        outdir: PathBuf,
        #[command(flatten)]
        turnover: TurnoverArgs,
    },
    /// Sweep classifier thresholds over a prediction batch and write the evaluation
    Evaluate {
        #[arg(long)]
        preds: PathBuf,
        #[arg(long)]
        outdir: PathBuf,
        #[command(flatten)]
        classifier: ClassifierArgs,
    },
    /// Run the turnover analysis and then the classifier evaluation
    All {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        preds: PathBuf,
        #[arg(long)]
        outdir: PathBuf,
        #[command(flatten)]
        turnover: TurnoverArgs,
        #[command(flatten)]
        classifier: ClassifierArgs,
    },
}

#[derive(Args)]
struct TurnoverArgs {
    /// Abort on zero headcount instead of emitting inf/NaN for that month
    #[arg(long)]
    strict: bool,
    /// |z| at or above which a month is listed as an anomaly
    #[arg(long)]
    anomaly_z: Option<f64>,
}

impl TurnoverArgs {
    fn apply(&self, mut config: TurnoverConfig) -> TurnoverConfig {
        if self.strict {
            config.numeric_policy = NumericPolicy::Strict;
        }
        if let Some(z) = self.anomaly_z {
            config.anomaly_z = z;
        }
        config
    }
}

#[derive(Args)]
struct ClassifierArgs {
    #[arg(long, value_enum)]
    strategy: Option<StrategyKind>,
    /// Fraction of the batch kept by the topk strategy
    #[arg(long)]
    k_top: Option<f64>,
}

impl ClassifierArgs {
    fn apply(&self, mut config: ClassifierConfig) -> ClassifierConfig {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(k_top) = self.k_top {
            config.k_top = k_top;
        }
        config
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let Config {
        turnover: turnover_config,
        classifier: classifier_config,
    } = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            input,
            outdir,
            turnover,
        } => {
            let summary = pipeline::analyze(&input, &outdir, &turnover.apply(turnover_config))?;
            println!(
                "Analyzed {} months ({} anomalies). Outputs in {}.",
                summary.months,
                summary.anomalies,
                outdir.display()
            );
        }
        Commands::Evaluate {
            preds,
            outdir,
            classifier,
        } => {
            let selection =
                pipeline::evaluate(&preds, &outdir, &classifier.apply(classifier_config))?;
            print_selection(&selection);
        }
        Commands::All {
            input,
            preds,
            outdir,
            turnover,
            classifier,
        } => {
            let summary = pipeline::analyze(&input, &outdir, &turnover.apply(turnover_config))
                .context("turnover analysis failed")?;
            println!(
                "Analyzed {} months ({} anomalies).",
                summary.months, summary.anomalies
            );
            let selection =
                pipeline::evaluate(&preds, &outdir, &classifier.apply(classifier_config))
                    .context("classifier evaluation failed after turnover outputs were written")?;
            print_selection(&selection);
            println!("Outputs in {}.", outdir.display());
        }
    }

    Ok(())
}

fn print_selection(selection: &Selection) {
    let point = &selection.point;
    println!(
        "{} threshold {:.4}: precision {:.4}, recall {:.4}, f1 {:.4} (TP={} FP={} TN={} FN={})",
        selection.strategy,
        point.threshold,
        point.precision,
        point.recall,
        point.f1,
        point.tp,
        point.fp,
        point.tn,
        point.fn_
    );
}
