//! Needle SOD CLI - subspace outlier detection from the command line

use clap::{Args, Parser, Subcommand};
use needle_sod::{
    DistanceFunction, FeatureMatrix, ProbabilityMethod, Result, Sod, SodConfig,
};
use serde::Serialize;
use serde_json::json;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "needle-sod")]
#[command(author, version, about = "Subspace outlier detection for numeric feature matrices", long_about = None)]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the outlier score of every row
    Score(DetectorArgs),

    /// Fit the detector and print threshold, scores, labels and outliers
    Detect {
        #[command(flatten)]
        args: DetectorArgs,

        /// Also print outlier probabilities (linear or unify)
        #[arg(long)]
        proba: Option<ProbabilityMethod>,
    },

    /// Print each row's score with its relevant subspace
    Explain(DetectorArgs),
}

#[derive(Args)]
struct DetectorArgs {
    /// JSON feature matrix ([[f64, ...], ...]); '-' reads stdin
    input: String,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Neighbors per point
    #[arg(short = 'k', long)]
    n_neighbors: Option<usize>,

    /// Reference set size
    #[arg(short, long)]
    ref_set: Option<usize>,

    /// Variance fraction for relevant dimensions
    #[arg(short, long)]
    alpha: Option<f64>,

    /// Expected outlier share
    #[arg(short, long)]
    contamination: Option<f64>,

    /// Distance function (euclidean, sqeuclidean, manhattan, chebyshev, cosine)
    #[arg(short, long)]
    distance: Option<DistanceFunction>,
}

impl DetectorArgs {
    fn detector(&self) -> Result<Sod> {
        // Validation happens once, after flags are applied
        let mut config: SodConfig = match &self.config {
            Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
            None => SodConfig::default(),
        };
        if let Some(n_neighbors) = self.n_neighbors {
            config.n_neighbors = n_neighbors;
        }
        if let Some(ref_set) = self.ref_set {
            config.ref_set = ref_set;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(contamination) = self.contamination {
            config.contamination = contamination;
        }
        if let Some(distance) = self.distance {
            config.distance = distance;
        }
        Sod::new(config)
    }

    fn matrix(&self) -> Result<FeatureMatrix> {
        let json = if self.input == "-" {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(&self.input)?
        };
        let rows: Vec<Vec<f64>> = serde_json::from_str(&json)?;
        FeatureMatrix::from_rows(&rows)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let pretty = cli.pretty;

    let result = match cli.command {
        Commands::Score(args) => score_command(&args, pretty),
        Commands::Detect { args, proba } => detect_command(&args, proba, pretty),
        Commands::Explain(args) => explain_command(&args, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_with_hints());
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

fn score_command(args: &DetectorArgs, pretty: bool) -> Result<()> {
    let sod = args.detector()?;
    let x = args.matrix()?;
    print_json(&sod.score(&x)?, pretty)
}

fn detect_command(args: &DetectorArgs, proba: Option<ProbabilityMethod>, pretty: bool) -> Result<()> {
    let mut sod = args.detector()?;
    let x = args.matrix()?;
    sod.fit(&x)?;

    let mut report = json!({
        "threshold": sod.threshold()?,
        "scores": sod.decision_scores()?,
        "labels": sod.labels()?,
        "outliers": sod.find_outliers()?,
    });
    if let Some(method) = proba {
        report["probabilities"] = json!(sod.predict_proba(&x, method)?);
    }
    print_json(&report, pretty)
}

fn explain_command(args: &DetectorArgs, pretty: bool) -> Result<()> {
    let sod = args.detector()?;
    let x = args.matrix()?;
    print_json(&sod.explain(&x)?, pretty)
}
