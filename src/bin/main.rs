//! pdkernel Command Line Interface
//!
//! Distances, Gram matrices, kernel PCA and kernel k-means on persistence
//! diagrams stored as CSV (`diagram,dimension,birth,death`).

use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use pdkernel::api;
use pdkernel::core::{KernelParams, PdkError, Result};
use pdkernel::data::DiagramCsv;
use pdkernel::distance::Metric;
use pdkernel::persistence::SavedModel;
use pdkernel::utils::validation::whole_number;
use pdkernel::{KernelKMeans, KernelPCA};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "pdkernel")]
#[command(about = "Kernel methods for persistence diagrams")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Distance between two diagrams, or the full distance matrix
    Distance(DistanceArgs),
    /// Fisher-kernel Gram matrix
    Gram(GramArgs),
    /// Kernel PCA
    Kpca {
        #[command(subcommand)]
        operation: KpcaOperation,
    },
    /// Kernel k-means
    Kkmeans {
        #[command(subcommand)]
        operation: KkmeansOperation,
    },
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct KernelArgs {
    /// Homological dimension
    #[arg(long, default_value = "0")]
    dim: f64,

    /// Gaussian bandwidth of the Fisher distance
    #[arg(long, default_value = "1.0")]
    sigma: f64,

    /// Decay of the Fisher kernel
    #[arg(long, default_value = "1.0")]
    t: f64,

    /// Worker count (default: available execution units - 1)
    #[arg(long)]
    workers: Option<f64>,
}

impl KernelArgs {
    fn params(&self) -> Result<KernelParams> {
        let params = KernelParams::new(whole_number("dim", self.dim)?, self.sigma, self.t);
        params.validate()?;
        Ok(params)
    }

    fn workers(&self) -> Result<Option<usize>> {
        parse_workers(self.workers)
    }
}

#[derive(Args)]
struct DistanceArgs {
    /// Diagram CSV file
    #[arg(long)]
    diagrams: PathBuf,

    /// Id of the first diagram
    #[arg(long, requires = "second")]
    first: Option<String>,

    /// Id of the second diagram
    #[arg(long, requires = "first")]
    second: Option<String>,

    /// Homological dimension
    #[arg(long, default_value = "0")]
    dim: f64,

    /// Metric: wasserstein or fisher
    #[arg(long, default_value = "wasserstein")]
    metric: String,

    /// Wasserstein order (inf for bottleneck)
    #[arg(long, default_value = "2")]
    p: f64,

    /// Gaussian bandwidth of the Fisher distance
    #[arg(long, default_value = "1.0")]
    sigma: f64,

    /// Worker count for the distance matrix
    #[arg(long)]
    workers: Option<f64>,

    /// Output file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct GramArgs {
    /// Diagram CSV file
    #[arg(long)]
    diagrams: PathBuf,

    /// Second collection; rows of the cross matrix
    #[arg(long)]
    other: Option<PathBuf>,

    #[command(flatten)]
    kernel: KernelArgs,

    /// Output file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum KpcaOperation {
    /// Fit an embedding and save the model
    Fit {
        /// Training diagram CSV file
        #[arg(long)]
        diagrams: PathBuf,
        /// Number of components
        #[arg(short = 'k', long)]
        components: usize,
        #[command(flatten)]
        kernel: KernelArgs,
        /// Output model file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Project new diagrams with a saved model
    Project {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,
        /// Diagram CSV file
        #[arg(long)]
        diagrams: PathBuf,
        #[arg(long)]
        workers: Option<f64>,
        /// Output file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum KkmeansOperation {
    /// Cluster diagrams and save the model
    Fit {
        /// Training diagram CSV file
        #[arg(long)]
        diagrams: PathBuf,
        /// Number of clusters
        #[arg(short = 'k', long)]
        clusters: usize,
        #[command(flatten)]
        kernel: KernelArgs,
        /// Maximum iterations
        #[arg(long, default_value = "100")]
        max_iterations: usize,
        /// Seed of the initial centre selection
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Output model file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Assign new diagrams to the clusters of a saved model
    Assign {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,
        /// Diagram CSV file
        #[arg(long)]
        diagrams: PathBuf,
        #[arg(long)]
        workers: Option<f64>,
        /// Output file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Distance(args) => distance_command(args),
        Commands::Gram(args) => gram_command(args),
        Commands::Kpca { operation } => kpca_command(operation),
        Commands::Kkmeans { operation } => kkmeans_command(operation),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn distance_command(args: DistanceArgs) -> Result<()> {
    let dim = whole_number("dim", args.dim)?;
    let metric = Metric::from_name(&args.metric, args.p, args.sigma)?;
    let csv = load(&args.diagrams)?;

    match (&args.first, &args.second) {
        (Some(first), Some(second)) => {
            let x = find_diagram(&csv, first)?;
            let y = find_diagram(&csv, second)?;
            let distance = api::diagram_distance(x, y, dim, &metric)?;
            let mut out = open_output(args.output.as_deref())?;
            writeln!(out, "{distance}").map_err(PdkError::IoError)?;
            out.flush().map_err(PdkError::IoError)
        }
        _ => {
            let workers = parse_workers(args.workers)?;
            let matrix = api::distance_matrix(csv.diagrams(), None, dim, metric, workers)?;
            write_rows(args.output.as_deref(), matrix.rows())
        }
    }
}

fn gram_command(args: GramArgs) -> Result<()> {
    let params = args.kernel.params()?;
    let workers = args.kernel.workers()?;
    let csv = load(&args.diagrams)?;
    let other = args.other.as_deref().map(load).transpose()?;

    let gram = api::gram_matrix(
        csv.diagrams(),
        other.as_ref().map(|o| o.diagrams()),
        params,
        workers,
    )?;
    info!("Computed {}x{} Gram matrix", gram.nrows(), gram.ncols());
    write_rows(args.output.as_deref(), gram.rows())
}

fn kpca_command(operation: KpcaOperation) -> Result<()> {
    match operation {
        KpcaOperation::Fit {
            diagrams,
            components,
            kernel,
            output,
        } => {
            let csv = load(&diagrams)?;
            let model = KernelPCA::new(components)
                .with_params(kernel.params()?)
                .with_workers(kernel.workers()?)
                .fit(csv.diagrams())?;
            info!(
                "Explained variance ratio: {:?}",
                model.explained_variance_ratio()
            );
            SavedModel::from(model).save_to_file(&output)?;
            info!("Model saved to: {output:?}");
            Ok(())
        }
        KpcaOperation::Project {
            model,
            diagrams,
            workers,
            output,
        } => {
            info!("Loading model from: {model:?}");
            let model = SavedModel::load_from_file(&model)?.into_kernel_pca()?;
            let csv = load(&diagrams)?;
            let coordinates = model.project(csv.diagrams(), parse_workers(workers)?)?;
            let rows: Vec<Vec<f64>> = coordinates
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect();
            write_rows(output.as_deref(), rows.iter().map(|r| r.as_slice()))
        }
    }
}

fn kkmeans_command(operation: KkmeansOperation) -> Result<()> {
    match operation {
        KkmeansOperation::Fit {
            diagrams,
            clusters,
            kernel,
            max_iterations,
            seed,
            output,
        } => {
            let csv = load(&diagrams)?;
            let model = KernelKMeans::new(clusters)
                .with_params(kernel.params()?)
                .with_workers(kernel.workers()?)
                .with_max_iterations(max_iterations)
                .with_seed(seed)
                .fit(csv.diagrams())?;
            info!("Cluster sizes: {:?}", model.cluster_sizes());
            SavedModel::from(model).save_to_file(&output)?;
            info!("Model saved to: {output:?}");
            Ok(())
        }
        KkmeansOperation::Assign {
            model,
            diagrams,
            workers,
            output,
        } => {
            info!("Loading model from: {model:?}");
            let model = SavedModel::load_from_file(&model)?.into_kernel_kmeans()?;
            let csv = load(&diagrams)?;
            let labels = model.assign(csv.diagrams(), parse_workers(workers)?)?;

            let mut out = open_output(output.as_deref())?;
            writeln!(out, "# diagram cluster").map_err(PdkError::IoError)?;
            for (id, label) in csv.ids().iter().zip(&labels) {
                writeln!(out, "{id} {label}").map_err(PdkError::IoError)?;
            }
            out.flush().map_err(PdkError::IoError)
        }
    }
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    SavedModel::load_from_file(&args.model)?.print_summary();
    Ok(())
}

fn load(path: &Path) -> Result<DiagramCsv> {
    info!("Loading diagrams from: {path:?}");
    let csv = DiagramCsv::from_file(path)?;
    info!("Loaded {} diagrams", csv.len());
    Ok(csv)
}

fn find_diagram<'a>(
    csv: &'a DiagramCsv,
    id: &str,
) -> Result<&'a pdkernel::PersistenceDiagram> {
    csv.ids()
        .iter()
        .position(|candidate| candidate == id)
        .map(|i| &csv.diagrams()[i])
        .ok_or_else(|| PdkError::InvalidParameter(format!("no diagram with id '{id}'")))
}

fn parse_workers(workers: Option<f64>) -> Result<Option<usize>> {
    workers.map(|w| whole_number("workers", w)).transpose()
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(PdkError::IoError)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn format_row(row: &[f64]) -> String {
    row.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_rows<'a, I>(path: Option<&Path>, rows: I) -> Result<()>
where
    I: Iterator<Item = &'a [f64]>,
{
    let mut out = open_output(path)?;
    for row in rows {
        writeln!(out, "{}", format_row(row)).map_err(PdkError::IoError)?;
    }
    out.flush().map_err(PdkError::IoError)?;
    if let Some(path) = path {
        info!("Matrix saved to: {path:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_row() {
        assert_eq!(format_row(&[1.0, 0.5, 0.25]), "1 0.5 0.25");
        assert_eq!(format_row(&[]), "");
    }

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers(None).unwrap(), None);
        assert_eq!(parse_workers(Some(2.0)).unwrap(), Some(2));
        let err = parse_workers(Some(1.5)).unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_kernel_args_validation() {
        let args = KernelArgs {
            dim: 1.5,
            sigma: 1.0,
            t: 1.0,
            workers: None,
        };
        assert!(args.params().unwrap_err().to_string().contains("dim"));

        let args = KernelArgs {
            dim: 0.0,
            sigma: 0.0,
            t: 1.0,
            workers: None,
        };
        assert!(args.params().unwrap_err().to_string().contains("sigma"));
    }
}
