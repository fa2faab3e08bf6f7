//! sparsestore CLI
//!
//! Inspect and edit sparse matrices kept in a snapshot file.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use sparsestore::{Entry, Group, MemoryStore, OuterRange, SparseFormat, SparseMatrix};
use tracing_subscriber::{fmt, EnvFilter};

/// sparsestore CLI
#[derive(Parser, Debug)]
#[command(name = "sparsestore-cli")]
#[command(about = "Inspect sparse matrices stored in a snapshot file")]
#[command(version)]
struct Args {
    /// Snapshot file
    #[arg(short, long, default_value = "./sparsestore.snap")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the children of a group
    Ls {
        /// Group path (root if omitted)
        #[arg(default_value = "")]
        group: String,
    },

    /// Show format, shape and nnz of a sparse matrix
    Info {
        /// Matrix path
        path: String,
    },

    /// Print a block of rows (CSR) or columns (CSC) as triples
    Slice {
        /// Matrix path
        path: String,

        /// First outer index (negative counts from the end)
        #[arg(long, allow_hyphen_values = true)]
        start: Option<i64>,

        /// One past the last outer index (negative counts from the end)
        #[arg(long, allow_hyphen_values = true)]
        stop: Option<i64>,
    },

    /// Copy a matrix to a new path, optionally into another snapshot
    Copy {
        /// Source matrix path
        path: String,

        /// Destination path
        dest: String,

        /// Destination snapshot file (defaults to the source file)
        #[arg(long)]
        to: Option<PathBuf>,
    },

    /// Write the 4x3 example matrix to a path
    Demo {
        /// Destination path
        path: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sparsestore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("sparsestore CLI v{}", sparsestore::VERSION);
    tracing::debug!("Snapshot file: {}", args.file.display());

    if let Err(e) = run(&args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> sparsestore::Result<()> {
    let store = MemoryStore::open(&args.file)?;
    let root = Group::root(&store);

    match &args.command {
        Commands::Ls { group } => {
            let group = if group.is_empty() {
                root
            } else {
                root.get(group)?.into_group()?
            };
            for name in group.keys()? {
                let kind = match group.get(&name)? {
                    Entry::PlainArray(_) => "array",
                    Entry::SparseMatrix(_) => "sparse",
                    Entry::PlainGroup(_) => "group",
                };
                println!("{:<8} {}", kind, name);
            }
        }
        Commands::Info { path } => {
            let dataset = root.get(path)?.into_sparse()?;
            let (rows, cols) = dataset.shape()?;
            println!("format: {}", dataset.format_tag()?);
            println!("shape:  {} x {}", rows, cols);
            println!("nnz:    {}", dataset.nnz()?);
        }
        Commands::Slice { path, start, stop } => {
            let dataset = root.get(path)?.into_sparse()?;
            let matrix = dataset.get(OuterRange::new(*start, *stop))?;
            print_triples(&matrix);
        }
        Commands::Copy { path, dest, to } => {
            let source = root.get(path)?.into_sparse()?;
            match to {
                Some(target) if target != &args.file => {
                    let target_store = MemoryStore::open(target)?;
                    Group::root(&target_store).copy_dataset(dest, &source)?;
                    save(&target_store, target)?;
                }
                _ => {
                    root.copy_dataset(dest, &source)?;
                    save(&store, &args.file)?;
                }
            }
        }
        Commands::Demo { path } => {
            let matrix = SparseMatrix::from_dense(
                SparseFormat::RowCompressed,
                &[
                    vec![0.0, 1.0, 0.0],
                    vec![0.0, 0.0, 1.0],
                    vec![0.0, 0.0, 0.0],
                    vec![1.0, 1.0, 0.0],
                ],
            )?;
            root.create_dataset(path, &matrix)?;
            save(&store, &args.file)?;
        }
    }

    Ok(())
}

fn save(store: &MemoryStore, path: &Path) -> sparsestore::Result<()> {
    store.save(path)?;
    tracing::info!("Saved {}", path.display());
    Ok(())
}

/// Print `(row, col) value` for every stored entry
fn print_triples(matrix: &SparseMatrix) {
    let (rows, cols) = matrix.shape();
    println!("# {} {} x {}, nnz {}", matrix.format(), rows, cols, matrix.nnz());

    let values = matrix.values().to_f64_vec();
    for (outer, bounds) in matrix.indptr().windows(2).enumerate() {
        for k in bounds[0] as usize..bounds[1] as usize {
            let inner = matrix.indices()[k];
            let (r, c) = match matrix.format() {
                SparseFormat::RowCompressed => (outer as u64, inner),
                SparseFormat::ColumnCompressed => (inner, outer as u64),
            };
            println!("({}, {}) {}", r, c, values[k]);
        }
    }
}
