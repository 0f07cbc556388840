use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_python_tree_decomposition::centroid::CentroidMode;
use rust_python_tree_decomposition::compare::{Comparison, compare_many};
use rust_python_tree_decomposition::decompose::{decompose, decompose_exact_count, decompose_recursive_max_size};
use rust_python_tree_decomposition::io::{
    LoadOptions, load_tree, load_trees, write_comparisons_tsv, write_label_subsets, write_tree,
};
use rust_python_tree_decomposition::sequences::{read_fasta, write_fasta};
use rust_python_tree_decomposition::{Result, Tree};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::Level;

/// Decompose guide trees into leaf subsets and compare trees on their shared leaves.
#[derive(Parser, Debug)]
#[command(name = "tree-decomp", version, about = "Centroid decomposition and comparison of phylogenetic trees")]
struct Args {
    /// Quiet mode: suppresses progress messages on stdout
    #[arg(short = 'q', long = "quiet", default_value_t = false, global = true)]
    quiet: bool,

    /// Log split decisions on stderr: -v for info, -vv for debug
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a guide tree into subsets and write one subset file per sub-tree
    Decompose {
        /// Path to the newick guide tree (optionally .gz)
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Directory receiving subset_<n>.txt files
        #[arg(short = 'o', long = "output")]
        output: PathBuf,

        /// FASTA file; when given, subsets hold sequences instead of labels
        #[arg(long = "sequences")]
        sequences: Option<PathBuf>,

        /// Maximum number of leaves per subset
        #[arg(short = 'k', long = "max-subset-size")]
        max_subset_size: Option<usize>,

        /// Maximum (or, with exact-count, exact) number of subsets
        #[arg(short = 'n', long = "max-num-subsets")]
        max_num_subsets: Option<usize>,

        /// Stopping policy: largest | exact-count | recursive
        #[arg(long = "strategy", value_enum, default_value_t = StrategyArg::Largest)]
        strategy: StrategyArg,

        /// Edge choice of the recursive strategy: centroid | random
        #[arg(long = "mode", value_enum, default_value_t = ModeArg::Centroid)]
        mode: ModeArg,

        /// Seed for the random mode
        #[arg(long = "seed")]
        seed: Option<u64>,

        /// Also write every sub-tree as subset_<n>.nwk
        #[arg(long = "write-trees", default_value_t = false)]
        write_trees: bool,
    },
    /// Compare trees against a reference on their shared leaves
    Compare {
        /// Reference newick tree
        #[arg(short = 'r', long = "reference")]
        reference: PathBuf,

        /// Trees to compare with the reference
        #[arg(short = 't', long = "trees", num_args = 1.., required = true)]
        trees: Vec<PathBuf>,

        /// Output path for the TSV report (.gz compresses); printed when absent
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StrategyArg { Largest, ExactCount, Recursive }

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg { Centroid, Random }

impl From<ModeArg> for CentroidMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Centroid => CentroidMode::Deterministic,
            ModeArg::Random => CentroidMode::Randomized,
        }
    }
}

fn main() {
    let args = Args::parse();
    let show = !args.quiet;
    if let Some(level) = log_level(args.verbose) {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }

    match args.command {
        Command::Decompose {
            input,
            output,
            sequences,
            max_subset_size,
            max_num_subsets,
            strategy,
            mode,
            seed,
            write_trees,
        } => {
            let t0 = Instant::now();
            let tree = load_tree(&input, &LoadOptions::default()).unwrap_or_else(|e| {
                eprintln!("Failed to load tree {:?}: {e}", input);
                std::process::exit(2);
            });
            let read_s = t0.elapsed().as_secs_f64();
            log_if(show, format!("Reading in tree {read_s:.3}s"));
            log_if(show, format!("Read in tree with {} leaves", tree.num_leaves()));

            let t1 = Instant::now();
            let decomposed = match strategy {
                StrategyArg::Largest => decompose(tree, max_subset_size, max_num_subsets),
                StrategyArg::ExactCount => match max_num_subsets {
                    Some(n) => decompose_exact_count(tree, n),
                    None => exit_with(3, "--max-num-subsets is required with --strategy exact-count"),
                },
                StrategyArg::Recursive => match max_subset_size {
                    Some(k) => {
                        let mut rng = seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
                        decompose_recursive_max_size(tree, k, mode.into(), &mut rng)
                    }
                    None => exit_with(3, "--max-subset-size is required with --strategy recursive"),
                },
            };
            let trees = decomposed.unwrap_or_else(|e| {
                eprintln!("Failed to decompose tree: {e}");
                std::process::exit(3);
            });
            let comp_s = t1.elapsed().as_secs_f64();
            log_if(show, format!("Decomposing into {} subsets {comp_s:.3}s", trees.len()));

            let t2 = Instant::now();
            if let Err(e) = write_subsets(&output, &trees, sequences.as_deref(), write_trees) {
                eprintln!("Failed to write output {:?}: {e}", output);
                std::process::exit(4);
            }
            let write_s = t2.elapsed().as_secs_f64();
            log_if(show, format!("Writing to output {write_s:.3}s"));
        }
        Command::Compare { reference, trees, output } => {
            let t0 = Instant::now();
            let paths: Vec<&PathBuf> = std::iter::once(&reference).chain(trees.iter()).collect();
            let mut loaded = load_trees(&paths, &LoadOptions::unresolved()).unwrap_or_else(|e| {
                eprintln!("Failed to load trees: {e}");
                std::process::exit(2);
            });
            let reference_tree = loaded.remove(0);
            let read_s = t0.elapsed().as_secs_f64();
            log_if(show, format!("Reading in {} trees {read_s:.3}s", loaded.len() + 1));

            let t1 = Instant::now();
            let results = compare_many(&reference_tree, &loaded);
            let mut rows: Vec<(String, Comparison)> = Vec::with_capacity(results.len());
            for (path, result) in trees.iter().zip(results) {
                match result {
                    Ok(c) => rows.push((tree_name(path), c)),
                    Err(e) => {
                        eprintln!("Failed to compare {:?}: {e}", path);
                        std::process::exit(3);
                    }
                }
            }
            let comp_s = t1.elapsed().as_secs_f64();
            log_if(show, format!("Comparing {} trees {comp_s:.3}s", rows.len()));

            match output {
                Some(out) => {
                    let t2 = Instant::now();
                    if let Err(e) = write_comparisons_tsv(&out, &rows) {
                        eprintln!("Failed to write output {:?}: {e}", out);
                        std::process::exit(4);
                    }
                    let write_s = t2.elapsed().as_secs_f64();
                    log_if(show, format!("Writing to output {write_s:.3}s"));
                }
                None => {
                    for (name, c) in &rows {
                        println!(
                            "{name}: RF distance on {} shared leaves: {} (fp {}, fn {}, normalized {:.6})",
                            c.shared_leaves,
                            c.robinson_foulds(),
                            c.false_positives,
                            c.false_negatives,
                            c.normalized_distance
                        );
                    }
                }
            }
        }
    }
}

/// Label subsets, or FASTA subsets when `sequences` is given, plus optional newick files.
fn write_subsets(dir: &Path, trees: &[Tree], sequences: Option<&Path>, write_trees: bool) -> Result<()> {
    match sequences {
        Some(fasta) => {
            let records = read_fasta(fasta)?;
            std::fs::create_dir_all(dir)?;
            for (n, tree) in trees.iter().enumerate() {
                let path = dir.join(format!("subset_{}.txt", n + 1));
                write_fasta(&records, &path, &tree.leaf_labels()?)?;
            }
        }
        None => {
            write_label_subsets(dir, trees)?;
        }
    }
    if write_trees {
        for (n, tree) in trees.iter().enumerate() {
            write_tree(tree, dir.join(format!("subset_{}.nwk", n + 1)))?;
        }
    }
    Ok(())
}

fn tree_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

fn exit_with(code: i32, msg: &str) -> ! {
    eprintln!("{msg}");
    std::process::exit(code);
}

fn log_if(show: bool, msg: String) {
    if show { println!("{}", msg); }
}

/// Library events stay silent unless asked for.
fn log_level(verbose: u8) -> Option<Level> {
    match verbose {
        0 => None,
        1 => Some(Level::INFO),
        _ => Some(Level::DEBUG),
    }
}
