use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::exit;

use tree_similarity::cost::UnitCostModel;
use tree_similarity::indexing::{Indexer, TreeIndex};
use tree_similarity::join::{
    histograms, verify_candidates, VerificationAlgorithm,
};
use tree_similarity::parsing;
use tree_similarity::ted::touzet::{Touzet, TouzetVariant};
use tree_similarity::ted::zhang_shasha::ZhangShasha;
use tree_similarity::ted::TedEngine;

/// Tree edit distance and similarity join utility
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the edit distance between two trees in bracket notation
    Ted {
        /// Source tree
        t1: String,
        /// Destination tree
        t2: String,
        /// Distance threshold; selects the bounded Touzet algorithm
        k: Option<usize>,
        /// Touzet variant flag: 'd' enables depth pruning
        variant: Option<String>,
    },
    /// Similarity self join over a collection file, one tree per line
    Join {
        /// Dataset file of trees in bracket notation
        #[arg(short, long, value_name = "FILE")]
        dataset_path: PathBuf,
        /// Distance threshold
        #[arg(short, long)]
        threshold: usize,
        /// Write result triples as CSV to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ted {
            t1,
            t2,
            k,
            variant,
        } => {
            let mut label_dict = parsing::LabelDict::new();
            let parsed1 = match parsing::parse_single(t1, &mut label_dict) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Malformed source tree: {e}");
                    exit(1);
                }
            };
            let parsed2 = match parsing::parse_single(t2, &mut label_dict) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("Malformed destination tree: {e}");
                    exit(1);
                }
            };
            let i1 = TreeIndex::index_tree(&parsed1, &label_dict);
            let i2 = TreeIndex::index_tree(&parsed2, &label_dict);

            let start = std::time::Instant::now();
            let dist = match k {
                None => {
                    let mut zs = ZhangShasha::new(UnitCostModel);
                    zs.ted(&i1, &i2)
                }
                Some(k) => {
                    let touzet_variant = match variant.as_deref() {
                        Some("d") => TouzetVariant::DepthPruning,
                        _ => TouzetVariant::Baseline,
                    };
                    let mut touzet = Touzet::with_variant(UnitCostModel, touzet_variant);
                    touzet.ted_k(&i1, &i2, k)
                }
            };
            let elapsed = start.elapsed();
            println!("TED = {dist}");
            println!("Runtime: {} us", elapsed.as_micros());
        }
        Command::Join {
            dataset_path,
            threshold,
            output,
        } => {
            if !dataset_path.exists() || !dataset_path.is_file() {
                eprintln!("This file does not exist or is not a valid file!");
                exit(1);
            }
            let mut label_dict = parsing::LabelDict::new();
            let trees = match parsing::parse_dataset(&dataset_path, &mut label_dict) {
                Ok(trees) => trees,
                Err(e) => {
                    eprintln!("Got unexpected error: {e}");
                    exit(1);
                }
            };
            eprintln!("Parsed {} trees", trees.len());

            let candidates =
                histograms::collection_index_lookup(&trees, &label_dict, threshold);
            eprintln!("{} candidate pairs", candidates.len());

            let (results, subproblems) = verify_candidates(
                &trees,
                &label_dict,
                &candidates,
                threshold,
                VerificationAlgorithm::Touzet,
            );
            eprintln!(
                "{} result pairs, {} verification subproblems",
                results.len(),
                subproblems
            );

            match output {
                Some(path) => {
                    let mut writer = csv::Writer::from_path(path)?;
                    for r in results.iter() {
                        writer.serialize(r)?;
                    }
                    writer.flush()?;
                }
                None => {
                    let mut writer = csv::Writer::from_writer(std::io::stdout());
                    for r in results.iter() {
                        writer.serialize(r)?;
                    }
                    writer.flush()?;
                }
            }
        }
    }
    Ok(())
}
