//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::retrieval::{FusionMethod, SearchMode};

#[derive(Parser, Debug)]
#[command(
    name = "termweave",
    version,
    author = "neur0map",
    about = "Term extraction and hybrid vector/keyword retrieval for translation memories",
    long_about = "Termweave mines documents for candidate terms and searches translation memory \
                  collections with fused vector similarity and BM25 keyword ranking."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/termweave/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Retrieval profile to apply (e.g. "lexical", "rrf")
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract candidate terms from a text file
    Terms {
        /// Input text file
        file: PathBuf,

        /// Chunk size in characters (overrides config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Chunk overlap in characters (overrides config)
        #[arg(long)]
        overlap: Option<usize>,

        /// Maximum number of candidates (overrides config)
        #[arg(short = 'n', long)]
        max_candidates: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a JSONL corpus into an in-memory collection and search it
    Search {
        /// Search query text
        query: String,

        /// JSONL file with one {"id"?, "text", "meta"?} object per line
        #[arg(long, value_name = "JSONL")]
        corpus: PathBuf,

        /// Search mode: vector, keyword or hybrid
        #[arg(short, long)]
        mode: Option<SearchMode>,

        /// Fusion method: weighted_sum, rank_fusion, rrf or none
        #[arg(short, long)]
        fusion: Option<FusionMethod>,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize configuration with default values
    Init {
        /// Overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to global config)
        file: Option<PathBuf>,
    },

    /// Print the default configuration file path
    Path,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_args() {
        let cli = Cli::try_parse_from([
            "termweave",
            "--profile",
            "rrf",
            "search",
            "translation memory",
            "--corpus",
            "tm.jsonl",
            "--mode",
            "keyword",
            "--fusion",
            "rrf",
        ])
        .unwrap();

        assert_eq!(cli.profile.as_deref(), Some("rrf"));
        match cli.command {
            Commands::Search {
                query, mode, fusion, ..
            } => {
                assert_eq!(query, "translation memory");
                assert_eq!(mode, Some(SearchMode::Keyword));
                assert!(matches!(fusion, Some(FusionMethod::ReciprocalRankFusion { .. })));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_bad_mode_rejected() {
        let result = Cli::try_parse_from([
            "termweave", "search", "q", "--corpus", "c.jsonl", "--mode", "fuzzy",
        ]);
        assert!(result.is_err());
    }
}
