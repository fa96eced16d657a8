//! Command-line argument parsing for CliniQ
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sample presentations for trying the pipeline
pub const EXAMPLE_CASES: [&str; 4] = [
    "50yr male, squeezing chest pain radiating to jaw",
    "23yr pregnant woman with burning urination",
    "8 month old boy, fussy and not feeding",
    "50yr woman with esophageal varices and confusion",
];

/// CliniQ - Evidence-grounded clinical decision support
#[derive(Parser, Debug)]
#[command(name = "cliniq")]
#[command(version)]
#[command(about = "Evidence-grounded clinical decision support over indexed medical QA cases", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except final result)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a clinical case description
    Analyze {
        /// Case description in the patient's own words
        #[arg(value_name = "CASE", required_unless_present = "example")]
        case: Option<String>,

        /// Use one of the built-in example cases (1-based, see `examples`)
        #[arg(long, conflicts_with = "case")]
        example: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List built-in example cases
    Examples,

    /// Rebuild the vector index from the QA datasets
    Ingest {
        /// Maximum records taken from each dataset
        #[arg(long)]
        max_records: Option<usize>,

        /// Records per upsert batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Read a dataset from a local JSONL or .parquet file instead of the Hub (LABEL=PATH)
        #[arg(long = "local", value_name = "LABEL=PATH")]
        local: Vec<String>,
    },

    /// Check Ollama and vector store availability
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

/// Resolve the case text from either a literal description or an example number
pub fn resolve_case(case: Option<&str>, example: Option<usize>) -> Result<String, String> {
    let text = match (case, example) {
        (Some(text), _) => text.to_string(),
        (None, Some(n)) => EXAMPLE_CASES
            .get(n.wrapping_sub(1))
            .map(|s| s.to_string())
            .ok_or_else(|| format!("Example must be between 1 and {}", EXAMPLE_CASES.len()))?,
        (None, None) => String::new(),
    };

    if text.trim().is_empty() {
        return Err("Please enter a case description.".to_string());
    }
    Ok(text)
}

/// Parse a `LABEL=PATH` override
pub fn parse_local_override(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((label, path)) if !label.trim().is_empty() && !path.trim().is_empty() => {
            Ok((label.trim().to_string(), PathBuf::from(path.trim())))
        }
        _ => Err(format!("Expected LABEL=PATH, got '{}'", raw)),
    }
}

impl Verbosity {
    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show pipeline intermediates (rewrite, hypothesis)
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["cliniq", "-q", "examples"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["cliniq", "examples"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["cliniq", "-v", "examples"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["cliniq", "-vv", "examples"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_analyze_with_case() {
        let args = parse(&["cliniq", "analyze", "cough for 3 weeks", "--json"]);
        match args.command {
            Commands::Analyze { case, example, json } => {
                assert_eq!(case.as_deref(), Some("cough for 3 weeks"));
                assert!(example.is_none());
                assert!(json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_analyze_requires_case_or_example() {
        assert!(Args::try_parse_from(["cliniq", "analyze"]).is_err());
        assert!(Args::try_parse_from(["cliniq", "analyze", "--example", "2"]).is_ok());
    }

    #[test]
    fn test_ingest_overrides() {
        let args = parse(&[
            "cliniq", "ingest", "--max-records", "10", "--local", "MedQA=/tmp/medqa.jsonl",
        ]);
        match args.command {
            Commands::Ingest { max_records, batch_size, local } => {
                assert_eq!(max_records, Some(10));
                assert!(batch_size.is_none());
                assert_eq!(local, vec!["MedQA=/tmp/medqa.jsonl".to_string()]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_case_rejects_blank() {
        assert!(resolve_case(Some("   "), None).is_err());
        assert!(resolve_case(None, None).is_err());
    }

    #[test]
    fn test_resolve_case_examples() {
        assert_eq!(resolve_case(None, Some(1)).unwrap(), EXAMPLE_CASES[0]);
        assert!(resolve_case(None, Some(0)).is_err());
        assert!(resolve_case(None, Some(5)).is_err());
    }

    #[test]
    fn test_parse_local_override() {
        let (label, path) = parse_local_override("MedQA=/data/train.jsonl").unwrap();
        assert_eq!(label, "MedQA");
        assert_eq!(path, PathBuf::from("/data/train.jsonl"));
        assert!(parse_local_override("no-separator").is_err());
        assert!(parse_local_override("=path").is_err());
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert!(!Verbosity::Normal.show_details());
        assert!(Verbosity::Verbose.show_details());
    }
}
