//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Upload a document, then ask questions answered from its most similar passages.
#[derive(Debug, Parser)]
#[command(name = "embedomatic", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub options: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides applied on top of the environment.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalOptions {
    /// Collection to ingest into and query (defaults to COLLECTION_NAME)
    #[arg(long, global = true)]
    pub collection: Option<String>,

    /// Maximum chunk size in characters (defaults to CHUNK_SIZE or 1000)
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks (defaults to CHUNK_OVERLAP or 20)
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// Keep vectors in memory even when a connection string is configured
    #[arg(long, global = true)]
    pub memory: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split, embed and store a document, replacing the collection
    Ingest {
        /// Document to ingest (.docx, .txt or .md)
        file: PathBuf,
    },
    /// Answer a question from the stored collection
    Ask {
        /// The question
        query: String,
        #[command(flatten)]
        query_options: QueryOptions,
    },
    /// Show the stored chunks most similar to a query
    Search {
        /// The search text
        query: String,
        #[command(flatten)]
        query_options: QueryOptions,
    },
    /// Interactive session: load documents and ask questions
    Shell {
        /// Document to load before the first prompt
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct QueryOptions {
    /// Number of chunks to retrieve (1-5)
    #[arg(short, long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub k: u8,

    /// Ingest this document first instead of using the stored collection
    #[arg(long)]
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_defaults_to_two_results() {
        let cli = Cli::try_parse_from(["embedomatic", "ask", "What is X?"]).unwrap();
        match cli.command {
            Command::Ask { query, query_options } => {
                assert_eq!(query, "What is X?");
                assert_eq!(query_options.k, 2);
                assert!(query_options.file.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!cli.options.memory);
    }

    #[test]
    fn result_count_is_bounded() {
        assert!(Cli::try_parse_from(["embedomatic", "search", "x", "-k", "0"]).is_err());
        assert!(Cli::try_parse_from(["embedomatic", "search", "x", "-k", "6"]).is_err());
        assert!(Cli::try_parse_from(["embedomatic", "search", "x", "-k", "5"]).is_ok());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "embedomatic",
            "ingest",
            "report.docx",
            "--collection",
            "reports",
            "--chunk-size",
            "500",
            "--memory",
        ])
        .unwrap();
        assert_eq!(cli.options.collection.as_deref(), Some("reports"));
        assert_eq!(cli.options.chunk_size, Some(500));
        assert!(cli.options.memory);
        assert!(matches!(
            cli.command,
            Command::Ingest { ref file } if file.ends_with("report.docx")
        ));
    }
}
