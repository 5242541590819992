//! CLI module for docquery.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docquery - question answering over uploaded documents
///
/// Stores PDFs and videos, indexes PDF text for semantic retrieval, and
/// answers questions and summaries through two OpenAI-compatible models.
#[derive(Parser, Debug)]
#[command(name = "docquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Upload a PDF or MP4 and index it
    Upload {
        /// File to upload
        file: PathBuf,
    },

    /// Ask a question about an uploaded document
    Ask {
        /// Document ID returned by upload
        document_id: String,

        /// The question to ask
        question: String,

        /// Also print the unformatted answer
        #[arg(long)]
        raw: bool,
    },

    /// Summarize an uploaded document
    Summarize {
        /// Document ID returned by upload
        document_id: String,

        /// Also print the unformatted summary
        #[arg(long)]
        raw: bool,
    },

    /// Show extracted text, key points, keywords, tables and metadata
    Show {
        /// Document ID returned by upload
        document_id: String,

        /// Print the full extracted text instead of a preview
        #[arg(long)]
        full: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the current configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
