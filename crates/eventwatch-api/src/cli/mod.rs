//! CLI command definitions for the `evwatch` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod event;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Deduplicating catalog of disaster event reports.
#[derive(Parser)]
#[command(name = "evwatch", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to the configured port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host).
        #[arg(long)]
        host: Option<String>,
    },

    /// Catalog an already-extracted event (JSON object or JSON string).
    Ingest {
        /// Event JSON, or `-` to read it from stdin.
        payload: String,
    },

    /// Run a free-text report through classification and extraction.
    Submit {
        /// Report text.
        text: String,
    },

    /// List catalogued events.
    #[command(alias = "ls")]
    List {
        /// Only events of this type (repeatable).
        #[arg(long = "type")]
        event_types: Vec<String>,

        /// Only events mentioning this location (repeatable).
        #[arg(long = "location")]
        locations: Vec<String>,

        /// Only events in this category (repeatable).
        #[arg(long = "category")]
        categories: Vec<String>,
    },

    /// Show one event.
    Show {
        /// Event id.
        id: String,
    },

    /// Delete an event from both stores.
    #[command(alias = "rm")]
    Delete {
        /// Event id.
        id: String,
    },

    /// Repair divergence between the record store and the vector index.
    Reconcile,

    /// Catalog status dashboard.
    Status,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
