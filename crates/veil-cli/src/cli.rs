use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "veil")]
#[command(about = "Detect and redact personal data before it reaches AI chat services", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true, env = "VEIL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan text, record findings and print the scan response
    Scan {
        /// Text to scan
        text: String,
    },

    /// Manage recorded issues
    #[command(subcommand)]
    Issues(IssuesCommands),

    /// Serve SCAN_TEXT requests as JSON lines on stdin/stdout
    Host,

    /// Show which adapter handles a URL
    Adapter {
        /// Page or request URL
        url: String,
    },

    /// Run a page-side interception locally and print what would be sent
    Preview {
        /// Page or request URL
        url: String,
        /// Request body for network adapters, prompt text for page adapters
        input: String,
    },
}

#[derive(Subcommand)]
pub enum IssuesCommands {
    /// List active issues
    List {
        /// Show the full history including dismissed issues
        #[arg(long)]
        all: bool,
    },

    /// Suppress an issue's payload for the dismiss window
    Dismiss {
        /// Issue ID
        id: String,
    },
}
