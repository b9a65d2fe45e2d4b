//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Multi-origin asset resolution CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: multicdn.toml)
    #[arg(short = 'C', long, global = true, default_value = "multicdn.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Print probe and load details
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Resolve asset paths to the first reachable origin
    #[command(visible_alias = "r")]
    Resolve {
        /// Asset paths (e.g. /css/app.css)
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<String>,

        /// Probe these origins first, comma-separated
        #[arg(short, long, value_delimiter = ',')]
        prefer: Vec<String>,
    },

    /// Show cached resolutions and per-origin metrics
    #[command(visible_alias = "s")]
    Stats {
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget cached resolutions and metrics
    Clear,

    /// Embed the origin config for a deployment target into built pages
    #[command(visible_alias = "i")]
    Inject {
        /// Origin serving the deployment (e.g. local, jsdelivr)
        #[arg(short, long)]
        target: String,

        /// Output directory (default: build.output)
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        dir: Option<PathBuf>,

        /// Keep root-relative asset references unchanged
        #[arg(long)]
        no_rewrite: bool,
    },

    /// Load the lazy images of a page, plus extra scripts and stylesheets
    #[command(visible_alias = "l")]
    Load {
        /// HTML page to load
        #[arg(value_hint = clap::ValueHint::FilePath)]
        html: PathBuf,

        /// Only load images inside the element with this id
        #[arg(long, value_name = "ID")]
        scope: Option<String>,

        /// Script to insert (repeatable)
        #[arg(long = "script", value_name = "PATH")]
        scripts: Vec<String>,

        /// Insert scripts as ES modules
        #[arg(long)]
        module: bool,

        /// Stylesheet to insert (repeatable)
        #[arg(long = "style", value_name = "PATH")]
        styles: Vec<String>,
    },
}
