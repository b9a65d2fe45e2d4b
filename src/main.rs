//! multicdn - resolve static assets across several origins with ordered fallback.

mod cache;
mod cli;
mod config;
mod core;
mod inject;
mod loader;
mod logger;
mod net;
mod resolver;

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = Config::load(&cli)?;

    match &cli.command {
        Commands::Resolve { paths, prefer } => {
            block_on(cli::resolve::resolve_paths(paths, prefer, &config))
        }
        Commands::Stats { json } => cli::stats::show_stats(*json, &config),
        Commands::Clear => cli::resolve::clear(&config),
        Commands::Inject {
            target,
            dir,
            no_rewrite,
        } => cli::inject::inject_target(target, dir.as_deref(), *no_rewrite, &config),
        Commands::Load {
            html,
            scope,
            scripts,
            module,
            styles,
        } => block_on(cli::load::load_page(
            html,
            scope.as_deref(),
            scripts,
            *module,
            styles,
            &config,
        )),
    }
}

/// Drive a command on a single-threaded runtime.
fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(future)
}
