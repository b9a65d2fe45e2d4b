//! `stats` command.

use anyhow::Result;

use super::common::http_resolver;
use crate::config::Config;

/// Print the stored resolver state without probing anything.
pub fn show_stats(json: bool, config: &Config) -> Result<()> {
    let resolver = http_resolver(config, &config.site);
    if json {
        println!("{}", resolver.stats().to_json()?);
    } else {
        resolver.log_stats();
    }
    Ok(())
}
