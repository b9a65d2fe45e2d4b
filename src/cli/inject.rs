//! `inject` command.

use std::path::Path;

use anyhow::Result;

use crate::config::Config;
use crate::core::plural_count;
use crate::inject::{inject_site, select_target};
use crate::log;
use crate::logger::StatusLine;

/// Embed the config for `target` into the pages under `dir` (or `build.output`).
pub fn inject_target(target: &str, dir: Option<&Path>, no_rewrite: bool, config: &Config) -> Result<()> {
    let dir = dir.map_or_else(|| config.build.output.clone(), |dir| config.root_join(dir));
    let rewrite = config.build.rewrite_paths && !no_rewrite;

    let origin_config = select_target(&config.build, &config.cdn, target)?;
    log!("inject"; "target `{}`, order [{}]", target, origin_config.fallback_order.join(", "));

    let report = inject_site(&dir, &origin_config, rewrite)?;
    StatusLine::success(&format!(
        "{} updated of {} in {}",
        plural_count(report.updated, "page"),
        report.pages,
        dir.display()
    ));
    log!("inject"; "wrote {} for `{}`", report.config_file.display(), report.target);
    Ok(())
}
