//! Configuration management for `multicdn.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── cdn        # [cdn] origin registry
//! │   ├── loader     # [loader]
//! │   ├── storage    # [storage]
//! │   ├── site       # [site]
//! │   └── build      # [build]
//! ├── types/         # ConfigError, ConfigDiagnostics, FieldPath
//! └── mod.rs         # Config (this file)
//! ```
//!
//! There is no global config handle: [`Config::load`] returns a value that
//! the command constructs its resolver and loader from.

pub mod section;
pub mod types;
mod util;

use util::{find_config_file, is_json_config};

pub use section::{
    BuildSectionConfig, LoaderConfig, OriginConfig, SiteSectionConfig, StorageConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{cli::Cli, log};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing multicdn.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Origin registry (required)
    pub cdn: OriginConfig,

    /// Element load deadlines
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Durable resolution state
    #[serde(default)]
    pub storage: StorageConfig,

    /// Same-origin URL handling
    #[serde(default)]
    pub site: SiteSectionConfig,

    /// Build-time injection
    #[serde(default)]
    pub build: BuildSectionConfig,
}

impl Config {
    /// Config with the given origins and defaults for every other section.
    pub fn with_origins(cdn: OriginConfig) -> Self {
        Self {
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            cdn,
            loader: LoaderConfig::default(),
            storage: StorageConfig::default(),
            site: SiteSectionConfig::default(),
            build: BuildSectionConfig::default(),
        }
    }

    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file; its parent directory
    /// becomes the project root. A `.json` path is read as the injected
    /// origin object.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let Some(config_path) = find_config_file(&cli.config, &cwd) else {
            bail!(ConfigError::NotFound(cli.config.clone()));
        };

        let mut config = if is_json_config(&config_path) {
            let content = fs::read_to_string(&config_path)
                .map_err(|err| ConfigError::Io(config_path.clone(), err))?;
            Self::with_origins(OriginConfig::from_json(&content)?)
        } else {
            Self::from_path(&config_path)?
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = config_path;
        config.normalize_paths(&root);

        crate::logger::set_verbose(cli.verbose || config.cdn.enable_detailed_logging);
        crate::debug!("config"; "using {}", config.config_path.display());

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) =
            Self::parse_with_ignored(&content).map_err(ConfigError::Toml)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
            if !Self::prompt_continue()? {
                bail!("Aborted due to unknown config fields");
            }
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), toml::de::Error> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        eprintln!();
        log!("warning"; "unknown fields in {}:", display_path);
        log!("warning"; "ignoring:");
        for field in fields {
            eprintln!("- {}", field);
        }
        eprintln!();
    }

    /// Prompt user to continue. Returns true only if user explicitly confirms.
    fn prompt_continue() -> Result<bool> {
        use std::io::{self, Write};

        eprint!("Continue? [y/N] ");
        io::stderr().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let input = input.trim().to_lowercase();
        Ok(input == "y" || input == "yes")
    }

    /// Join a path with the root directory.
    pub fn root_join(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Normalize all paths relative to root directory.
    fn normalize_paths(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.storage.normalize(root);
        self.site.normalize(root);
        self.build.normalize(root);
    }

    /// Validate every section, printing warnings and returning all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.cdn.validate(&mut diag);
        self.loader.validate(&self.cdn, &mut diag);
        self.site.validate(&mut diag);
        self.build.validate(&self.cdn, &mut diag);

        diag.print_warnings();

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config with a minimal self-hosted `[cdn]` section.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> Config {
    let config = format!(
        "[cdn]\nprimary_cdn = \"local\"\nfallback_order = [\"local\"]\n[cdn.cdns]\nlocal = \"\"\n{extra}"
    );
    let (parsed, ignored) = Config::parse_with_ignored(&config).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const MIRROR_TOML: &str = r#"
[cdn]
primary_cdn = "jsdelivr"
fallback_order = ["jsdelivr", "github", "local"]
timeout = 1500

[cdn.cdns]
local = ""
github = "https://raw.githubusercontent.com/owner/repo/master"
jsdelivr = "https://cdn.jsdelivr.net/gh/owner/repo@latest"
"#;

    #[test]
    fn test_from_str_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("[cdn\nprimary_cdn = \"local\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_cdn_section_is_required() {
        assert!(Config::from_str("[loader]\nimage_timeout = 100").is_err());
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::from_str(MIRROR_TOML).unwrap();
        assert_eq!(config.cdn.primary_cdn, "jsdelivr");
        assert_eq!(config.cdn.timeout, 1500);
        assert_eq!(config.cdn.cdns.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = format!("{MIRROR_TOML}\n[unknown_section]\nfield = \"value\"");
        let (config, ignored) = Config::parse_with_ignored(&content).unwrap();

        assert_eq!(config.cdn.primary_cdn, "jsdelivr");
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_no_unknown_fields() {
        let (_, ignored) = Config::parse_with_ignored(MIRROR_TOML).unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::from_str(MIRROR_TOML).unwrap();
        config.cdn.fallback_order.push("ghost".into());
        config.cdn.timeout = 0;

        let err = config.validate().unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::Diagnostics(diag)) => assert_eq!(diag.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_normalize_paths() {
        let mut config = test_parse_config("[site]\nroot_dir = \"public\"");
        config.normalize_paths(Path::new("/srv/site"));
        assert_eq!(config.root, PathBuf::from("/srv/site"));
        assert_eq!(config.build.output, PathBuf::from("/srv/site/dist"));
        assert_eq!(config.site.root_dir, Some(PathBuf::from("/srv/site/public")));
        assert_eq!(config.storage.dir, PathBuf::from("/srv/site/.multicdn/cache"));
    }
}
