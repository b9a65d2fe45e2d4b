//! `[loader]` section configuration.
//!
//! Element-level deadlines of the asset loader, independent from the
//! resolver's probe timeout.
//!
//! # Example
//!
//! ```toml
//! [loader]
//! image_timeout = 3000     # Image load deadline (ms), shorter than cdn.timeout
//! script_timeout = 5000    # Script/stylesheet deadline (ms), defaults to cdn.timeout
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath, OriginConfig};

/// Default image load deadline in milliseconds.
pub const DEFAULT_IMAGE_TIMEOUT_MS: u64 = 3000;

/// Asset loader settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Image load deadline (ms).
    pub image_timeout: u64,

    /// Script and stylesheet deadline (ms); `cdn.timeout` when unset.
    pub script_timeout: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            image_timeout: DEFAULT_IMAGE_TIMEOUT_MS,
            script_timeout: None,
        }
    }
}

/// Field paths of the `[loader]` section.
pub struct LoaderConfigFields {
    pub image_timeout: FieldPath,
    pub script_timeout: FieldPath,
}

impl LoaderConfig {
    pub const FIELDS: LoaderConfigFields = LoaderConfigFields {
        image_timeout: FieldPath::new("loader.image_timeout"),
        script_timeout: FieldPath::new("loader.script_timeout"),
    };

    #[inline]
    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout)
    }

    /// Script deadline, falling back to the origin probe timeout.
    #[inline]
    pub fn script_timeout(&self, cdn: &OriginConfig) -> Duration {
        Duration::from_millis(self.script_timeout.unwrap_or(cdn.timeout))
    }

    /// Validate loader deadlines.
    ///
    /// # Checks
    /// - both deadlines are non-zero
    /// - the image deadline is shorter than the probe timeout (warning only)
    pub fn validate(&self, cdn: &OriginConfig, diag: &mut ConfigDiagnostics) {
        if self.image_timeout == 0 {
            diag.error(Self::FIELDS.image_timeout, "image_timeout must be greater than 0");
        } else if self.image_timeout >= cdn.timeout {
            diag.warn(
                Self::FIELDS.image_timeout,
                format!(
                    "image_timeout ({}ms) is not shorter than cdn.timeout ({}ms)",
                    self.image_timeout, cdn.timeout
                ),
            );
        }

        if self.script_timeout == Some(0) {
            diag.error(Self::FIELDS.script_timeout, "script_timeout must be greater than 0");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;
    use std::time::Duration;

    #[test]
    fn test_loader_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.loader.image_timeout(), Duration::from_millis(3000));
        assert_eq!(
            config.loader.script_timeout(&config.cdn),
            Duration::from_millis(config.cdn.timeout)
        );
    }

    #[test]
    fn test_loader_overrides() {
        let config = test_parse_config("[loader]\nimage_timeout = 800\nscript_timeout = 2500");
        assert_eq!(config.loader.image_timeout(), Duration::from_millis(800));
        assert_eq!(
            config.loader.script_timeout(&config.cdn),
            Duration::from_millis(2500)
        );
    }
}
