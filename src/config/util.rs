//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`.
///
/// Absolute paths are returned as-is when they exist.
///
/// # Example
/// ```text
/// /home/user/site/dist/js/       ← start
/// /home/user/site/multicdn.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Whether a config path holds the injected JSON object rather than TOML.
pub fn is_json_config(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_config_walks_upward() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("dist/js");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("multicdn.toml"), "").unwrap();

        let found = find_config_file(Path::new("multicdn.toml"), &nested).unwrap();
        assert_eq!(found, dir.path().join("multicdn.toml"));
    }

    #[test]
    fn test_find_config_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_config_file(Path::new("definitely-missing-multicdn.toml"), dir.path()).is_none());
    }

    #[test]
    fn test_find_config_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cdn-config.json");
        assert!(find_config_file(&path, dir.path()).is_none());
        fs::write(&path, "{}").unwrap();
        assert_eq!(find_config_file(&path, Path::new("/")), Some(path));
    }

    #[test]
    fn test_is_json_config() {
        assert!(is_json_config(Path::new("dist/cdn-config.json")));
        assert!(is_json_config(Path::new("CONFIG.JSON")));
        assert!(!is_json_config(Path::new("multicdn.toml")));
    }
}
