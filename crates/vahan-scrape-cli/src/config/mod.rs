//! Configuration file resolution.

use std::path::{Path, PathBuf};

use anyhow::Context;
use vahan_scrape::ScrapeConfig;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "VAHAN_CONFIG";

/// Config file picked up from the working directory.
pub const LOCAL_CONFIG: &str = "vahan.toml";

/// Resolve the config file path: explicit flag, then `VAHAN_CONFIG`, then
/// `./vahan.toml` if it exists. `None` means built-in defaults.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    resolve_from(
        explicit,
        std::env::var(CONFIG_ENV).ok(),
        Path::new(LOCAL_CONFIG),
    )
}

fn resolve_from(explicit: Option<&str>, env_path: Option<String>, local: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    local.exists().then(|| local.to_path_buf())
}

/// Load the resolved config, or the defaults when there is none.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<ScrapeConfig> {
    match resolve_config_path(explicit) {
        Some(path) => {
            tracing::debug!("Config: {}", path.display());
            ScrapeConfig::load(&path)
                .with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(ScrapeConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_wins() {
        let resolved = resolve_from(Some("a.toml"), Some("b.toml".into()), Path::new("c.toml"));
        assert_eq!(resolved, Some(PathBuf::from("a.toml")));
    }

    #[test]
    fn test_env_before_local() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("vahan.toml");
        std::fs::write(&local, "").unwrap();

        let resolved = resolve_from(None, Some("env.toml".into()), &local);
        assert_eq!(resolved, Some(PathBuf::from("env.toml")));

        assert_eq!(resolve_from(None, Some(String::new()), &local), Some(local.clone()));
        assert_eq!(resolve_from(None, None, &local), Some(local));
    }

    #[test]
    fn test_defaults_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_from(None, None, &dir.path().join("vahan.toml")), None);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "max_retries = 7\n").unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.max_retries, 7);

        let err = load_config(dir.path().join("missing.toml").to_str()).unwrap_err();
        assert!(format!("{err:#}").contains("missing.toml"));
    }
}
