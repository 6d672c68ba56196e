use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::DEFAULT_URL_TEMPLATE;
use crate::scanner::ttree::DEFAULT_EXTENSIONS;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TreeinfoConfig {
    pub database: Option<String>,
    pub url_template: Option<String>,
    pub csv: Option<String>,
    pub html: Option<String>,
    pub extensions: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    /// Suppress status lines and the scan spinner
    pub quiet: Option<bool>,
}

impl TreeinfoConfig {
    /// Config written by `treeinfo init`
    pub fn starter() -> Self {
        Self {
            database: Some(default_database_path().display().to_string()),
            url_template: Some(DEFAULT_URL_TEMPLATE.to_string()),
            csv: Some("treeinfo.csv".to_string()),
            html: Some("treeinfo.html".to_string()),
            extensions: Some(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()),
            exclude: Some(Vec::new()),
            quiet: Some(false),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path)
    }

    pub fn extensions(&self) -> Vec<String> {
        self.extensions
            .clone()
            .unwrap_or_else(|| DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }

    pub fn excludes(&self) -> Vec<String> {
        self.exclude.clone().unwrap_or_default()
    }

    pub fn quiet(&self) -> bool {
        self.quiet.unwrap_or(false)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("treeinfo.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("treeinfo.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<TreeinfoConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: TreeinfoConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &TreeinfoConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Refuse to overwrite the database with an export
pub fn check_distinct_output(db_path: &Path, output: &Path) -> anyhow::Result<()> {
    let same = match (db_path.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => db_path == output,
    };
    if same {
        anyhow::bail!("output {} would overwrite the database", output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("treeinfo.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("treeinfo.toml");
        write_config(&path, &TreeinfoConfig::starter(), false).unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.database_path(), PathBuf::from("treeinfo.db"));
        assert_eq!(config.url_template.as_deref(), Some(DEFAULT_URL_TEMPLATE));
        assert!(config.extensions().iter().any(|e| e == "cc"));

        assert!(write_config(&path, &config, false).is_err());
        assert!(write_config(&path, &config, true).is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TreeinfoConfig = toml::from_str("exclude = [\"test/\"]\n").unwrap();
        assert_eq!(config.database_path(), default_database_path());
        assert_eq!(config.excludes(), vec!["test/".to_string()]);
        assert_eq!(config.extensions().len(), DEFAULT_EXTENSIONS.len());
        assert!(!config.quiet());

        let config: TreeinfoConfig = toml::from_str("quiet = true\n").unwrap();
        assert!(config.quiet());
    }

    #[test]
    fn test_output_must_differ_from_database() {
        assert!(check_distinct_output(Path::new("treeinfo.db"), Path::new("treeinfo.db")).is_err());
        assert!(check_distinct_output(Path::new("treeinfo.db"), Path::new("treeinfo.csv")).is_ok());
    }
}
