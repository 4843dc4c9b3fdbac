//! Configuration, loaded from TOML. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub references: ReferenceConfig,
    pub store: StoreConfig,
    pub rename: RenameConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceConfig {
    /// Treat `Foobar` and `Foobars` as the same page when only one exists.
    pub match_english_plurals: bool,
    /// Bare CamelCase words count as links.
    pub camel_case_links: bool,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            match_english_plurals: true,
            camel_case_links: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Memory,
    #[default]
    Filesystem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub provider: ProviderKind,
    pub root: PathBuf,
    pub attachments: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Filesystem,
            root: PathBuf::from("./pages"),
            attachments: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenameConfig {
    /// Rewrite links in referring pages when a page is renamed.
    pub change_referrers: bool,
    /// Author recorded when the caller does not name one.
    pub default_author: String,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            change_referrers: true,
            default_author: "refgraph".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.references.match_english_plurals);
        assert!(!config.references.camel_case_links);
        assert_eq!(config.store.provider, ProviderKind::Filesystem);
        assert!(config.rename.change_referrers);
        assert_eq!(config.rename.default_author, "refgraph");
    }

    #[test]
    fn parses_every_section() {
        let config = Config::from_toml(
            r#"
            [references]
            match_english_plurals = false
            camel_case_links = true

            [store]
            provider = "memory"
            root = "/srv/wiki"
            attachments = false

            [rename]
            change_referrers = false
            default_author = "bot"
            "#,
        )
        .unwrap();

        assert!(!config.references.match_english_plurals);
        assert!(config.references.camel_case_links);
        assert_eq!(config.store.provider, ProviderKind::Memory);
        assert_eq!(config.store.root, PathBuf::from("/srv/wiki"));
        assert!(!config.store.attachments);
        assert!(!config.rename.change_referrers);
        assert_eq!(config.rename.default_author, "bot");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml("[store]\nprovider = \"memory\"\n").unwrap();
        assert_eq!(config.store.provider, ProviderKind::Memory);
        assert!(config.store.attachments);
        assert_eq!(config.references, ReferenceConfig::default());
    }

    #[test]
    fn rejects_unknown_provider_and_fields() {
        assert!(Config::from_toml("[store]\nprovider = \"s3\"\n").is_err());
        assert!(Config::from_toml("[references]\nfuzzy = true\n").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refgraph.toml");
        std::fs::write(&path, "[rename]\ndefault_author = \"ops\"\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().rename.default_author, "ops");
    }
}
