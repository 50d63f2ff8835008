//! Layered configuration for the inspector.
//!
//! Sources, highest priority last:
//! 1. Built-in defaults
//! 2. `inspector.toml` in the working directory
//! 3. An explicit TOML file (`--config`)
//! 4. Environment variables with the `INSPECTOR_` prefix
//!
//! Command-line flags are applied on top of the extracted value by the binary.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "inspector.toml";

fn default_database() -> PathBuf {
    PathBuf::from("opagax.db")
}

fn default_sites() -> Vec<String> {
    (1..=6).map(|n| format!("SITE_{n:02}")).collect()
}

const fn default_sample_limit() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InspectorConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Sites enumerated by the per-site checks
    #[serde(default = "default_sites")]
    pub sites: Vec<String>,

    /// Rows shown by sample listings
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            sites: default_sites(),
            sample_limit: default_sample_limit(),
        }
    }
}

impl InspectorConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Ok(Self::figment(explicit).extract()?)
    }

    /// Build the provider chain. The explicit file is read from exactly the
    /// given path, and is an extraction error when it does not exist.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            figment = figment.merge(Toml::file(local));
        }

        if let Some(path) = explicit {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment.merge(Env::prefixed("INSPECTOR_").ignore(&["log"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_correct() {
        let config = InspectorConfig::default();
        assert_eq!(config.database, PathBuf::from("opagax.db"));
        assert_eq!(
            config.sites,
            vec!["SITE_01", "SITE_02", "SITE_03", "SITE_04", "SITE_05", "SITE_06"]
        );
        assert_eq!(config.sample_limit, 5);
    }

    #[test]
    fn figment_builds_without_files() {
        Jail::expect_with(|_jail| {
            let config: InspectorConfig = InspectorConfig::figment(None).extract()?;
            assert_eq!(config, InspectorConfig::default());
            Ok(())
        });
    }

    #[test]
    fn local_file_and_env_are_layered() {
        Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG_FILE,
                r#"
                database = "local.db"
                sample_limit = 10
                "#,
            )?;
            jail.set_env("INSPECTOR_SAMPLE_LIMIT", "3");

            let config: InspectorConfig = InspectorConfig::figment(None).extract()?;
            assert_eq!(config.database, PathBuf::from("local.db"));
            assert_eq!(config.sample_limit, 3);
            assert_eq!(config.sites.len(), 6);
            Ok(())
        });
    }

    #[test]
    fn explicit_file_beats_local_file() {
        Jail::expect_with(|jail| {
            jail.create_file(LOCAL_CONFIG_FILE, r#"database = "local.db""#)?;
            jail.create_file(
                "other.toml",
                r#"
                sites = ["SITE_09"]
                database = "other.db"
                "#,
            )?;

            let config: InspectorConfig =
                InspectorConfig::figment(Some(Path::new("other.toml"))).extract()?;
            assert_eq!(config.database, PathBuf::from("other.db"));
            assert_eq!(config.sites, vec!["SITE_09"]);
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            assert!(InspectorConfig::load(Some(Path::new("absent.toml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn explicit_file_is_not_searched_in_parent_directories() {
        Jail::expect_with(|jail| {
            jail.create_file("shared.toml", r#"database = "parent.db""#)?;
            let nested = jail.create_dir("nested")?;
            std::env::set_current_dir(&nested).map_err(|e| e.to_string())?;

            assert!(InspectorConfig::load(Some(Path::new("shared.toml"))).is_err());
            let config = InspectorConfig::load(Some(Path::new("../shared.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.database, PathBuf::from("parent.db"));
            Ok(())
        });
    }
}
