use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::FilterColumn;
use crate::error::BrapiError;

pub const DEFAULT_CONFIG_FILE: &str = "brapi2vcf.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub variant_page_size: Option<usize>,
    #[serde(default)]
    pub call_set_page_size: Option<usize>,
    #[serde(default)]
    pub sample_page_size: Option<usize>,
    #[serde(default)]
    pub variants_page_size: Option<usize>,
    #[serde(default)]
    pub unknown_string: Option<String>,
    #[serde(default)]
    pub sep_phased: Option<String>,
    #[serde(default)]
    pub sep_unphased: Option<String>,
    #[serde(default)]
    pub failed_filters_column: Option<FilterColumn>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
}

/// Paging and rendering parameters for one conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub variant_page_size: usize,
    pub call_set_page_size: usize,
    pub sample_page_size: usize,
    pub variants_page_size: usize,
    pub unknown_string: String,
    pub sep_phased: String,
    pub sep_unphased: String,
    pub failed_filters_column: FilterColumn,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            variant_page_size: 100,
            call_set_page_size: 100,
            sample_page_size: 1000,
            variants_page_size: 1000,
            unknown_string: ".".to_string(),
            sep_phased: "|".to_string(),
            sep_unphased: "/".to_string(),
            failed_filters_column: FilterColumn::Alt,
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; without one, `brapi2vcf.json` in the
    /// working directory is used when present and defaults otherwise.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, BrapiError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| BrapiError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| BrapiError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, BrapiError> {
        let defaults = ResolvedConfig::default();

        let resolved = ResolvedConfig {
            variant_page_size: page_size(
                "variant_page_size",
                config.variant_page_size,
                defaults.variant_page_size,
            )?,
            call_set_page_size: page_size(
                "call_set_page_size",
                config.call_set_page_size,
                defaults.call_set_page_size,
            )?,
            sample_page_size: page_size(
                "sample_page_size",
                config.sample_page_size,
                defaults.sample_page_size,
            )?,
            variants_page_size: page_size(
                "variants_page_size",
                config.variants_page_size,
                defaults.variants_page_size,
            )?,
            unknown_string: config.unknown_string.unwrap_or(defaults.unknown_string),
            sep_phased: config.sep_phased.unwrap_or(defaults.sep_phased),
            sep_unphased: config.sep_unphased.unwrap_or(defaults.sep_unphased),
            failed_filters_column: config
                .failed_filters_column
                .unwrap_or(defaults.failed_filters_column),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            max_retries: config.max_retries.unwrap_or(defaults.max_retries),
        };

        if resolved.unknown_string.is_empty() {
            return Err(BrapiError::InvalidConfig(
                "unknown_string must not be empty".to_string(),
            ));
        }
        Ok(resolved)
    }
}

fn page_size(name: &str, value: Option<usize>, default: usize) -> Result<usize, BrapiError> {
    match value {
        Some(0) => Err(BrapiError::InvalidConfig(format!(
            "{name} must be greater than zero"
        ))),
        Some(size) => Ok(size),
        None => Ok(default),
    }
}
