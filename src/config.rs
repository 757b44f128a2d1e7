use std::fs;
use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::catalog::StaticMetadata;
use crate::classify::{RolePredicates, RoleRule, default_role_rules};
use crate::domain::AssemblyStrategy;
use crate::error::CcviError;

pub const DEFAULT_CONFIG_FILE: &str = "ccvi.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub qtr_url: String,
    pub full_url: String,
    #[serde(default)]
    pub qtr_filename: Option<String>,
    #[serde(default)]
    pub full_filename: Option<String>,
    #[serde(default)]
    pub year_column: Option<String>,
    #[serde(default)]
    pub quarter_column: Option<String>,
    #[serde(default)]
    pub strategy: Option<AssemblyStrategy>,
    #[serde(default)]
    pub roles: Option<Vec<RoleRule>>,
    #[serde(default)]
    pub dataset: Option<DatasetConfig>,
    #[serde(default)]
    pub metadata: Option<StaticMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub name: String,
    pub title: String,
    pub tags: Vec<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: "climate-conflict-vulnerability-index".to_string(),
            title: "Climate Conflict Vulnerability Index".to_string(),
            tags: [
                "climate hazards",
                "climate-weather",
                "conflict-violence",
                "geodata",
                "hazards and risk",
                "natural disasters",
            ]
            .iter()
            .map(|tag| tag.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub qtr_url: String,
    pub full_url: String,
    pub qtr_filename: String,
    pub full_filename: String,
    pub year_column: String,
    pub quarter_column: String,
    pub strategy: AssemblyStrategy,
    pub roles: RolePredicates,
    pub dataset: DatasetConfig,
    pub metadata: StaticMetadata,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CcviError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(CcviError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CcviError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CcviError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CcviError> {
        for url in [&config.qtr_url, &config.full_url] {
            Url::parse(url).map_err(|err| CcviError::InvalidConfig(format!("{url}: {err}")))?;
        }

        let year_column = non_empty("year_column", config.year_column, "year")?;
        let quarter_column = non_empty("quarter_column", config.quarter_column, "quarter")?;
        if year_column == quarter_column {
            return Err(CcviError::InvalidConfig(
                "year_column and quarter_column must differ".to_string(),
            ));
        }
        let qtr_filename = non_empty("qtr_filename", config.qtr_filename, "latest_data.zip")?;
        let full_filename =
            non_empty("full_filename", config.full_filename, "latest_data_full.zip")?;
        if qtr_filename == full_filename {
            return Err(CcviError::InvalidConfig(
                "qtr_filename and full_filename must differ".to_string(),
            ));
        }

        let rules = config.roles.unwrap_or_else(default_role_rules);
        let roles = RolePredicates::new(&rules)?;

        Ok(ResolvedConfig {
            qtr_url: config.qtr_url,
            full_url: config.full_url,
            qtr_filename,
            full_filename,
            year_column,
            quarter_column,
            strategy: config.strategy.unwrap_or_default(),
            roles,
            dataset: config.dataset.unwrap_or_default(),
            metadata: config.metadata.unwrap_or_default(),
        })
    }
}

fn non_empty(field: &str, value: Option<String>, default: &str) -> Result<String, CcviError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(CcviError::InvalidConfig(format!(
            "{field} must not be empty"
        ))),
        Some(value) => Ok(value),
        None => Ok(default.to_string()),
    }
}
