use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::connection::Connection;
use crate::error::SeedError;
use crate::provider::{ProviderBand, ProviderBands};
use crate::seeder::SheetSource;

const APP_NAME: &str = "catalog-seeder";
const CONFIG_FILE: &str = "seeder.yaml";

/// One category's input file, processed in configuration order.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub category: String,
    pub file: PathBuf,
}

impl SourceConfig {
    fn new(category: &str, file: &str) -> Self {
        Self {
            category: category.to_string(),
            file: PathBuf::from(file),
        }
    }
}

/// Everything the seeder needs besides the database itself.
///
/// Every field falls back to the production seed layout, so a YAML file only
/// has to list what it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeederConfig {
    pub data_dir: PathBuf,
    pub sources: Vec<SourceConfig>,
    pub category_ids: BTreeMap<String, u64>,
    pub acronyms: Vec<String>,
    pub missing_markers: Vec<String>,
    pub providers: ProviderBands,
    pub max_stock: u32,
    pub connection: Option<Connection>,
}

impl Default for SeederConfig {
    fn default() -> Self {
        let sources = [
            ("CPU", "cpu.csv"),
            ("CPU Cooler", "cpu_cooler.csv"),
            ("GPU", "gpu.csv"),
            ("Motherboard", "motherboard.csv"),
            ("PC Case", "pc_case.csv"),
            ("PC Fans", "pc_fans.csv"),
            ("PSU", "psu.csv"),
            ("RAM", "ram.csv"),
            ("Storage", "storage.csv"),
        ]
        .into_iter()
        .map(|(c, f)| SourceConfig::new(c, f))
        .collect();

        let category_ids = [
            ("GPU", 1),
            ("CPU", 2),
            ("RAM", 3),
            ("Motherboard", 4),
            ("Storage", 5),
            ("PSU", 7),
            ("PC Case", 8),
            ("CPU Cooler", 9),
            ("PC Fans", 10),
        ]
        .into_iter()
        .map(|(label, id)| (label.to_string(), id))
        .collect();

        Self {
            data_dir: PathBuf::from("data"),
            sources,
            category_ids,
            acronyms: ["CAS", "GB", "PWM", "RPM", "TDP"]
                .into_iter()
                .map(String::from)
                .collect(),
            missing_markers: [
                "NA", "N/A", "n/a", "NaN", "nan", "null", "NULL", "None", "#N/A", "<NA>",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            providers: ProviderBands::new(
                vec![
                    ProviderBand { until: 9, provider_id: 5 },
                    ProviderBand { until: 19, provider_id: 6 },
                    ProviderBand { until: 29, provider_id: 7 },
                ],
                8,
            ),
            max_stock: 100,
            connection: None,
        }
    }
}

impl SeederConfig {
    /// Load the config from `path`, or from the app config directory when no
    /// path is given. Falls back to defaults if the default file is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = get_app_config_path()?.join(CONFIG_FILE);
                if !default.exists() {
                    tracing::debug!("no config at {}, using defaults", default.display());
                    return Ok(Self::default());
                }
                default
            }
        };
        let data = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_yaml(&data)
            .with_context(|| format!("failed to load config at {}", path.display()))?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        let config: Self = serde_yaml::from_slice(data).context("failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SeedError> {
        if self.max_stock == 0 {
            return Err(SeedError::Config("max_stock must be at least 1".into()));
        }
        self.providers.validate()?;
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.category.as_str()) {
                return Err(SeedError::Config(format!(
                    "category `{}` is listed twice in sources",
                    source.category
                )));
            }
        }
        Ok(())
    }

    /// Keep only the sources whose category is in `labels`, in config order.
    pub fn restrict_to(&mut self, labels: &[String]) -> Result<(), SeedError> {
        if labels.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = labels
            .iter()
            .find(|l| !self.sources.iter().any(|s| &s.category == *l))
        {
            return Err(SeedError::UnknownSource(unknown.clone()));
        }
        self.sources.retain(|s| labels.contains(&s.category));
        Ok(())
    }

    /// Configured sources with their files resolved against `data_dir`.
    pub fn sheet_sources(&self) -> Vec<SheetSource> {
        self.sources
            .iter()
            .map(|s| SheetSource {
                category: s.category.clone(),
                path: self.data_dir.join(&s.file),
            })
            .collect()
    }
}

/// Return the application config directory path, creating it if missing.
pub fn get_app_config_path() -> Result<PathBuf> {
    let mut path = if cfg!(target_os = "macos") {
        dirs_next::home_dir().map(|h| h.join(".config"))
    } else {
        dirs_next::config_dir()
    }
    .ok_or_else(|| anyhow::anyhow!("failed to find os config dir."))?;

    path.push(APP_NAME);
    fs::create_dir_all(&path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseType;

    #[test]
    fn defaults_cover_every_source() {
        let config = SeederConfig::default();
        assert_eq!(config.sources.len(), 9);
        for source in &config.sources {
            assert!(
                config.category_ids.contains_key(&source.category),
                "{} has no id",
                source.category
            );
        }
        assert_eq!(config.category_ids["GPU"], 1);
        assert_eq!(config.category_ids["PC Fans"], 10);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = br#"
data_dir: /srv/seed
acronyms: [GB, RGB]
"#;
        let config = SeederConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/seed"));
        assert_eq!(config.acronyms, vec!["GB".to_string(), "RGB".to_string()]);
        assert_eq!(config.sources.len(), 9);
        assert_eq!(config.max_stock, 100);
        assert!(config.connection.is_none());
    }

    #[test]
    fn yaml_with_connection_and_bands() {
        let yaml = br#"
sources:
  - category: GPU
    file: gpus.csv
category_ids:
  GPU: 11
providers:
  bands:
    - until: 2
      provider_id: 40
  fallback: 41
connection:
  type: mysql
  host: localhost
  port: 3307
  user: seeder
  database: shop
"#;
        let config = SeederConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sources, vec![SourceConfig::new("GPU", "gpus.csv")]);
        assert_eq!(config.category_ids.len(), 1);
        let conn = config.connection.unwrap();
        assert!(matches!(conn.r#type, DatabaseType::MySql));
        assert_eq!(conn.port, Some(3307));
        use crate::provider::ProviderAssignment;
        assert_eq!(config.providers.provider_for(1), 40);
        assert_eq!(config.providers.provider_for(2), 41);
    }

    #[test]
    fn duplicate_sources_are_rejected() {
        let yaml = br#"
sources:
  - { category: GPU, file: a.csv }
  - { category: GPU, file: b.csv }
"#;
        let err = SeederConfig::from_yaml(yaml).unwrap_err();
        assert!(format!("{err:#}").contains("listed twice"));
    }

    #[test]
    fn zero_stock_bound_is_rejected() {
        assert!(SeederConfig::from_yaml(b"max_stock: 0").is_err());
    }

    #[test]
    fn restrict_keeps_config_order() {
        let mut config = SeederConfig::default();
        config
            .restrict_to(&["RAM".to_string(), "CPU".to_string()])
            .unwrap();
        let labels: Vec<_> = config.sources.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(labels, vec!["CPU", "RAM"]);
    }

    #[test]
    fn sources_resolve_against_data_dir() {
        let mut config = SeederConfig::default();
        config.data_dir = PathBuf::from("/srv/seed");
        let sources = config.sheet_sources();
        assert_eq!(sources[2].category, "GPU");
        assert_eq!(sources[2].path, PathBuf::from("/srv/seed/gpu.csv"));
    }

    #[test]
    fn restrict_rejects_unknown_label() {
        let mut config = SeederConfig::default();
        let err = config.restrict_to(&["Monitor".to_string()]).unwrap_err();
        assert!(matches!(err, SeedError::UnknownSource(l) if l == "Monitor"));
    }
}
