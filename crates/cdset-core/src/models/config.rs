//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CdsError, Result};
use crate::models::field;

/// Main configuration for cdset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdsConfig {
    /// Extraction behaviour shared by all institutions.
    pub extraction: ExtractionConfig,

    /// Output location and formatting.
    pub output: OutputConfig,

    /// Per-institution settings keyed by slug.
    pub institutions: BTreeMap<String, InstitutionConfig>,

    /// Human-curated corrections.
    pub overrides: Vec<Override>,
}

/// Document era selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraSetting {
    /// Detect from document wording.
    #[default]
    Auto,
    Legacy,
    Modern,
}

/// Extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Era of the documents, or auto-detection.
    pub era: EraSetting,

    /// Re-join numbers that PDF text extraction split at a thousands
    /// separator (`1 2,345` becomes `12,345`).
    pub repair_split_numbers: bool,

    /// Relative tolerance for the race-sum check (0.02 = 2%).
    pub race_sum_tolerance: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            era: EraSetting::Auto,
            repair_split_numbers: false,
            race_sum_tolerance: 0.02,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `<slug>.json`.
    pub data_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("src/data/schools"),
        }
    }
}

/// Settings for one institution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionConfig {
    /// Display name written into the dataset.
    pub name: String,

    /// Explicit file name to year label mapping.
    pub documents: BTreeMap<String, String>,

    /// File names to skip.
    pub exclude: Vec<String>,

    /// Overrides `extraction.repair_split_numbers` for this institution.
    pub repair_split_numbers: Option<bool>,

    /// Overrides `extraction.era` for this institution.
    pub era: Option<EraSetting>,
}

/// A correction keyed by institution, year and field path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Override {
    pub institution: String,
    pub year: String,
    pub field: String,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Overrides file layout: either a bare list or `{ "overrides": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum OverridesFile {
    List(Vec<Override>),
    Table { overrides: Vec<Override> },
}

/// Effective settings for one institution after merging defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSettings {
    pub era: EraSetting,
    pub repair_split_numbers: bool,
    pub race_sum_tolerance: f64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        CdsConfig::default().settings_for("")
    }
}

impl CdsConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Append overrides from a separate file.
    pub fn load_overrides(&mut self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let overrides = match serde_json::from_str::<OverridesFile>(&content)? {
            OverridesFile::List(list) => list,
            OverridesFile::Table { overrides } => overrides,
        };
        validate_overrides(&overrides)?;
        let count = overrides.len();
        self.overrides.extend(overrides);
        Ok(count)
    }

    /// Check settings that serde cannot.
    pub fn validate(&self) -> Result<()> {
        let tolerance = self.extraction.race_sum_tolerance;
        if !(0.0..=1.0).contains(&tolerance) {
            return Err(CdsError::Config(format!(
                "race_sum_tolerance must be within 0..=1, got {}",
                tolerance
            )));
        }
        validate_overrides(&self.overrides)
    }

    /// Settings for `slug`, with institution values taking precedence.
    pub fn settings_for(&self, slug: &str) -> ExtractionSettings {
        let institution = self.institutions.get(slug);
        ExtractionSettings {
            era: institution
                .and_then(|i| i.era)
                .unwrap_or(self.extraction.era),
            repair_split_numbers: institution
                .and_then(|i| i.repair_split_numbers)
                .unwrap_or(self.extraction.repair_split_numbers),
            race_sum_tolerance: self.extraction.race_sum_tolerance,
        }
    }

    /// Display name for `slug`, falling back to the slug itself.
    pub fn display_name(&self, slug: &str) -> String {
        self.institutions
            .get(slug)
            .map(|i| i.name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| slug.to_string())
    }

    /// Overrides for one institution and year, in table order.
    pub fn overrides_for<'a>(&'a self, slug: &'a str, year: &'a str) -> impl Iterator<Item = &'a Override> + 'a {
        self.overrides
            .iter()
            .filter(move |o| o.institution == slug && o.year == year)
    }
}

fn validate_overrides(overrides: &[Override]) -> Result<()> {
    for o in overrides {
        let spec = field::lookup(&o.field).ok_or_else(|| {
            CdsError::Config(format!(
                "override for {} {} targets unknown field {}",
                o.institution, o.year, o.field
            ))
        })?;
        if !spec.kind.accepts(&o.value) {
            return Err(CdsError::Config(format!(
                "override for {} {} sets {} to {}, expected {}",
                o.institution,
                o.year,
                o.field,
                o.value,
                spec.kind.describe()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = CdsConfig::default();
        assert_eq!(config.extraction.race_sum_tolerance, 0.02);
        assert_eq!(config.output.data_dir, PathBuf::from("src/data/schools"));
        assert!(!config.extraction.repair_split_numbers);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: CdsConfig = serde_json::from_str(
            r#"{ "institutions": { "cornell": { "name": "Cornell University", "repair_split_numbers": true } } }"#,
        )
        .unwrap();

        let cornell = config.settings_for("cornell");
        assert!(cornell.repair_split_numbers);
        assert_eq!(cornell.era, EraSetting::Auto);
        assert!(!config.settings_for("brown").repair_split_numbers);
        assert_eq!(config.display_name("cornell"), "Cornell University");
        assert_eq!(config.display_name("brown"), "brown");
    }

    #[test]
    fn test_unknown_override_field_is_config_error() {
        let mut config = CdsConfig::default();
        config.overrides.push(Override {
            institution: "brown".into(),
            year: "2020-2021".into(),
            field: "demographics.enrollment.postdocs".into(),
            value: serde_json::json!(1),
            note: None,
        });
        assert!(matches!(config.validate(), Err(CdsError::Config(_))));
    }

    #[test]
    fn test_override_value_must_match_field_kind() {
        let mut config = CdsConfig::default();
        config.overrides.push(Override {
            institution: "brown".into(),
            year: "2020-2021".into(),
            field: "admissions.acceptanceRate".into(),
            value: serde_json::json!(12),
            note: None,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("admissions.acceptanceRate"));

        config.overrides[0].value = serde_json::json!(0.12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_overrides_accepts_both_layouts() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.json");
        let table = dir.path().join("table.json");
        let entry = r#"{ "institution": "brown", "year": "2020-2021", "field": "costs.fees", "value": 0 }"#;
        std::fs::write(&list, format!("[{}]", entry)).unwrap();
        std::fs::write(&table, format!(r#"{{ "overrides": [{}] }}"#, entry)).unwrap();

        let mut config = CdsConfig::default();
        assert_eq!(config.load_overrides(&list).unwrap(), 1);
        assert_eq!(config.load_overrides(&table).unwrap(), 1);
        assert_eq!(config.overrides_for("brown", "2020-2021").count(), 2);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = CdsConfig::default();
        config.extraction.era = EraSetting::Legacy;
        config.save(&path).unwrap();

        assert_eq!(CdsConfig::from_file(&path).unwrap(), config);
    }
}
