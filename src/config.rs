//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/orgdelta/orgdelta.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `ORGDELTA_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{FieldMapping, LayoutConfig};

/// Raw layout values (None = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawLayoutConfig {
    pub node_width: Option<f64>,
    pub horizontal_gap: Option<f64>,
    pub vertical_gap: Option<f64>,
}

/// Raw column names (None = not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawFieldMapping {
    pub employee_id: Option<String>,
    pub manager_id: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub fte: Option<String>,
    pub location: Option<String>,
    pub job_family: Option<String>,
    pub management_level: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub layout: RawLayoutConfig,
    pub fields: RawFieldMapping,
}

/// Unified configuration for orgdelta.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Settings {
    /// Layout geometry
    pub layout: LayoutConfig,
    /// Column names used when mapping snapshot rows
    pub fields: FieldMapping,
}

/// Get the XDG config directory for orgdelta.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "orgdelta").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("orgdelta.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins wherever it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let layout = &overlay.layout;
        let fields = &overlay.fields;
        let pick = |o: &Option<String>, base: &String| o.clone().unwrap_or_else(|| base.clone());

        Self {
            layout: LayoutConfig {
                node_width: layout.node_width.unwrap_or(self.layout.node_width),
                horizontal_gap: layout.horizontal_gap.unwrap_or(self.layout.horizontal_gap),
                vertical_gap: layout.vertical_gap.unwrap_or(self.layout.vertical_gap),
            },
            fields: FieldMapping {
                employee_id: pick(&fields.employee_id, &self.fields.employee_id),
                manager_id: pick(&fields.manager_id, &self.fields.manager_id),
                name: pick(&fields.name, &self.fields.name),
                title: pick(&fields.title, &self.fields.title),
                fte: pick(&fields.fte, &self.fields.fte),
                location: pick(&fields.location, &self.fields.location),
                job_family: pick(&fields.job_family, &self.fields.job_family),
                management_level: pick(&fields.management_level, &self.fields.management_level),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; it must exist
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        current = current.apply_env_overrides(Self::environment())?;

        current.check()?;
        Ok(current)
    }

    fn environment() -> Environment {
        Environment::with_prefix("ORGDELTA")
            .prefix_separator("_")
            .separator("__")
    }

    /// Apply `ORGDELTA_*` variables from `source` as explicit overrides.
    fn apply_env_overrides(mut self, source: Environment) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(source)
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_float("layout.node_width") {
            self.layout.node_width = val;
        }
        if let Ok(val) = config.get_float("layout.horizontal_gap") {
            self.layout.horizontal_gap = val;
        }
        if let Ok(val) = config.get_float("layout.vertical_gap") {
            self.layout.vertical_gap = val;
        }

        let columns: [(&str, &mut String); 8] = [
            ("fields.employee_id", &mut self.fields.employee_id),
            ("fields.manager_id", &mut self.fields.manager_id),
            ("fields.name", &mut self.fields.name),
            ("fields.title", &mut self.fields.title),
            ("fields.fte", &mut self.fields.fte),
            ("fields.location", &mut self.fields.location),
            ("fields.job_family", &mut self.fields.job_family),
            ("fields.management_level", &mut self.fields.management_level),
        ];
        for (key, slot) in columns {
            if let Ok(val) = config.get_string(key) {
                *slot = val;
            }
        }

        Ok(self)
    }

    /// Reject geometry the layout engine cannot work with.
    fn check(&self) -> Result<(), ApplicationError> {
        let LayoutConfig {
            node_width,
            horizontal_gap,
            vertical_gap,
        } = self.layout;
        if !(node_width.is_finite() && node_width > 0.0) {
            return Err(ApplicationError::Config {
                message: format!("layout.node_width must be positive, got {node_width}"),
            });
        }
        if !(horizontal_gap.is_finite() && horizontal_gap >= 0.0)
            || !(vertical_gap.is_finite() && vertical_gap >= 0.0)
        {
            return Err(ApplicationError::Config {
                message: "layout gaps must not be negative".to_string(),
            });
        }
        if self.fields.employee_id.trim().is_empty() || self.fields.manager_id.trim().is_empty() {
            return Err(ApplicationError::Config {
                message: "fields.employee_id and fields.manager_id must name a column".to_string(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# orgdelta configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/orgdelta/orgdelta.toml
#   File:   --config <file>
#   Env:    ORGDELTA_* environment variables, e.g. ORGDELTA_LAYOUT__NODE_WIDTH=180

[layout]
# Width reserved for a single node
# node_width = 200.0
# Space between neighbouring subtrees
# horizontal_gap = 40.0
# Distance between depth levels
# vertical_gap = 120.0

[fields]
# Column names in snapshot rows
# employee_id = "Employee ID"
# manager_id = "Manager ID"
# name = "Name"
# title = "Title"
# fte = "FTE"
# location = "Location"
# job_family = "Job Family"
# management_level = "Management Level"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::environment().source(Some(map))
    }

    #[test]
    fn given_defaults_when_created_then_matches_layout_constants() {
        let settings = Settings::default();
        assert_eq!(settings.layout, LayoutConfig::default());
        assert_eq!(settings.fields.employee_id, "Employee ID");
        assert!(settings.check().is_ok());
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_values() {
        let raw: RawSettings = toml::from_str(
            r#"
[layout]
node_width = 150.0

[fields]
manager_id = "Reports To"
"#,
        )
        .unwrap();

        let merged = Settings::default().merge_with(&raw);

        assert_eq!(merged.layout.node_width, 150.0);
        assert_eq!(merged.layout.vertical_gap, 120.0);
        assert_eq!(merged.fields.manager_id, "Reports To");
        assert_eq!(merged.fields.employee_id, "Employee ID");
    }

    #[test]
    fn given_env_overrides_when_applying_then_replaces_values() {
        let settings = Settings::default()
            .apply_env_overrides(env(&[
                ("ORGDELTA_LAYOUT__VERTICAL_GAP", "80"),
                ("ORGDELTA_FIELDS__EMPLOYEE_ID", "Worker"),
            ]))
            .unwrap();

        assert_eq!(settings.layout.vertical_gap, 80.0);
        assert_eq!(settings.fields.employee_id, "Worker");
        assert_eq!(settings.layout.node_width, 200.0);
    }

    #[test]
    fn given_zero_node_width_when_checking_then_rejects() {
        let mut settings = Settings::default();
        settings.layout.node_width = 0.0;
        assert!(matches!(
            settings.check(),
            Err(ApplicationError::Config { .. })
        ));
    }

    #[test]
    fn given_settings_when_rendering_toml_then_round_trips() {
        let settings = Settings::default();
        let toml = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn given_template_when_parsing_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.layout.node_width.is_none());
    }
}
