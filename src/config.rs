//! Registration settings
//!
//! Loaded from JSON by the CLI (`--config <file>`); library callers usually
//! start from `RegistrationConfig::default()`.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest number of anchor pairs that determines a similarity transform
pub const MIN_ANCHORS: usize = 3;

/// Settings for one registration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Minimum number of paired dividing roots used as anchors
    pub min_anchors: usize,
    /// Relative singular value threshold below which the anchor fit is degenerate
    pub degeneracy_tolerance: f64,
    /// Names and colors of the tags written by `annotate` and `coloring`
    pub annotation: AnnotationConfig,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            min_anchors: MIN_ANCHORS,
            degeneracy_tolerance: 1e-9,
            annotation: AnnotationConfig::default(),
        }
    }
}

/// Tag set written when annotating registration results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub tag_set_name: String,
    pub not_mapped_label: String,
    pub not_mapped_color: u32,
    pub flipped_label: String,
    pub flipped_color: u32,
    /// Tag set written by `coloring::color_lineages`
    pub lineage_tag_set_name: String,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            tag_set_name: "lineage registration".to_string(),
            not_mapped_label: "not mapped".to_string(),
            not_mapped_color: 0xff00ccff,
            flipped_label: "flipped".to_string(),
            flipped_color: 0xffeeaa00,
            lineage_tag_set_name: "lineages".to_string(),
        }
    }
}

impl RegistrationConfig {
    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_anchors < MIN_ANCHORS {
            return Err(ConfigError::Invalid(format!(
                "min_anchors must be at least {}, got {}",
                MIN_ANCHORS, self.min_anchors
            )));
        }
        if !(self.degeneracy_tolerance.is_finite() && self.degeneracy_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "degeneracy_tolerance must be a non-negative number, got {}",
                self.degeneracy_tolerance
            )));
        }
        if self.annotation.not_mapped_label == self.annotation.flipped_label {
            return Err(ConfigError::Invalid(
                "annotation labels must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RegistrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_anchors, 3);
        assert_eq!(config.annotation.tag_set_name, "lineage registration");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RegistrationConfig = serde_json::from_str(r#"{ "min_anchors": 5 }"#).unwrap();
        assert_eq!(config.min_anchors, 5);
        assert_eq!(config.degeneracy_tolerance, 1e-9);
        assert_eq!(config.annotation, AnnotationConfig::default());
    }

    #[test]
    fn test_rejects_too_few_anchors() {
        let config = RegistrationConfig {
            min_anchors: 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "lineage-registration-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "degeneracy_tolerance": 1e-6 }"#).unwrap();
        let config = RegistrationConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.degeneracy_tolerance, 1e-6);
        assert_eq!(config.min_anchors, MIN_ANCHORS);
    }

    #[test]
    fn test_load_missing_file() {
        let result = RegistrationConfig::load("/nonexistent/lineage-registration.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
