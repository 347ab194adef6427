//! Configuration structures for the validation engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accuracy::DEFAULT_MEASURED_FIELDS;
use crate::error::InvcheckError;

/// Main configuration for an invcheck run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Character-level accuracy configuration.
    pub character: CharacterConfig,

    /// Business rule configuration.
    pub business: BusinessConfig,

    /// Weights for blending the two methods.
    pub combined: CombinedConfig,

    /// Run limits and scheduling.
    pub run: RunConfig,
}

/// Character-level accuracy configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    /// Fields compared against the reference.
    pub measured_fields: Vec<String>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            measured_fields: DEFAULT_MEASURED_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Business rule configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    /// Absolute tolerance for money comparisons, in currency units.
    pub tolerance: Decimal,

    /// Expected VAT percentage; other rates are flagged as unusual.
    pub default_vat_pct: Decimal,

    /// Discounts above this percentage are flagged as high.
    pub high_discount_pct: Decimal,

    /// Score penalty per issue severity.
    pub weights: SeverityWeights,

    /// Minimum score for PASS (also requires zero errors).
    pub pass_threshold: u32,

    /// Minimum score for REVIEW.
    pub review_threshold: u32,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(5, 2),
            default_vat_pct: Decimal::new(17, 0),
            high_discount_pct: Decimal::new(90, 0),
            weights: SeverityWeights::default(),
            pass_threshold: 90,
            review_threshold: 70,
        }
    }
}

/// Score penalty per issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    pub error: u32,
    pub warn: u32,
    pub info: u32,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            error: 10,
            warn: 3,
            info: 0,
        }
    }
}

/// Weights for the combined per-file score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedConfig {
    /// Weight of the character accuracy (0.0 - 1.0).
    pub character_weight: f64,

    /// Weight of the normalized business score (0.0 - 1.0).
    pub business_weight: f64,
}

impl Default for CombinedConfig {
    fn default() -> Self {
        Self {
            character_weight: 0.6,
            business_weight: 0.4,
        }
    }
}

/// Run limits and scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum number of candidate files per run.
    pub max_files: usize,

    /// Score candidate files on the rayon thread pool.
    pub parallel: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_files: 5,
            parallel: true,
        }
    }
}

impl ValidationConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), InvcheckError> {
        let business = &self.business;
        if business.tolerance < Decimal::ZERO {
            return Err(InvcheckError::Config("business.tolerance must not be negative".into()));
        }
        if business.pass_threshold > 100 || business.review_threshold > business.pass_threshold {
            return Err(InvcheckError::Config(format!(
                "thresholds must satisfy review ({}) <= pass ({}) <= 100",
                business.review_threshold, business.pass_threshold
            )));
        }
        let weights = self.combined;
        if weights.character_weight < 0.0
            || weights.business_weight < 0.0
            || weights.character_weight + weights.business_weight <= 0.0
        {
            return Err(InvcheckError::Config(
                "combined weights must be non-negative and not both zero".into(),
            ));
        }
        if self.run.max_files == 0 {
            return Err(InvcheckError::Config("run.max_files must be at least 1".into()));
        }
        if self.character.measured_fields.is_empty() {
            return Err(InvcheckError::Config("character.measured_fields must not be empty".into()));
        }
        Ok(())
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ValidationConfig::default();
        assert_eq!(config.character.measured_fields.len(), 8);
        assert_eq!(config.business.tolerance, Decimal::new(5, 2));
        assert_eq!(config.business.weights.error, 10);
        assert_eq!(config.run.max_files, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ValidationConfig =
            serde_json::from_str(r#"{"business": {"default_vat_pct": "18"}}"#).unwrap();
        assert_eq!(config.business.default_vat_pct, Decimal::new(18, 0));
        assert_eq!(config.business.pass_threshold, 90);
        assert_eq!(config.combined.character_weight, 0.6);
    }

    #[test]
    fn test_validate() {
        assert!(ValidationConfig::default().validate().is_ok());

        let mut config = ValidationConfig::default();
        config.business.review_threshold = 95;
        assert!(matches!(config.validate(), Err(InvcheckError::Config(_))));

        let mut config = ValidationConfig::default();
        config.combined.character_weight = 0.0;
        config.combined.business_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = ValidationConfig::default();
        config.run.max_files = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = ValidationConfig::default();
        config.run.parallel = false;
        config.save(&path).unwrap();

        let loaded = ValidationConfig::from_file(&path).unwrap();
        assert!(!loaded.run.parallel);
        assert_eq!(loaded.business.tolerance, config.business.tolerance);
    }
}
