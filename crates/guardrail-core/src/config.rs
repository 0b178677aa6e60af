use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ScoringWeights
// ---------------------------------------------------------------------------

/// Component weights for the per-practice final score. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_vulnerability_impact")]
    pub vulnerability_impact: f64,
    #[serde(default = "default_pattern_compliance")]
    pub pattern_compliance: f64,
    #[serde(default = "default_test_coverage")]
    pub test_coverage: f64,
    #[serde(default = "default_process_compliance")]
    pub process_compliance: f64,
}

fn default_vulnerability_impact() -> f64 {
    0.4
}

fn default_pattern_compliance() -> f64 {
    0.3
}

fn default_test_coverage() -> f64 {
    0.2
}

fn default_process_compliance() -> f64 {
    0.1
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            vulnerability_impact: default_vulnerability_impact(),
            pattern_compliance: default_pattern_compliance(),
            test_coverage: default_test_coverage(),
            process_compliance: default_process_compliance(),
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.vulnerability_impact
            + self.pattern_compliance
            + self.test_coverage
            + self.process_compliance
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Status cut points: `score >= compliant` is compliant, `score >= partial`
/// is partial, anything below is non-compliant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_compliant")]
    pub compliant: u32,
    #[serde(default = "default_partial")]
    pub partial: u32,
}

fn default_compliant() -> u32 {
    90
}

fn default_partial() -> u32 {
    70
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            compliant: default_compliant(),
            partial: default_partial(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScoringConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl ScoringConfig {
    /// Load from `.guardrail/config.yaml` under `root`, falling back to
    /// defaults when the file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: ScoringConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if (self.weights.sum() - 1.0).abs() > 1e-9 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "scoring weights must sum to 1.0, got {}",
                    self.weights.sum()
                ),
            });
        }

        if self.thresholds.compliant <= self.thresholds.partial {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "compliant threshold ({}) must be above partial threshold ({})",
                    self.thresholds.compliant, self.thresholds.partial
                ),
            });
        }

        if self.thresholds.compliant > 100 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "compliant threshold {} is above the 100-point scale",
                    self.thresholds.compliant
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_weights_and_thresholds() {
        let cfg = ScoringConfig::default();
        assert_eq!(cfg.weights.vulnerability_impact, 0.4);
        assert_eq!(cfg.weights.pattern_compliance, 0.3);
        assert_eq!(cfg.weights.test_coverage, 0.2);
        assert_eq!(cfg.weights.process_compliance, 0.1);
        assert_eq!(cfg.thresholds.compliant, 90);
        assert_eq!(cfg.thresholds.partial, 70);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = ScoringConfig::load(dir.path()).unwrap();
        assert_eq!(cfg, ScoringConfig::default());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cfg = ScoringConfig {
            weights: ScoringWeights {
                vulnerability_impact: 0.5,
                pattern_compliance: 0.2,
                test_coverage: 0.2,
                process_compliance: 0.1,
            },
            thresholds: Thresholds {
                compliant: 85,
                partial: 60,
            },
        };
        cfg.save(dir.path()).unwrap();
        let loaded = ScoringConfig::load(dir.path()).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "thresholds:\n  compliant: 95\n";
        let cfg: ScoringConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.thresholds.compliant, 95);
        assert_eq!(cfg.thresholds.partial, 70);
        assert_eq!(cfg.weights, ScoringWeights::default());
    }

    #[test]
    fn bad_weight_sum_is_flagged() {
        let cfg = ScoringConfig {
            weights: ScoringWeights {
                vulnerability_impact: 0.9,
                pattern_compliance: 0.3,
                test_coverage: 0.2,
                process_compliance: 0.1,
            },
            thresholds: Thresholds::default(),
        };
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("sum to 1.0")));
    }

    #[test]
    fn inverted_thresholds_are_flagged() {
        let cfg = ScoringConfig {
            weights: ScoringWeights::default(),
            thresholds: Thresholds {
                compliant: 60,
                partial: 70,
            },
        };
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains("above partial")));
    }
}
