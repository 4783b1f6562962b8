//! Runtime configuration for the confidence monitor and expansion handler
//!
//! Mirrors the rest of the crate's config-layering convention: a
//! `serde`-derived struct with per-field defaults, plus `from_env()` for
//! hosts that want to override without recompiling.

use serde::{Deserialize, Serialize};

/// Monitor + expansion configuration options recognized by a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FovConfig {
    #[serde(default = "default_expansion_threshold")]
    pub expansion_threshold: f32,

    #[serde(default = "default_trend_threshold")]
    pub trend_threshold: f32,

    #[serde(default = "default_hedging_weight")]
    pub hedging_weight: f32,

    #[serde(default = "default_deflection_weight")]
    pub deflection_weight: f32,

    #[serde(default = "default_knowledge_gap_weight")]
    pub knowledge_gap_weight: f32,

    #[serde(default = "default_vague_language_weight")]
    pub vague_language_weight: f32,

    #[serde(default = "default_max_retrieval_tokens")]
    pub max_retrieval_tokens: usize,
}

fn default_expansion_threshold() -> f32 {
    0.60
}
fn default_trend_threshold() -> f32 {
    0.70
}
fn default_hedging_weight() -> f32 {
    0.30
}
fn default_deflection_weight() -> f32 {
    0.25
}
fn default_knowledge_gap_weight() -> f32 {
    0.30
}
fn default_vague_language_weight() -> f32 {
    0.15
}
fn default_max_retrieval_tokens() -> usize {
    2_000
}

impl Default for FovConfig {
    fn default() -> Self {
        Self {
            expansion_threshold: default_expansion_threshold(),
            trend_threshold: default_trend_threshold(),
            hedging_weight: default_hedging_weight(),
            deflection_weight: default_deflection_weight(),
            knowledge_gap_weight: default_knowledge_gap_weight(),
            vague_language_weight: default_vague_language_weight(),
            max_retrieval_tokens: default_max_retrieval_tokens(),
        }
    }
}

impl FovConfig {
    /// The *tutoring* preset: weighted more toward
    /// knowledge gaps and deflection, with higher thresholds (slower to
    /// declare confidence, quicker to recommend expansion).
    pub fn tutoring() -> Self {
        Self {
            expansion_threshold: 0.70,
            trend_threshold: 0.75,
            hedging_weight: 0.25,
            deflection_weight: 0.30,
            knowledge_gap_weight: 0.35,
            vague_language_weight: 0.10,
            max_retrieval_tokens: default_max_retrieval_tokens(),
        }
    }

    /// Load defaults, then apply environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FOV_EXPANSION_THRESHOLD") {
            if let Ok(num) = val.parse() {
                config.expansion_threshold = num;
            }
        }
        if let Ok(val) = std::env::var("FOV_TREND_THRESHOLD") {
            if let Ok(num) = val.parse() {
                config.trend_threshold = num;
            }
        }
        if let Ok(val) = std::env::var("FOV_HEDGING_WEIGHT") {
            if let Ok(num) = val.parse() {
                config.hedging_weight = num;
            }
        }
        if let Ok(val) = std::env::var("FOV_DEFLECTION_WEIGHT") {
            if let Ok(num) = val.parse() {
                config.deflection_weight = num;
            }
        }
        if let Ok(val) = std::env::var("FOV_KNOWLEDGE_GAP_WEIGHT") {
            if let Ok(num) = val.parse() {
                config.knowledge_gap_weight = num;
            }
        }
        if let Ok(val) = std::env::var("FOV_VAGUE_LANGUAGE_WEIGHT") {
            if let Ok(num) = val.parse() {
                config.vague_language_weight = num;
            }
        }
        if let Ok(val) = std::env::var("FOV_MAX_RETRIEVAL_TOKENS") {
            if let Ok(num) = val.parse() {
                config.max_retrieval_tokens = num;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_preset_matches_spec() {
        let config = FovConfig::default();
        assert_eq!(config.expansion_threshold, 0.60);
        assert_eq!(config.trend_threshold, 0.70);
        assert_eq!(config.hedging_weight, 0.30);
        assert_eq!(config.deflection_weight, 0.25);
        assert_eq!(config.knowledge_gap_weight, 0.30);
        assert_eq!(config.vague_language_weight, 0.15);
    }

    #[test]
    fn tutoring_preset_matches_spec() {
        let config = FovConfig::tutoring();
        assert_eq!(config.expansion_threshold, 0.70);
        assert_eq!(config.trend_threshold, 0.75);
        assert_eq!(config.hedging_weight, 0.25);
        assert_eq!(config.deflection_weight, 0.30);
        assert_eq!(config.knowledge_gap_weight, 0.35);
        assert_eq!(config.vague_language_weight, 0.10);
    }
}
