//! Budget model: classifies a target LLM by context window into a tier and
//! derives the per-buffer token budgets and verbatim turn count for it.
//!
//! The tier thresholds and the five numbers per tier are fixed (see
//! `budget_for`) and used verbatim, not configurable the way the monitor's
//! weights are.

use serde::{Deserialize, Serialize};

/// One of the four model-capability tiers, ordered smallest to largest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Tiny,
    OnDevice,
    Mid,
    Cloud,
}

/// Per-buffer token budgets and turn count for a tier. Immutable once
/// computed; recomputed whenever the active model changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub tier: Tier,
    pub total: usize,
    pub immediate: usize,
    pub working: usize,
    pub episodic: usize,
    pub semantic: usize,
    pub turn_count: usize,
}

/// Character-length ÷ 4 token estimator. This is the single named
/// function used everywhere a token count is estimated in this crate —
/// changing it moves every budget invariant, so it must never be
/// reimplemented inline.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Classify a context window (in tokens) into a tier and derive its budgets.
/// Pure and total: every `u32` input maps to exactly one `BudgetConfig`.
pub fn budget_for(context_window_tokens: u32) -> BudgetConfig {
    if context_window_tokens >= 128_000 {
        BudgetConfig {
            tier: Tier::Cloud,
            total: 12_000,
            immediate: 3_000,
            working: 5_000,
            episodic: 2_500,
            semantic: 1_500,
            turn_count: 10,
        }
    } else if context_window_tokens >= 32_000 {
        BudgetConfig {
            tier: Tier::Mid,
            total: 8_000,
            immediate: 2_000,
            working: 3_500,
            episodic: 1_500,
            semantic: 1_000,
            turn_count: 7,
        }
    } else if context_window_tokens >= 8_000 {
        BudgetConfig {
            tier: Tier::OnDevice,
            total: 4_000,
            immediate: 1_200,
            working: 1_500,
            episodic: 800,
            semantic: 500,
            turn_count: 5,
        }
    } else {
        BudgetConfig {
            tier: Tier::Tiny,
            total: 2_000,
            immediate: 800,
            working: 700,
            episodic: 300,
            semantic: 200,
            turn_count: 3,
        }
    }
}

/// A user-extensible model→window lookup table, keyed by case-folded
/// substring match. Ships with a set of known-model defaults; hosts can
/// push additional entries without recompiling the crate.
#[derive(Debug, Clone)]
pub struct ModelWindowTable {
    entries: Vec<(String, u32)>,
    default_window: u32,
}

impl ModelWindowTable {
    pub fn new() -> Self {
        Self {
            entries: vec![
                ("gpt-4o".to_string(), 128_000),
                ("claude-3".to_string(), 200_000),
                ("llama3.2".to_string(), 128_000),
                ("phi".to_string(), 4_096),
            ],
            default_window: 8_192,
        }
    }

    /// Register (or override, first match wins) a model-id substring.
    pub fn register(&mut self, substring: impl Into<String>, window_tokens: u32) {
        self.entries.push((substring.into(), window_tokens));
    }

    /// Look up a model id's context window. Case-folded substring match;
    /// first registered entry that matches wins. Unknown models default to
    /// `default_window`.
    pub fn window_for(&self, model_id: &str) -> u32 {
        let folded = model_id.to_lowercase();
        self.entries
            .iter()
            .find(|(substr, _)| folded.contains(substr.as_str()))
            .map(|(_, window)| *window)
            .unwrap_or(self.default_window)
    }

    /// Convenience: look up a model id's window and derive its budget.
    pub fn budget_for_model(&self, model_id: &str) -> BudgetConfig {
        budget_for(self.window_for(model_id))
    }
}

impl Default for ModelWindowTable {
    fn default() -> Self {
        Self::new()
    }
}
