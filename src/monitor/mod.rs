//! Confidence monitor: analyzes an LLM reply for hedging/deflection/gap/
//! vague markers and turns that analysis into an expansion recommendation.

pub mod phrases;

use crate::config::FovConfig;
use crate::expansion::Scope;
use phrases::PhraseTables;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Hedging,
    KnowledgeGap,
    Deflection,
    TopicBoundary,
    OutOfScope,
    ClarificationNeeded,
    Speculation,
}

impl Marker {
    pub fn is_high_signal(self) -> bool {
        matches!(self, Marker::KnowledgeGap | Marker::OutOfScope | Marker::TopicBoundary)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone)]
pub struct ConfidenceRecord {
    pub confidence: f32,
    pub hedging_score: f32,
    pub deflection_score: f32,
    pub knowledge_gap_score: f32,
    pub vague_score: f32,
    pub markers: HashSet<Marker>,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct ExpansionRecommendation {
    pub should_expand: bool,
    pub priority: Option<Priority>,
    pub scope: Option<Scope>,
    pub reason: Option<String>,
}

pub struct ConfidenceMonitor {
    config: FovConfig,
    phrases: PhraseTables,
    history: VecDeque<f32>,
}

const HISTORY_CAP: usize = 10;

impl ConfidenceMonitor {
    pub fn new(config: FovConfig) -> Self {
        Self {
            config,
            phrases: PhraseTables::default(),
            history: VecDeque::with_capacity(HISTORY_CAP),
        }
    }

    pub fn with_phrase_tables(mut self, phrases: PhraseTables) -> Self {
        self.phrases = phrases;
        self
    }

    /// Pure function of the case-folded text plus the sliding history this
    /// monitor holds for trend detection.
    pub fn analyze_response(&mut self, text: &str) -> ConfidenceRecord {
        let lower = text.to_lowercase();

        let (hedging_score, hedging_hit) = score_mean(&lower, &self.phrases.hedging);
        let (deflection_score, deflection_hit) = score_max(&lower, &self.phrases.deflection);
        let (knowledge_gap_score, gap_hit) = score_max(&lower, &self.phrases.knowledge_gap);
        let vague_score = score_vague(&lower, &self.phrases.vague, text.len());

        let mut markers = HashSet::new();
        if hedging_hit {
            markers.insert(Marker::Hedging);
        }
        if deflection_hit {
            markers.insert(Marker::Deflection);
        }
        if gap_hit {
            markers.insert(Marker::KnowledgeGap);
        }
        if any_contains(&lower, &self.phrases.topic_boundary) {
            markers.insert(Marker::TopicBoundary);
        }
        if any_contains(&lower, &self.phrases.out_of_scope) {
            markers.insert(Marker::OutOfScope);
        }
        if any_contains(&lower, &self.phrases.clarification_needed) {
            markers.insert(Marker::ClarificationNeeded);
        }
        if any_contains(&lower, &self.phrases.speculation) {
            markers.insert(Marker::Speculation);
        }

        let uncertainty = hedging_score * self.config.hedging_weight
            + deflection_score * self.config.deflection_weight
            + knowledge_gap_score * self.config.knowledge_gap_weight
            + vague_score * self.config.vague_language_weight;
        let confidence = (1.0 - uncertainty).clamp(0.0, 1.0);

        self.history.push_back(confidence);
        if self.history.len() > HISTORY_CAP {
            self.history.pop_front();
        }
        let trend = self.compute_trend();
        crate::metrics::METRICS.record_confidence(confidence);

        ConfidenceRecord {
            confidence,
            hedging_score,
            deflection_score,
            knowledge_gap_score,
            vague_score,
            markers,
            trend,
        }
    }

    fn compute_trend(&self) -> Trend {
        if self.history.len() < 3 {
            return Trend::Stable;
        }
        let last3: Vec<f32> = self.history.iter().rev().take(3).copied().collect();
        // last3[0] = newest, last3[2] = oldest-of-last-3
        let delta = last3[0] - last3[2];
        if delta > 0.15 {
            Trend::Improving
        } else if delta < -0.15 {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Derive an expansion recommendation from an already-computed record.
    pub fn recommend(&self, record: &ConfidenceRecord) -> ExpansionRecommendation {
        let high_signal = record.markers.iter().any(|m| m.is_high_signal());
        let trend_trigger =
            record.trend == Trend::Declining && record.confidence < self.config.trend_threshold;
        let should_expand =
            record.confidence < self.config.expansion_threshold || high_signal || trend_trigger;

        if !should_expand {
            return ExpansionRecommendation {
                should_expand: false,
                priority: None,
                scope: None,
                reason: None,
            };
        }

        let priority = if record.confidence < 0.3 {
            Priority::High
        } else if record.confidence < 0.5 {
            Priority::Medium
        } else {
            Priority::Low
        };

        let boundary_present = record.markers.contains(&Marker::OutOfScope)
            || record.markers.contains(&Marker::TopicBoundary);
        let scope = if boundary_present {
            Scope::RelatedTopics
        } else if record.knowledge_gap_score > 0.5 {
            Scope::CurrentUnit
        } else {
            Scope::CurrentTopic
        };

        let reason = if record.knowledge_gap_score > 0.0 || record.markers.contains(&Marker::KnowledgeGap)
        {
            "knowledge gap detected"
        } else if record.markers.contains(&Marker::Hedging) {
            "hedging detected"
        } else if record.markers.contains(&Marker::Deflection) {
            "deflection detected"
        } else if record.markers.contains(&Marker::ClarificationNeeded) {
            "clarification requested"
        } else if trend_trigger {
            "confidence declining"
        } else {
            "low overall confidence"
        };

        ExpansionRecommendation {
            should_expand: true,
            priority: Some(priority),
            scope: Some(scope),
            reason: Some(reason.to_string()),
        }
    }

    /// Convenience: analyze and recommend in one call.
    pub fn analyze(&mut self, text: &str) -> (ConfidenceRecord, ExpansionRecommendation) {
        let record = self.analyze_response(text);
        let recommendation = self.recommend(&record);
        (record, recommendation)
    }
}

fn any_contains(text: &str, phrases: &[String]) -> bool {
    phrases.iter().any(|p| text.contains(p.as_str()))
}

fn score_mean(text: &str, dict: &std::collections::HashMap<String, f32>) -> (f32, bool) {
    let matches: Vec<f32> = dict
        .iter()
        .filter(|(phrase, _)| text.contains(phrase.as_str()))
        .map(|(_, weight)| *weight)
        .collect();
    if matches.is_empty() {
        return (0.0, false);
    }
    let mean = matches.iter().sum::<f32>() / matches.len() as f32;
    (mean.clamp(0.0, 1.0), true)
}

fn score_max(text: &str, dict: &std::collections::HashMap<String, f32>) -> (f32, bool) {
    let max = dict
        .iter()
        .filter(|(phrase, _)| text.contains(phrase.as_str()))
        .map(|(_, weight)| *weight)
        .fold(0.0_f32, f32::max);
    let hit = dict.iter().any(|(phrase, _)| text.contains(phrase.as_str()));
    (max.clamp(0.0, 1.0), hit)
}

fn score_vague(text: &str, dict: &std::collections::HashMap<String, f32>, text_len: usize) -> f32 {
    let raw: f32 = dict
        .iter()
        .map(|(phrase, weight)| {
            let count = text.matches(phrase.as_str()).count().min(3);
            count as f32 * weight
        })
        .sum();
    let length_factor = 1.5 - (text_len.min(500) as f32 / 500.0) * 0.5;
    (raw * length_factor).clamp(0.0, 1.0)
}
