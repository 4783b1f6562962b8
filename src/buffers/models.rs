//! Data model for the four FOV buffers and their supporting value types.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A role-tagged utterance in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A spoken segment of the curriculum (a sub-unit of a topic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub title: String,
}

/// Freshest dialogue context. Mutated by the manager at the start of every
/// assembly; no ownership of turns by other buffers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImmediateBuffer {
    pub current_segment: Option<Segment>,
    pub adjacent_segments: Vec<Segment>,
    pub recent_turns: Vec<Turn>,
    pub barge_in: Option<String>,
}

impl ImmediateBuffer {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One glossary entry for the active topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
    pub spoken_form: Option<String>,
}

impl Hash for GlossaryTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplanationStyle {
    Simpler,
    Technical,
    Analogy,
}

/// An alternative phrasing of the topic content, available to the
/// coordinator for targeted replies but not rendered in the default
/// working-buffer text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeExplanation {
    pub style: ExplanationStyle,
    pub content: String,
}

impl Hash for AlternativeExplanation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.style.hash(state);
    }
}

/// A phrase that signals a specific misconception, and how to remediate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MisconceptionTrigger {
    pub trigger_phrase: String,
    pub misconception: String,
    pub remediation: String,
}

impl Hash for MisconceptionTrigger {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trigger_phrase.hash(state);
    }
}

/// Pedagogical payload for the active topic. `topic_title` is non-empty
/// once a topic is active — enforced by callers going through
/// `ContextManager::update_working_buffer`, the only way to replace this buffer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingBuffer {
    pub topic_title: String,
    pub outline: String,
    pub learning_objectives: Vec<String>,
    pub glossary: IndexSet<GlossaryTerm>,
    pub alternative_explanations: IndexSet<AlternativeExplanation>,
    pub misconceptions: IndexSet<MisconceptionTrigger>,
}

impl WorkingBuffer {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Retrieve an alternative explanation for a given style, for the
    /// coordinator to use in a targeted reply (never rendered by default).
    pub fn alternative_for(&self, style: ExplanationStyle) -> Option<&str> {
        self.alternative_explanations
            .iter()
            .find(|a| a.style == style)
            .map(|a| a.content.as_str())
    }
}

/// A completed topic's session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub topic_id: String,
    pub title: String,
    pub summary: String,
    pub mastery_level: f32,
    pub completed_at: DateTime<Utc>,
}

/// A question the learner asked during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserQuestion {
    pub text: String,
    pub answered: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pace {
    Slow,
    Moderate,
    Fast,
}

/// Aggregate learner behavior signals, updated incrementally by the manager.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnerSignals {
    pub pace: Option<Pace>,
    pub style_preference: Option<ExplanationStyle>,
    pub clarification_count: u32,
    pub repetition_count: u32,
    pub mean_think_time_secs: Option<f32>,
}

/// Session memory: caps enforced by the manager on every mutating call,
/// never by the buffer itself (the buffer is a plain value type).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodicBuffer {
    pub topic_summaries: Vec<TopicSummary>,
    pub recent_questions: Vec<UserQuestion>,
    pub addressed_misconceptions: Vec<MisconceptionTrigger>,
    pub learner_signals: LearnerSignals,
}

pub const TOPIC_SUMMARY_CAP: usize = 10;
pub const USER_QUESTION_CAP: usize = 10;

impl EpisodicBuffer {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Where the learner stands in the curriculum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumPosition {
    pub curriculum_title: String,
    pub current_topic_index: usize,
    pub total_topics: usize,
    pub current_unit_title: Option<String>,
}

impl CurriculumPosition {
    /// Invariant: `0 <= current_topic_index < total_topics` whenever
    /// `total_topics > 0`.
    pub fn is_valid(&self) -> bool {
        self.total_topics == 0 || self.current_topic_index < self.total_topics
    }
}

/// Course-wide outline and position. Replaced atomically on topic change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticBuffer {
    pub outline: String,
    pub position: Option<CurriculumPosition>,
    pub dependencies: Vec<String>,
}

impl SemanticBuffer {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
