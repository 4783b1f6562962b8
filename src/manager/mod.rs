//! Context manager: owns the four buffers, serializes mutations and reads,
//! and assembles the layered context payload every turn.
//!
//! The manager is not internally synchronized — it is plain `&mut self`
//! state. The embedding host is
//! responsible for giving each session's manager a single logical owner
//! (a mutex-guarded value or a single-consumer command queue); the manager
//! itself only guarantees that it never hands out the kind of interior
//! mutability that would make concurrent access safe to get wrong.

use crate::budget::{budget_for, estimate_tokens, BudgetConfig, ModelWindowTable};
use crate::buffers::{
    render_episodic, render_immediate, render_semantic, render_working, EpisodicBuffer,
    GlossaryTerm, ImmediateBuffer, MisconceptionTrigger, Segment, SemanticBuffer, Turn,
    WorkingBuffer, CurriculumPosition, TopicSummary, TOPIC_SUMMARY_CAP, USER_QUESTION_CAP,
    UserQuestion,
};
use crate::error::{FovError, Result};
use crate::expansion::RetrievedContent;
use crate::summarizer::Summarizer;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The final per-turn output: base prompt plus the four rendered buffers.
#[derive(Debug, Clone)]
pub struct AssembledContext {
    pub base_system_prompt: String,
    pub semantic_text: String,
    pub episodic_text: String,
    pub working_text: String,
    pub immediate_text: String,
    pub turn_count_used: usize,
    pub budget: BudgetConfig,
    pub timestamp: DateTime<Utc>,
}

impl AssembledContext {
    /// Deterministic flattening into one system message.
    /// Empty blocks are omitted; one blank line separates included blocks.
    pub fn to_system_message(&self) -> String {
        let mut blocks = Vec::new();

        if !self.base_system_prompt.is_empty() {
            blocks.push(self.base_system_prompt.clone());
        }
        if !self.semantic_text.is_empty() {
            blocks.push(format!("## CURRICULUM OVERVIEW\n{}", self.semantic_text));
        }
        if !self.episodic_text.is_empty() {
            blocks.push(format!("## SESSION HISTORY\n{}", self.episodic_text));
        }
        if !self.working_text.is_empty() {
            blocks.push(format!("## CURRENT TOPIC CONTEXT\n{}", self.working_text));
        }
        if !self.immediate_text.is_empty() {
            blocks.push(format!("## IMMEDIATE CONTEXT\n{}", self.immediate_text));
        }

        blocks.join("\n\n")
    }

    pub fn total_tokens(&self) -> usize {
        estimate_tokens(&self.to_system_message())
    }
}

pub struct ContextManager {
    base_system_prompt: String,
    budget: BudgetConfig,
    model_table: ModelWindowTable,
    summarizer: Option<Arc<dyn Summarizer>>,

    immediate: ImmediateBuffer,
    working: WorkingBuffer,
    episodic: EpisodicBuffer,
    semantic: SemanticBuffer,
}

impl ContextManager {
    pub fn new(base_system_prompt: impl Into<String>, budget: BudgetConfig) -> Self {
        Self {
            base_system_prompt: base_system_prompt.into(),
            budget,
            model_table: ModelWindowTable::new(),
            summarizer: None,
            immediate: ImmediateBuffer::default(),
            working: WorkingBuffer::default(),
            episodic: EpisodicBuffer::default(),
            semantic: SemanticBuffer::default(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_model_table(mut self, table: ModelWindowTable) -> Self {
        self.model_table = table;
        self
    }

    pub fn budget(&self) -> BudgetConfig {
        self.budget
    }

    pub fn working_buffer(&self) -> &WorkingBuffer {
        &self.working
    }

    pub fn episodic_buffer(&self) -> &EpisodicBuffer {
        &self.episodic
    }

    pub fn semantic_buffer(&self) -> &SemanticBuffer {
        &self.semantic
    }

    pub fn immediate_buffer(&self) -> &ImmediateBuffer {
        &self.immediate
    }

    /// Refresh the immediate buffer from `history` (last `turn_count`
    /// entries verbatim), optionally record a barge-in utterance, then
    /// render all four buffers under their budgets. Deterministic w.r.t.
    /// inputs and current buffer state; never awaits.
    pub fn build_context(&mut self, history: &[Turn], barge_in: Option<String>) -> AssembledContext {
        let turn_count = self.budget.turn_count;
        let start = history.len().saturating_sub(turn_count);
        self.immediate.recent_turns = history[start..].to_vec();
        self.immediate.barge_in = barge_in;

        let semantic_text = render_semantic(&self.semantic, self.budget.semantic);
        let episodic_text = render_episodic(&self.episodic, self.budget.episodic);
        let working_text = render_working(&self.working, self.budget.working);
        let immediate_text = render_immediate(&self.immediate, self.budget.immediate);

        debug!(
            semantic = estimate_tokens(&semantic_text),
            episodic = estimate_tokens(&episodic_text),
            working = estimate_tokens(&working_text),
            immediate = estimate_tokens(&immediate_text),
            "assembled context"
        );

        // only the immediate buffer's barge-in exemption can legitimately push
        // a render over its budget; working/episodic/semantic are bounded by
        // their renderers' own contracts, but are still checked here rather
        // than assumed, so a future renderer regression trips the same
        // counter instead of silently going unreported.
        let over_budget = estimate_tokens(&immediate_text) > self.budget.immediate
            || estimate_tokens(&working_text) > self.budget.working
            || estimate_tokens(&episodic_text) > self.budget.episodic
            || estimate_tokens(&semantic_text) > self.budget.semantic;
        if over_budget {
            crate::metrics::METRICS.record_budget_overflow();
        }

        AssembledContext {
            base_system_prompt: self.base_system_prompt.clone(),
            semantic_text,
            episodic_text,
            working_text,
            immediate_text,
            turn_count_used: self.immediate.recent_turns.len(),
            budget: self.budget,
            timestamp: Utc::now(),
        }
    }

    /// Replace the working buffer atomically.
    pub fn update_working_buffer(
        &mut self,
        topic_title: impl Into<String>,
        topic_content: impl Into<String>,
        objectives: Vec<String>,
        glossary: impl IntoIterator<Item = GlossaryTerm>,
        misconceptions: impl IntoIterator<Item = MisconceptionTrigger>,
    ) {
        self.working = WorkingBuffer {
            topic_title: topic_title.into(),
            outline: topic_content.into(),
            learning_objectives: objectives,
            glossary: glossary.into_iter().collect(),
            alternative_explanations: self.working.alternative_explanations.clone(),
            misconceptions: misconceptions.into_iter().collect(),
        };
        info!(topic = %self.working.topic_title, "working buffer replaced");
    }

    /// Append retrieved items under "## Additional Context", each
    /// formatted `[sourceTitle]: content`, separated by blank lines. Does
    /// not truncate — over-budget trimming happens at render time.
    pub fn expand_working_buffer(&mut self, retrieved_items: &[RetrievedContent]) {
        if retrieved_items.is_empty() {
            return;
        }
        let mut block = String::from("\n\n## Additional Context\n\n");
        let formatted: Vec<String> = retrieved_items
            .iter()
            .map(|item| format!("[{}]: {}", item.source_title, item.content))
            .collect();
        block.push_str(&formatted.join("\n\n"));
        self.working.outline.push_str(&block);
        info!(count = retrieved_items.len(), "expanded working buffer");
    }

    /// Replace the semantic buffer atomically.
    pub fn update_semantic_buffer(
        &mut self,
        outline: impl Into<String>,
        position: CurriculumPosition,
        dependencies: Vec<String>,
    ) {
        self.semantic = SemanticBuffer {
            outline: outline.into(),
            position: Some(position),
            dependencies,
        };
    }

    pub fn set_current_segment(&mut self, segment: Option<Segment>) {
        self.immediate.current_segment = segment;
    }

    pub fn set_adjacent_segments(&mut self, segments: Vec<Segment>) {
        self.immediate.adjacent_segments = segments;
    }

    /// Append to episodic topic summaries; cap 10, oldest evicted.
    pub fn record_topic_completion(&mut self, summary: TopicSummary) {
        self.episodic.topic_summaries.push(summary);
        let len = self.episodic.topic_summaries.len();
        if len > TOPIC_SUMMARY_CAP {
            self.episodic
                .topic_summaries
                .drain(0..len - TOPIC_SUMMARY_CAP);
        }
    }

    /// Append a user question; cap 10, oldest evicted.
    pub fn record_user_question(&mut self, text: impl Into<String>, answered: bool) {
        self.episodic.recent_questions.push(UserQuestion {
            text: text.into(),
            answered,
            timestamp: Utc::now(),
        });
        let len = self.episodic.recent_questions.len();
        if len > USER_QUESTION_CAP {
            self.episodic
                .recent_questions
                .drain(0..len - USER_QUESTION_CAP);
        }
    }

    pub fn record_clarification_request(&mut self) {
        self.episodic.learner_signals.clarification_count += 1;
    }

    pub fn record_repetition_request(&mut self) {
        self.episodic.learner_signals.repetition_count += 1;
    }

    /// When more than 5 topic summaries remain and a summarizer is
    /// attached, replace the three oldest with one condensed "Earlier
    /// topics" record whose mastery level is the mean of the replaced
    /// entries. Degrades silently (per §7 MissingCollaborator /
    /// SummarizerFailure) when no summarizer is attached or the call fails.
    /// `cancel`, if set and already cancelled by the time the summarizer
    /// call returns, aborts before the oldest summaries are replaced — the
    /// buffer is left exactly as it was, never half-compressed.
    pub async fn compress_episodic(&mut self, cancel: Option<&CancellationToken>) -> Result<()> {
        if self.episodic.topic_summaries.len() <= 5 {
            return Ok(());
        }

        let Some(summarizer) = self.summarizer.clone() else {
            warn!("compress_episodic: no summarizer attached, skipping compression");
            return Ok(());
        };

        let oldest: Vec<TopicSummary> = self.episodic.topic_summaries.drain(0..3).collect();
        let combined: String = oldest
            .iter()
            .map(|s| format!("{}: {}", s.title, s.summary))
            .collect::<Vec<_>>()
            .join("\n");
        let target_tokens = self.budget.episodic / 4;

        let outcome = summarizer.summarize_topic_content(&combined, target_tokens).await;

        if cancel.map(|token| token.is_cancelled()).unwrap_or(false) {
            info!("compress_episodic cancelled before merge, restoring uncompressed summaries");
            let mut restored = oldest;
            restored.append(&mut self.episodic.topic_summaries);
            self.episodic.topic_summaries = restored;
            return Err(FovError::Cancelled);
        }

        match outcome {
            Ok(condensed) => {
                let mean_mastery = oldest.iter().map(|s| s.mastery_level).sum::<f32>()
                    / oldest.len() as f32;
                let replacement = TopicSummary {
                    topic_id: "earlier-topics".to_string(),
                    title: "Earlier topics".to_string(),
                    summary: condensed,
                    mastery_level: mean_mastery,
                    completed_at: oldest.last().map(|s| s.completed_at).unwrap_or_else(Utc::now),
                };
                self.episodic.topic_summaries.insert(0, replacement);
                info!("compressed 3 oldest topic summaries into one");
                crate::metrics::METRICS.record_compression();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "summarizer failed, restoring uncompressed summaries");
                let mut restored = oldest;
                restored.append(&mut self.episodic.topic_summaries);
                self.episodic.topic_summaries = restored;
                Err(FovError::SummarizerFailure(e.to_string()))
            }
        }
    }

    /// Replace the budget configuration derived from the model's window.
    pub fn update_model_config(&mut self, model_id: &str) {
        self.budget = budget_for(self.model_table.window_for(model_id));
        info!(model_id, tier = ?self.budget.tier, "model config updated");
    }

    /// Reinitialize all four buffers to empty (new session).
    pub fn reset(&mut self) {
        self.immediate.reset();
        self.working.reset();
        self.episodic.reset();
        self.semantic.reset();
    }

    /// Clear only the immediate buffer (topic change).
    pub fn reset_immediate(&mut self) {
        self.immediate.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::Role;
    use async_trait::async_trait;

    struct FixedSummarizer(&'static str);

    #[async_trait]
    impl Summarizer for FixedSummarizer {
        async fn summarize_topic_content(
            &self,
            _text: &str,
            _target_tokens: usize,
        ) -> std::result::Result<String, crate::summarizer::SummarizerError> {
            Ok(self.0.to_string())
        }
    }

    fn turn(role: Role, content: &str) -> Turn {
        Turn {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn build_context_takes_last_turn_count_entries() {
        let mut manager = ContextManager::new("P", budget_for(200_000));
        let history: Vec<Turn> = (0..20)
            .map(|i| turn(Role::User, &format!("turn {}", i)))
            .collect();
        let ctx = manager.build_context(&history, None);
        assert_eq!(ctx.turn_count_used, 10);
    }

    #[test]
    fn scenario_g_assembly_order() {
        let mut manager = ContextManager::new("P", budget_for(200_000));
        manager.update_semantic_buffer(
            "outline".to_string(),
            CurriculumPosition {
                curriculum_title: "Physics".into(),
                current_topic_index: 0,
                total_topics: 3,
                current_unit_title: None,
            },
            vec![],
        );
        manager.record_topic_completion(TopicSummary {
            topic_id: "t0".into(),
            title: "Intro".into(),
            summary: "covered basics".into(),
            mastery_level: 0.5,
            completed_at: Utc::now(),
        });
        manager.update_working_buffer(
            "Refraction",
            "Light bends",
            vec!["Explain Snell's law".into()],
            vec![],
            vec![],
        );
        let ctx = manager.build_context(&[turn(Role::User, "hi")], None);
        let message = ctx.to_system_message();

        assert!(message.starts_with("P"));
        let pos_curriculum = message.find("## CURRICULUM OVERVIEW").unwrap();
        let pos_session = message.find("## SESSION HISTORY").unwrap();
        let pos_topic = message.find("## CURRENT TOPIC CONTEXT").unwrap();
        let pos_immediate = message.find("## IMMEDIATE CONTEXT").unwrap();
        assert!(pos_curriculum < pos_session);
        assert!(pos_session < pos_topic);
        assert!(pos_topic < pos_immediate);
    }

    #[test]
    fn assembly_is_deterministic() {
        let mut manager = ContextManager::new("P", budget_for(200_000));
        manager.update_working_buffer("T", "content", vec![], vec![], vec![]);
        let history = vec![turn(Role::User, "hi")];
        let a = manager.build_context(&history, None).to_system_message();
        let b = manager.build_context(&history, None).to_system_message();
        assert_eq!(a, b);
    }

    #[test]
    fn topic_summary_cap_is_ten() {
        let mut manager = ContextManager::new("P", budget_for(200_000));
        for i in 0..15 {
            manager.record_topic_completion(TopicSummary {
                topic_id: format!("t{}", i),
                title: format!("Topic {}", i),
                summary: "s".into(),
                mastery_level: 0.5,
                completed_at: Utc::now(),
            });
        }
        assert_eq!(manager.episodic_buffer().topic_summaries.len(), 10);
        assert_eq!(manager.episodic_buffer().topic_summaries[0].title, "Topic 5");
        assert_eq!(manager.episodic_buffer().topic_summaries[9].title, "Topic 14");
    }

    #[test]
    fn user_question_cap_is_ten() {
        let mut manager = ContextManager::new("P", budget_for(200_000));
        for i in 0..12 {
            manager.record_user_question(format!("Q{}", i), false);
        }
        assert_eq!(manager.episodic_buffer().recent_questions.len(), 10);
        assert_eq!(manager.episodic_buffer().recent_questions[0].text, "Q2");
    }

    #[tokio::test]
    async fn scenario_f_episodic_compression() {
        let mut manager = ContextManager::new("P", budget_for(200_000))
            .with_summarizer(Arc::new(FixedSummarizer("X")));
        let masteries = [0.4, 0.6, 0.8, 0.5, 0.7, 0.9, 0.6, 0.5];
        for (i, mastery) in masteries.iter().enumerate() {
            manager.record_topic_completion(TopicSummary {
                topic_id: format!("t{}", i),
                title: format!("Topic {}", i),
                summary: "s".into(),
                mastery_level: *mastery,
                completed_at: Utc::now(),
            });
        }
        manager.compress_episodic(None).await.unwrap();
        let summaries = &manager.episodic_buffer().topic_summaries;
        assert_eq!(summaries.len(), 6);
        assert_eq!(summaries[0].title, "Earlier topics");
        assert_eq!(summaries[0].summary, "X");
        assert!((summaries[0].mastery_level - 0.6).abs() < 1e-6);
    }

    #[tokio::test]
    async fn compress_episodic_without_summarizer_is_a_noop() {
        let mut manager = ContextManager::new("P", budget_for(200_000));
        for i in 0..8 {
            manager.record_topic_completion(TopicSummary {
                topic_id: format!("t{}", i),
                title: format!("Topic {}", i),
                summary: "s".into(),
                mastery_level: 0.5,
                completed_at: Utc::now(),
            });
        }
        manager.compress_episodic(None).await.unwrap();
        assert_eq!(manager.episodic_buffer().topic_summaries.len(), 8);
    }

    #[test]
    fn reset_clears_all_buffers_reset_immediate_clears_only_immediate() {
        let mut manager = ContextManager::new("P", budget_for(200_000));
        manager.update_working_buffer("T", "c", vec![], vec![], vec![]);
        manager.set_current_segment(Some(Segment {
            id: "s".into(),
            title: "Seg".into(),
        }));
        manager.reset_immediate();
        assert!(manager.immediate_buffer().current_segment.is_none());
        assert_eq!(manager.working_buffer().topic_title, "T");

        manager.reset();
        assert_eq!(manager.working_buffer().topic_title, "");
    }
}
