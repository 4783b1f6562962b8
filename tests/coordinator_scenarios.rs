//! Coordinator-level scenarios: barge-in assembly, expansion wiring, and
//! cancellation semantics — abort-before-merge vs. merge-stands-if-
//! cancelled-after.

use async_trait::async_trait;
use chrono::Utc;
use fov_context::budget_for;
use fov_context::buffers::{CurriculumPosition, GlossaryTerm, MisconceptionTrigger, Role, Turn};
use fov_context::expansion::{CurriculumError, CurriculumPort, ExpansionRequest, Scope, TopicMetadata};
use fov_context::summarizer::{Summarizer, SummarizerError};
use fov_context::{FovError, SessionCoordinator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct StubPort;

#[async_trait]
impl CurriculumPort for StubPort {
    async fn topic_metadata(&self, topic_id: &str) -> Result<TopicMetadata, CurriculumError> {
        Ok(TopicMetadata {
            topic_id: topic_id.to_string(),
            title: "Refraction".to_string(),
            unit_title: "Optics".to_string(),
            previous_topic_id: None,
            next_topic_id: None,
            learning_objectives: vec!["Explain Snell's law".to_string()],
            outline: "Light bends when it changes medium.".to_string(),
        })
    }

    async fn glossary_for(&self, _topic_id: &str) -> Result<Vec<GlossaryTerm>, CurriculumError> {
        Ok(vec![])
    }

    async fn misconceptions_for(
        &self,
        _topic_id: &str,
    ) -> Result<Vec<MisconceptionTrigger>, CurriculumError> {
        Ok(vec![])
    }

    async fn compressed_outline(&self, _topic_id: &str) -> Result<String, CurriculumError> {
        Ok("Unit 2: Optics".to_string())
    }

    async fn topic_position(&self, _topic_id: &str) -> Result<CurriculumPosition, CurriculumError> {
        Ok(CurriculumPosition {
            curriculum_title: "Physics".to_string(),
            current_topic_index: 1,
            total_topics: 4,
            current_unit_title: Some("Optics".to_string()),
        })
    }

    async fn generate_context_for_query(
        &self,
        query: &str,
        topic_id: &str,
        _max_tokens: usize,
    ) -> Result<String, CurriculumError> {
        Ok(format!("retrieved passage about {query} near {topic_id}"))
    }
}

struct StubSummarizer;

#[async_trait]
impl Summarizer for StubSummarizer {
    async fn summarize_topic_content(
        &self,
        _text: &str,
        _target_tokens: usize,
    ) -> Result<String, SummarizerError> {
        Ok("condensed".to_string())
    }
}

fn turn(role: Role, content: &str) -> Turn {
    Turn { role, content: content.to_string(), timestamp: Utc::now() }
}

#[tokio::test]
async fn scenario_g_barge_in_line_appears_first_in_immediate_section() {
    let mut coordinator =
        SessionCoordinator::new("You are a tutor.", budget_for(128_000)).with_curriculum_port(Arc::new(StubPort));
    coordinator.set_current_topic("refraction").await.unwrap();

    let history = vec![turn(Role::Assistant, "Let's talk about lenses next.")];
    let messages = coordinator.build_foveated_messages(&history, Some("Wait, what?".to_string()));
    let message = &messages[0].content;
    let immediate_pos = message.find("## IMMEDIATE CONTEXT").unwrap();
    let bargein_pos = message.find("The user just interrupted with").unwrap();
    assert!(bargein_pos > immediate_pos);
    // nothing from the immediate block precedes the barge-in line itself
    let immediate_block = &message[immediate_pos..];
    assert!(immediate_block.trim_start_matches("## IMMEDIATE CONTEXT\n").starts_with("The user just interrupted"));
}

#[tokio::test]
async fn expand_context_not_cancelled_applies_to_working_buffer() {
    let mut coordinator =
        SessionCoordinator::new("You are a tutor.", budget_for(128_000)).with_curriculum_port(Arc::new(StubPort));
    coordinator.set_current_topic("refraction").await.unwrap();

    let token = CancellationToken::new();
    let result = coordinator
        .expand_context(
            ExpansionRequest { query: "why does light bend".to_string(), scope: Scope::CurrentTopic, reason: None },
            Some(&token),
        )
        .await
        .unwrap();
    assert!(!result.items.is_empty());

    let ctx = coordinator.assemble_context(&[], None);
    assert!(ctx.working_text.contains("## Additional Context"));
}

#[tokio::test]
async fn expand_context_cancelled_before_call_returns_leaves_buffer_untouched() {
    let mut coordinator =
        SessionCoordinator::new("You are a tutor.", budget_for(128_000)).with_curriculum_port(Arc::new(StubPort));
    coordinator.set_current_topic("refraction").await.unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let result = coordinator
        .expand_context(
            ExpansionRequest { query: "why does light bend".to_string(), scope: Scope::CurrentTopic, reason: None },
            Some(&token),
        )
        .await;
    assert!(matches!(result, Err(FovError::Cancelled)));

    let ctx = coordinator.assemble_context(&[], None);
    assert!(!ctx.working_text.contains("## Additional Context"));
}

#[tokio::test]
async fn compress_episodic_cancelled_restores_uncompressed_summaries() {
    use fov_context::buffers::TopicSummary;

    let mut coordinator = SessionCoordinator::new("P", budget_for(200_000));
    for i in 0..8 {
        coordinator.record_topic_completion(TopicSummary {
            topic_id: format!("t{i}"),
            title: format!("Topic {i}"),
            summary: "s".to_string(),
            mastery_level: 0.5,
            completed_at: Utc::now(),
        });
    }
    // no summarizer attached: a cancelled token should make no difference,
    // since the operation is already a no-op without a summarizer.
    let token = CancellationToken::new();
    token.cancel();
    coordinator.compress_episodic_if_needed(Some(&token)).await;
    assert_eq!(coordinator.manager().episodic_buffer().topic_summaries.len(), 8);
}

#[tokio::test]
async fn compress_episodic_with_summarizer_and_cancelled_token_restores_oldest() {
    use fov_context::buffers::TopicSummary;

    let mut manager = fov_context::ContextManager::new("P", budget_for(200_000))
        .with_summarizer(Arc::new(StubSummarizer));
    for i in 0..8 {
        manager.record_topic_completion(TopicSummary {
            topic_id: format!("t{i}"),
            title: format!("Topic {i}"),
            summary: "s".to_string(),
            mastery_level: 0.5,
            completed_at: Utc::now(),
        });
    }
    let token = CancellationToken::new();
    token.cancel();
    let result = manager.compress_episodic(Some(&token)).await;
    assert!(matches!(result, Err(FovError::Cancelled)));
    // cancellation observed after the summarizer call returns but before the
    // merge: the buffer must be restored to its pre-compression state.
    assert_eq!(manager.episodic_buffer().topic_summaries.len(), 8);
    assert_eq!(manager.episodic_buffer().topic_summaries[0].title, "Topic 0");
}
