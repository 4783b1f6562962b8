//! Session coordinator: the per-turn façade a host actually talks to.
//! Wires together one `ContextManager`, one
//! `ConfidenceMonitor`, and an optional `ExpansionHandler` so a host never
//! has to orchestrate those three on its own.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use serde::{Deserialize, Serialize};

use crate::budget::BudgetConfig;
use crate::buffers::{CurriculumPosition, GlossaryTerm, MisconceptionTrigger, Role, Segment, Turn};
use crate::error::{FovError, Result};
use crate::expansion::{
    apply_expansion, CurriculumPort, ExpansionHandler, ExpansionRequest, ExpansionResult, Scope,
};
use crate::manager::{AssembledContext, ContextManager};
use crate::monitor::{ConfidenceMonitor, ConfidenceRecord, ExpansionRecommendation};
use crate::summarizer::Summarizer;

/// A role-tagged message ready to hand to the LLM transport. This is the
/// core's only outward-facing shape for §6's LLM Message Port: the core
/// produces a sequence of these and later accepts a reply as plain text —
/// it never transports or tokenizes them itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    fn from_turn(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Owns the session's manager, monitor, and (optionally) an expansion
/// handler. `enabled = false` makes `build_foveated_messages` a pass-through
/// that returns `base_system_prompt` unchanged plus verbatim recent turns,
/// for hosts that want a kill switch without removing the wiring.
pub struct SessionCoordinator {
    manager: ContextManager,
    monitor: ConfidenceMonitor,
    expansion: Option<ExpansionHandler>,
    current_topic_id: Option<String>,
    enabled: bool,
    config: crate::config::FovConfig,
}

impl SessionCoordinator {
    pub fn new(base_system_prompt: impl Into<String>, budget: BudgetConfig) -> Self {
        let config = crate::config::FovConfig::default();
        Self {
            manager: ContextManager::new(base_system_prompt, budget),
            monitor: ConfidenceMonitor::new(config.clone()),
            expansion: None,
            current_topic_id: None,
            enabled: true,
            config,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.manager = self.manager.with_summarizer(summarizer);
        self
    }

    /// Replaces both the monitor's weights/thresholds and the expansion
    /// handler's `max_retrieval_tokens` cap (§6). Call before
    /// `with_curriculum_port` if both are being set, so the handler picks up
    /// the new cap; calling it after simply rebuilds the monitor in place.
    pub fn with_monitor_config(mut self, config: crate::config::FovConfig) -> Self {
        self.monitor = ConfidenceMonitor::new(config.clone());
        if let Some(port) = self.expansion.take().map(|h| h.port_handle()) {
            self.expansion = Some(ExpansionHandler::with_max_retrieval_tokens(
                port,
                config.max_retrieval_tokens,
            ));
        }
        self.config = config;
        self
    }

    pub fn with_curriculum_port(mut self, port: Arc<dyn CurriculumPort>) -> Self {
        self.expansion = Some(ExpansionHandler::with_max_retrieval_tokens(
            port,
            self.config.max_retrieval_tokens,
        ));
        self
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn manager(&self) -> &ContextManager {
        &self.manager
    }

    /// Assemble this turn's ready-to-send message sequence. When disabled,
    /// returns `history` verbatim — a host can flip `enabled` off to bypass
    /// foveation entirely without losing conversation continuity. When
    /// enabled: asks the manager for an `AssembledContext`, emits it as a
    /// single leading system message, then appends the last
    /// `turn_count * 2` non-system entries from `history` in order.
    pub fn build_foveated_messages(
        &mut self,
        history: &[Turn],
        barge_in: Option<String>,
    ) -> Vec<Message> {
        if !self.enabled {
            return history.iter().map(Message::from_turn).collect();
        }

        let assembled = self.manager.build_context(history, barge_in);
        let system_content = assembled.to_system_message();
        let window = assembled.budget.turn_count * 2;

        let non_system: Vec<&Turn> = history.iter().filter(|t| t.role != Role::System).collect();
        let start = non_system.len().saturating_sub(window);

        let mut messages = Vec::with_capacity(1 + non_system.len() - start);
        if !system_content.is_empty() {
            messages.push(Message {
                role: Role::System,
                content: system_content,
            });
        }
        messages.extend(non_system[start..].iter().map(|t| Message::from_turn(t)));
        messages
    }

    /// Lower-level access to the assembled buffer snapshot this turn would
    /// produce, for hosts and tests that need the per-buffer rendered text
    /// rather than the flattened message sequence.
    pub fn assemble_context(
        &mut self,
        history: &[Turn],
        barge_in: Option<String>,
    ) -> AssembledContext {
        self.manager.build_context(history, barge_in)
    }

    /// Run the confidence monitor over an assistant reply and derive an
    /// expansion recommendation from it.
    pub fn analyze_response_confidence(
        &mut self,
        text: &str,
    ) -> (ConfidenceRecord, ExpansionRecommendation) {
        self.monitor.analyze(text)
    }

    /// Execute an expansion request against the configured curriculum port
    /// and fold the result into the working buffer. `cancel`, if set and
    /// already cancelled by the time the port call returns, aborts before
    /// the working buffer is touched.
    pub async fn expand_context(
        &mut self,
        request: ExpansionRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ExpansionResult> {
        if request.query.trim().is_empty() {
            return Err(FovError::InvalidInput("query must not be empty".to_string()));
        }
        let Some(handler) = &self.expansion else {
            return Err(FovError::MissingCollaborator("CurriculumPort".to_string()));
        };
        let Some(topic_id) = self.current_topic_id.clone() else {
            return Err(FovError::InvalidInput("no active topic to expand from".to_string()));
        };

        let result = handler
            .execute(request, &topic_id)
            .await
            .map_err(|e| FovError::CurriculumLookupFailure(e.to_string()))?;

        if cancel.map(|token| token.is_cancelled()).unwrap_or(false) {
            return Err(FovError::Cancelled);
        }

        apply_expansion(&mut self.manager, &result);
        Ok(result)
    }

    /// Convenience: run the monitor, and if it recommends expansion, execute
    /// it immediately against the query text itself.
    pub async fn analyze_and_maybe_expand(
        &mut self,
        reply_text: &str,
        follow_up_query: &str,
    ) -> Result<Option<ExpansionResult>> {
        let (_, recommendation) = self.analyze_response_confidence(reply_text);
        if !recommendation.should_expand {
            return Ok(None);
        }
        let scope = recommendation.scope.unwrap_or(Scope::CurrentTopic);
        let result = self
            .expand_context(
                ExpansionRequest {
                    query: follow_up_query.to_string(),
                    scope,
                    reason: recommendation.reason,
                },
                None,
            )
            .await?;
        Ok(Some(result))
    }

    /// Load a new topic's metadata/glossary/misconceptions/position through
    /// the curriculum port and update the working + semantic buffers.
    pub async fn set_current_topic(&mut self, topic_id: impl Into<String>) -> Result<()> {
        let topic_id = topic_id.into();
        let Some(handler) = &self.expansion else {
            return Err(FovError::MissingCollaborator("CurriculumPort".to_string()));
        };
        let port = handler.port_handle();

        let metadata = port
            .topic_metadata(&topic_id)
            .await
            .map_err(|e| FovError::CurriculumLookupFailure(e.to_string()))?;
        let glossary = port
            .glossary_for(&topic_id)
            .await
            .map_err(|e| FovError::CurriculumLookupFailure(e.to_string()))?;
        let misconceptions = port
            .misconceptions_for(&topic_id)
            .await
            .map_err(|e| FovError::CurriculumLookupFailure(e.to_string()))?;
        let outline = port
            .compressed_outline(&topic_id)
            .await
            .map_err(|e| FovError::CurriculumLookupFailure(e.to_string()))?;
        let position = port
            .topic_position(&topic_id)
            .await
            .map_err(|e| FovError::CurriculumLookupFailure(e.to_string()))?;

        self.manager.update_working_buffer(
            metadata.title,
            metadata.outline,
            metadata.learning_objectives,
            glossary,
            misconceptions,
        );
        self.manager.update_semantic_buffer(outline, position, vec![]);
        info!(topic_id, "active topic set");
        self.current_topic_id = Some(topic_id);
        Ok(())
    }

    pub fn set_current_segment(&mut self, segment: Option<Segment>) {
        self.manager.set_current_segment(segment);
    }

    pub fn set_adjacent_segments(&mut self, segments: Vec<Segment>) {
        self.manager.set_adjacent_segments(segments);
    }

    pub fn record_user_question(&mut self, text: impl Into<String>, answered: bool) {
        self.manager.record_user_question(text, answered);
    }

    pub fn record_topic_completion(&mut self, summary: crate::buffers::TopicSummary) {
        self.manager.record_topic_completion(summary);
    }

    pub fn record_clarification_request(&mut self) {
        self.manager.record_clarification_request();
    }

    pub fn record_repetition_request(&mut self) {
        self.manager.record_repetition_request();
    }

    /// Compress episodic history if it has grown past the 5-summary
    /// threshold. Logs and continues on failure rather than propagating —
    /// a failed compression leaves the episodic buffer exactly as it was.
    pub async fn compress_episodic_if_needed(&mut self, cancel: Option<&CancellationToken>) {
        if let Err(e) = self.manager.compress_episodic(cancel).await {
            warn!(error = %e, "episodic compression skipped this turn");
        }
    }

    pub fn update_model_config(&mut self, model_id: &str) {
        self.manager.update_model_config(model_id);
    }

    /// New session: clear every buffer.
    pub fn reset(&mut self) {
        self.manager.reset();
        self.current_topic_id = None;
    }

    pub fn current_curriculum_position(&self) -> Option<&CurriculumPosition> {
        self.manager.semantic_buffer().position.as_ref()
    }
}
