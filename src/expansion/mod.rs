//! Curriculum retrieval port and expansion handler.
//!
//! `CurriculumPort` is host-provided: the crate never reaches into a
//! curriculum store itself, only through this trait object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::buffers::{CurriculumPosition, GlossaryTerm, MisconceptionTrigger};
use crate::manager::ContextManager;

#[derive(Debug, Error)]
pub enum CurriculumError {
    #[error("curriculum lookup failed: {0}")]
    Lookup(String),
    #[error("topic not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    CurrentTopic,
    CurrentUnit,
    FullCurriculum,
    RelatedTopics,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::CurrentTopic => "currentTopic",
            Scope::CurrentUnit => "currentUnit",
            Scope::FullCurriculum => "fullCurriculum",
            Scope::RelatedTopics => "relatedTopics",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpansionRequest {
    pub query: String,
    pub scope: Scope,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetrievedContent {
    pub source_title: String,
    pub content: String,
    pub relevance: f32,
    pub estimated_tokens: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExpansionResult {
    pub items: Vec<RetrievedContent>,
    pub total_tokens: usize,
}

/// Host-provided access to curriculum content. The crate only ever calls
/// through this trait; it has no knowledge of how topics, units, or a
/// curriculum outline are actually stored.
#[async_trait]
pub trait CurriculumPort: Send + Sync {
    async fn topic_metadata(&self, topic_id: &str) -> Result<TopicMetadata, CurriculumError>;
    async fn glossary_for(&self, topic_id: &str) -> Result<Vec<GlossaryTerm>, CurriculumError>;
    async fn misconceptions_for(
        &self,
        topic_id: &str,
    ) -> Result<Vec<MisconceptionTrigger>, CurriculumError>;
    async fn compressed_outline(&self, topic_id: &str) -> Result<String, CurriculumError>;
    async fn topic_position(&self, topic_id: &str) -> Result<CurriculumPosition, CurriculumError>;
    async fn generate_context_for_query(
        &self,
        query: &str,
        topic_id: &str,
        max_tokens: usize,
    ) -> Result<String, CurriculumError>;
}

#[derive(Debug, Clone)]
pub struct TopicMetadata {
    pub topic_id: String,
    pub title: String,
    pub unit_title: String,
    pub previous_topic_id: Option<String>,
    pub next_topic_id: Option<String>,
    pub learning_objectives: Vec<String>,
    pub outline: String,
}

/// Executes an `ExpansionRequest` against a `CurriculumPort`, honoring the
/// four scope semantics, then hands the retrieved content to the manager's
/// working buffer.
pub struct ExpansionHandler {
    port: Arc<dyn CurriculumPort>,
    max_retrieval_tokens: usize,
}

impl ExpansionHandler {
    /// `max_retrieval_tokens` is the per-request cap passed into the
    /// `CurriculumPort` (config option of the same name, §6); defaults to
    /// 2000 estimated tokens per spec.md §4.5 if constructed via `new`.
    pub fn new(port: Arc<dyn CurriculumPort>) -> Self {
        Self::with_max_retrieval_tokens(port, 2_000)
    }

    pub fn with_max_retrieval_tokens(port: Arc<dyn CurriculumPort>, max_retrieval_tokens: usize) -> Self {
        Self {
            port,
            max_retrieval_tokens,
        }
    }

    /// Direct access to the underlying port, for callers (the coordinator)
    /// that need operations `execute` doesn't cover, like loading a new
    /// topic's metadata.
    pub fn port_handle(&self) -> Arc<dyn CurriculumPort> {
        Arc::clone(&self.port)
    }

    pub async fn execute(
        &self,
        request: ExpansionRequest,
        current_topic_id: &str,
    ) -> Result<ExpansionResult, CurriculumError> {
        let scope = self.resolve_scope(request.scope);
        debug!(scope = scope.as_str(), query = %request.query, "executing expansion request");

        let items = match scope {
            Scope::CurrentTopic => self.expand_current_topic(current_topic_id, &request.query).await?,
            Scope::CurrentUnit | Scope::RelatedTopics => {
                self.expand_current_unit(current_topic_id, &request.query).await?
            }
            Scope::FullCurriculum => self.expand_full_curriculum(current_topic_id, &request.query).await?,
        };

        let total_tokens = items.iter().map(|i| i.estimated_tokens).sum();
        crate::metrics::METRICS.record_expansion_request(scope.as_str());
        Ok(ExpansionResult { items, total_tokens })
    }

    /// `relatedTopics` has no independent retrieval strategy yet; it falls
    /// through to `currentUnit`. Isolated here so a dedicated related-topic
    /// lookup can replace this without touching `execute`'s dispatch.
    fn resolve_scope(&self, scope: Scope) -> Scope {
        match scope {
            Scope::RelatedTopics => Scope::CurrentUnit,
            other => other,
        }
    }

    async fn expand_current_topic(
        &self,
        topic_id: &str,
        query: &str,
    ) -> Result<Vec<RetrievedContent>, CurriculumError> {
        let metadata = self.port.topic_metadata(topic_id).await?;
        let cap = self.max_retrieval_tokens;
        let content = self
            .port
            .generate_context_for_query(query, topic_id, cap)
            .await?;
        Ok(vec![RetrievedContent {
            source_title: metadata.title,
            estimated_tokens: crate::budget::estimate_tokens(&content),
            content,
            relevance: 1.0,
        }])
    }

    async fn expand_current_unit(
        &self,
        topic_id: &str,
        query: &str,
    ) -> Result<Vec<RetrievedContent>, CurriculumError> {
        let metadata = self.port.topic_metadata(topic_id).await?;
        let cap = self.max_retrieval_tokens;
        let mut items = vec![RetrievedContent {
            source_title: metadata.title.clone(),
            content: self
                .port
                .generate_context_for_query(query, topic_id, cap)
                .await?,
            relevance: 1.0,
            estimated_tokens: 0,
        }];

        if let Some(prev_id) = &metadata.previous_topic_id {
            match self.port.topic_metadata(prev_id).await {
                Ok(prev_meta) => {
                    let content = self
                        .port
                        .generate_context_for_query(query, prev_id, cap / 3)
                        .await?;
                    items.push(RetrievedContent {
                        source_title: prev_meta.title,
                        content,
                        relevance: 0.8,
                        estimated_tokens: 0,
                    });
                }
                Err(e) => warn!(error = %e, "failed to look up previous topic during expansion"),
            }
        }
        if let Some(next_id) = &metadata.next_topic_id {
            match self.port.topic_metadata(next_id).await {
                Ok(next_meta) => {
                    let content = self
                        .port
                        .generate_context_for_query(query, next_id, cap / 3)
                        .await?;
                    items.push(RetrievedContent {
                        source_title: next_meta.title,
                        content,
                        relevance: 0.7,
                        estimated_tokens: 0,
                    });
                }
                Err(e) => warn!(error = %e, "failed to look up next topic during expansion"),
            }
        }

        for item in &mut items {
            item.estimated_tokens = crate::budget::estimate_tokens(&item.content);
        }
        Ok(items)
    }

    async fn expand_full_curriculum(
        &self,
        topic_id: &str,
        query: &str,
    ) -> Result<Vec<RetrievedContent>, CurriculumError> {
        let position = self.port.topic_position(topic_id).await?;
        let probe_count = position.total_topics.min(10);
        let cap = self.max_retrieval_tokens / 5;

        let mut items = Vec::with_capacity(probe_count);
        for offset in 0..probe_count {
            let probe_id = format!("{}#{}", topic_id, offset);
            let content = match self
                .port
                .generate_context_for_query(query, &probe_id, cap)
                .await
            {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, probe = %probe_id, "skipping unreachable topic during full-curriculum expansion");
                    continue;
                }
            };
            let relevance = 1.0 - (offset as f32 / probe_count.max(1) as f32) * 0.5;
            items.push(RetrievedContent {
                source_title: probe_id,
                estimated_tokens: crate::budget::estimate_tokens(&content),
                content,
                relevance,
            });
        }

        items.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap());
        items.truncate(5);
        Ok(items)
    }
}

/// Applies a completed expansion to a manager's working buffer.
pub fn apply_expansion(manager: &mut ContextManager, result: &ExpansionResult) {
    if result.items.is_empty() {
        return;
    }
    manager.expand_working_buffer(&result.items);
}
