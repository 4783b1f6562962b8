//! Wires a `SessionCoordinator` to an in-memory curriculum and walks through
//! one tutoring turn: set a topic, assemble a foveated context, score an
//! uncertain reply, and act on the resulting expansion recommendation.

use async_trait::async_trait;
use fov_context::buffers::{CurriculumPosition, GlossaryTerm, MisconceptionTrigger, Role, Turn};
use fov_context::expansion::{CurriculumError, CurriculumPort, TopicMetadata};
use fov_context::{budget_for, SessionCoordinator};
use std::sync::Arc;

struct InMemoryCurriculum;

#[async_trait]
impl CurriculumPort for InMemoryCurriculum {
    async fn topic_metadata(&self, topic_id: &str) -> Result<TopicMetadata, CurriculumError> {
        Ok(TopicMetadata {
            topic_id: topic_id.to_string(),
            title: "Photosynthesis".to_string(),
            unit_title: "Plant Biology".to_string(),
            previous_topic_id: Some("cell-structure".to_string()),
            next_topic_id: Some("cellular-respiration".to_string()),
            learning_objectives: vec![
                "Explain the role of chlorophyll".to_string(),
                "Describe the light-dependent reactions".to_string(),
            ],
            outline: "Plants convert light energy into chemical energy stored in glucose."
                .to_string(),
        })
    }

    async fn glossary_for(&self, _topic_id: &str) -> Result<Vec<GlossaryTerm>, CurriculumError> {
        Ok(vec![GlossaryTerm {
            term: "chlorophyll".to_string(),
            definition: "the green pigment that absorbs light for photosynthesis".to_string(),
            spoken_form: Some("KLOR-oh-fil".to_string()),
        }])
    }

    async fn misconceptions_for(
        &self,
        _topic_id: &str,
    ) -> Result<Vec<MisconceptionTrigger>, CurriculumError> {
        Ok(vec![MisconceptionTrigger {
            trigger_phrase: "plants eat soil".to_string(),
            misconception: "students often think plants get their mass from soil".to_string(),
            remediation: "most of a plant's mass comes from carbon dioxide in the air".to_string(),
        }])
    }

    async fn compressed_outline(&self, _topic_id: &str) -> Result<String, CurriculumError> {
        Ok("Unit 3: Plant Biology — cell structure, photosynthesis, cellular respiration"
            .to_string())
    }

    async fn topic_position(&self, _topic_id: &str) -> Result<CurriculumPosition, CurriculumError> {
        Ok(CurriculumPosition {
            curriculum_title: "Introductory Biology".to_string(),
            current_topic_index: 4,
            total_topics: 12,
            current_unit_title: Some("Plant Biology".to_string()),
        })
    }

    async fn generate_context_for_query(
        &self,
        query: &str,
        topic_id: &str,
        _max_tokens: usize,
    ) -> Result<String, CurriculumError> {
        Ok(format!("[retrieved passage for '{}' near topic {}]", query, topic_id))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut coordinator = SessionCoordinator::new(
        "You are a patient biology tutor speaking to a high-school student.",
        budget_for(128_000),
    )
    .with_curriculum_port(Arc::new(InMemoryCurriculum));

    coordinator.set_current_topic("photosynthesis").await?;

    let history = vec![Turn {
        role: Role::User,
        content: "So why do plants need sunlight again?".to_string(),
        timestamp: chrono::Utc::now(),
    }];
    let messages = coordinator.build_foveated_messages(&history, None);
    println!("--- system message ---\n{}\n", messages[0].content);

    let reply = "I'm not sure, but I think it's roughly around photosynthesis, maybe.";
    if let Some(result) = coordinator
        .analyze_and_maybe_expand(reply, "why do plants need sunlight")
        .await?
    {
        println!("expanded with {} retrieved item(s)", result.items.len());
    }

    Ok(())
}
