//! Context manager integration: expansion effect and session isolation.

use chrono::Utc;
use fov_context::budget_for;
use fov_context::buffers::{CurriculumPosition, Role, Turn};
use fov_context::expansion::{apply_expansion, RetrievedContent};
use fov_context::ContextManager;

fn turn(role: Role, content: &str) -> Turn {
    Turn { role, content: content.to_string(), timestamp: Utc::now() }
}

#[test]
fn expansion_effect_surfaces_in_next_build_context() {
    let mut manager = ContextManager::new("You are a tutor.", budget_for(200_000));
    manager.update_working_buffer("Photosynthesis", "Plants convert light.", vec![], vec![], vec![]);

    let result = fov_context::expansion::ExpansionResult {
        items: vec![
            RetrievedContent {
                source_title: "Chlorophyll deep dive".to_string(),
                content: "Chlorophyll absorbs red and blue light.".to_string(),
                relevance: 1.0,
                estimated_tokens: 10,
            },
            RetrievedContent {
                source_title: "Light-dependent reactions".to_string(),
                content: "These occur in the thylakoid membrane.".to_string(),
                relevance: 0.8,
                estimated_tokens: 9,
            },
        ],
        total_tokens: 19,
    };
    apply_expansion(&mut manager, &result);

    let ctx = manager.build_context(&[turn(Role::User, "why do plants need light")], None);
    assert!(ctx.working_text.contains("## Additional Context"));
    assert!(ctx.working_text.contains("Chlorophyll deep dive"));
    assert!(ctx.working_text.contains("Light-dependent reactions"));
}

#[test]
fn empty_expansion_result_leaves_working_buffer_untouched() {
    let mut manager = ContextManager::new("You are a tutor.", budget_for(200_000));
    manager.update_working_buffer("Photosynthesis", "Plants convert light.", vec![], vec![], vec![]);
    let empty = fov_context::expansion::ExpansionResult::default();
    apply_expansion(&mut manager, &empty);
    let ctx = manager.build_context(&[], None);
    assert!(!ctx.working_text.contains("## Additional Context"));
}

#[test]
fn two_sessions_are_fully_isolated() {
    let mut s1 = ContextManager::new("Session one prompt", budget_for(200_000));
    let mut s2 = ContextManager::new("Session two prompt", budget_for(200_000));

    s1.update_working_buffer("Topic A", "Content A", vec!["Objective A".to_string()], vec![], vec![]);
    s1.update_semantic_buffer(
        "Outline A".to_string(),
        CurriculumPosition {
            curriculum_title: "Curriculum A".to_string(),
            current_topic_index: 1,
            total_topics: 5,
            current_unit_title: None,
        },
        vec![],
    );
    s1.record_user_question("Why A?", false);
    s1.record_clarification_request();

    // s2 untouched by any of the above.
    assert_eq!(s2.working_buffer().topic_title, "");
    assert!(s2.semantic_buffer().position.is_none());
    assert!(s2.episodic_buffer().recent_questions.is_empty());
    assert_eq!(s2.episodic_buffer().learner_signals.clarification_count, 0);

    let ctx1 = s1.build_context(&[turn(Role::User, "hi from s1")], None);
    let ctx2 = s2.build_context(&[turn(Role::User, "hi from s2")], None);
    assert!(ctx1.to_system_message().contains("Session one prompt"));
    assert!(ctx2.to_system_message().contains("Session two prompt"));
    assert!(!ctx2.to_system_message().contains("Topic A"));
}

#[test]
fn assembly_determinism_across_repeated_calls_with_same_state() {
    let mut manager = ContextManager::new("P", budget_for(64_000));
    manager.update_working_buffer("Stable topic", "Stable content", vec![], vec![], vec![]);
    let history = vec![turn(Role::User, "a fixed question")];
    let first = manager.build_context(&history, None).to_system_message();
    let second = manager.build_context(&history, None).to_system_message();
    let third = manager.build_context(&history, None).to_system_message();
    assert_eq!(first, second);
    assert_eq!(second, third);
}
