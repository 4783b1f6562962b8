//! Pure, budget-bounded renderers for the four FOV buffers.
//!
//! All four share one primitive: [`BudgetedWriter`], an accumulator that
//! tracks estimated tokens and accepts or rejects candidate blocks. This is
//! the "most leverage-per-line" piece of the reimplementation (see the
//! design notes) — it replaces per-renderer string concatenation with a
//! single, testable truncation primitive.

use super::models::{
    EpisodicBuffer, ImmediateBuffer, Role, SemanticBuffer, WorkingBuffer,
};
use crate::budget::estimate_tokens;

/// Accumulates rendered text under a fixed token budget.
pub struct BudgetedWriter {
    budget_tokens: usize,
    used_tokens: usize,
    buf: String,
}

impl BudgetedWriter {
    pub fn new(budget_tokens: usize) -> Self {
        Self {
            budget_tokens,
            used_tokens: 0,
            buf: String::new(),
        }
    }

    pub fn remaining_tokens(&self) -> usize {
        self.budget_tokens.saturating_sub(self.used_tokens)
    }

    /// Append unconditionally, regardless of remaining budget. Used for the
    /// one always-included block per renderer (the barge-in utterance).
    pub fn push_always(&mut self, text: &str) {
        self.buf.push_str(text);
        self.used_tokens += estimate_tokens(text);
    }

    /// Append `text` only if it fits entirely within the remaining budget.
    /// Returns whether it was included. This is the atomic "skip whole
    /// section" behavior used by every candidate except the truncating ones.
    pub fn try_push(&mut self, text: &str) -> bool {
        if estimate_tokens(text) <= self.remaining_tokens() {
            self.buf.push_str(text);
            self.used_tokens += estimate_tokens(text);
            true
        } else {
            false
        }
    }

    /// Append as much of `text` as fits the remaining budget, truncating at
    /// a character boundary and appending `suffix` if truncation occurred.
    /// Delegates to [`Self::push_truncated_block`] with an empty prefix.
    pub fn push_truncated(&mut self, text: &str, suffix: &str) {
        self.push_truncated_block("", text, suffix);
    }

    /// Append `prefix` + (as much of `text` as fits) + `suffix`, reserving
    /// `prefix`'s and `suffix`'s own byte cost out of the remaining budget
    /// before computing the truncation point, so the whole block — affixes
    /// included — never pushes the running total past `budget_tokens`. If
    /// there isn't even room for the affixes, the block is omitted entirely
    /// rather than force-included.
    pub fn push_truncated_block(&mut self, prefix: &str, text: &str, suffix: &str) {
        let remaining_chars = self.remaining_tokens() * 4;
        let reserved = prefix.len() + suffix.len();
        if reserved > remaining_chars {
            return;
        }
        let available_for_text = remaining_chars - reserved;

        let mut block = String::new();
        block.push_str(prefix);
        if text.len() <= available_for_text {
            block.push_str(text);
        } else {
            let cut = floor_char_boundary(text, available_for_text);
            block.push_str(&text[..cut]);
            block.push_str(suffix);
        }
        self.push_always(&block);
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Render the immediate buffer. Layout: barge-in line (always present if
/// set), then recent turns (reverse chronological, inserted right after the
/// barge-in block), then the current-segment line. Inclusion decisions are
/// made in priority order (barge-in, segment, turns) so that property 4
/// (no later-priority section included while an earlier one is skipped)
/// holds even though turns are displayed before the segment line.
pub fn render_immediate(buffer: &ImmediateBuffer, budget_tokens: usize) -> String {
    let mut w = BudgetedWriter::new(budget_tokens);

    if let Some(barge_in) = &buffer.barge_in {
        w.push_always(&format!(
            "The user just interrupted with: \"{}\"",
            barge_in
        ));
    }

    let segment_line = buffer
        .current_segment
        .as_ref()
        .map(|s| format!("\nCurrently teaching: {}", s.title));
    let segment_fits = segment_line
        .as_ref()
        .map(|line| estimate_tokens(line) <= w.remaining_tokens())
        .unwrap_or(false);

    // Segment's cost is reserved now (decision made in priority order) but
    // spent only after turns are appended, so the display order puts turns
    // before the segment line.
    let mut turns_text = String::new();
    let mut remaining_for_turns = w.remaining_tokens();
    if segment_fits {
        remaining_for_turns = remaining_for_turns
            .saturating_sub(estimate_tokens(segment_line.as_ref().unwrap()));
    }
    for turn in buffer.recent_turns.iter().rev() {
        let label = match turn.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        let line = format!("\n[{}]: {}", label, turn.content);
        let cost = estimate_tokens(&line);
        if cost <= remaining_for_turns {
            turns_text.push_str(&line);
            remaining_for_turns -= cost;
        }
        // smaller/later turns still get a chance even if this one was skipped
    }
    w.push_always(&turns_text);

    if let Some(line) = segment_line {
        if segment_fits {
            w.push_always(&line);
        }
    }

    w.into_string()
}

/// Render the working buffer: title+outline (truncated, never skipped),
/// then objectives / glossary / misconceptions, each included only if it
/// fits whole. Alternative explanations are intentionally not rendered.
pub fn render_working(buffer: &WorkingBuffer, budget_tokens: usize) -> String {
    let mut w = BudgetedWriter::new(budget_tokens);

    let header = format!("Topic: {}\n", buffer.topic_title);
    if estimate_tokens(&header) <= w.remaining_tokens() {
        w.push_always(&header);
        w.push_truncated(&buffer.outline, "");
    } else {
        // the header itself would blow the budget; truncate it like any
        // other candidate section instead of force-including it (the title
        // header is not the barge-in's always-included exception).
        w.push_truncated(&header, "");
    }

    if !buffer.learning_objectives.is_empty() {
        let mut block = String::from("\n\nLearning objectives:");
        for obj in &buffer.learning_objectives {
            block.push_str(&format!("\n- {}", obj));
        }
        w.try_push(&block);
    }

    if !buffer.glossary.is_empty() {
        let mut block = String::from("\n\nGlossary:");
        for term in &buffer.glossary {
            match &term.spoken_form {
                Some(spoken) => block.push_str(&format!(
                    "\n- {} ({}): {}",
                    term.term, spoken, term.definition
                )),
                None => block.push_str(&format!("\n- {}: {}", term.term, term.definition)),
            }
        }
        w.try_push(&block);
    }

    if !buffer.misconceptions.is_empty() {
        let mut block = String::from("\n\nCommon misconceptions:");
        for trigger in &buffer.misconceptions {
            block.push_str(&format!(
                "\nIf student says '{}': {}",
                trigger.trigger_phrase, trigger.remediation
            ));
        }
        w.try_push(&block);
    }

    w.into_string()
}

/// Render the episodic buffer: learner-signals line, then up to the last
/// five topic summaries, then up to the last three user questions.
pub fn render_episodic(buffer: &EpisodicBuffer, budget_tokens: usize) -> String {
    let mut w = BudgetedWriter::new(budget_tokens);

    let signals = &buffer.learner_signals;
    let pace = signals
        .pace
        .map(|p| format!("{:?}", p))
        .unwrap_or_else(|| "unknown".to_string());
    let signals_line = format!(
        "Learner profile: pace={}, clarifications={}, repetitions={}",
        pace.to_lowercase(),
        signals.clarification_count,
        signals.repetition_count
    );
    w.try_push(&signals_line);

    if !buffer.topic_summaries.is_empty() {
        let mut block = String::from("\n\nRecent topics:");
        for summary in buffer.topic_summaries.iter().rev().take(5) {
            block.push_str(&format!(
                "\n- {} (mastery {:.0}%): {}",
                summary.title,
                summary.mastery_level * 100.0,
                summary.summary
            ));
        }
        w.try_push(&block);
    }

    if !buffer.recent_questions.is_empty() {
        let mut block = String::from("\n\nRecent questions:");
        for q in buffer.recent_questions.iter().rev().take(3) {
            block.push_str(&format!(
                "\n- {} [{}]",
                q.text,
                if q.answered { "answered" } else { "unanswered" }
            ));
        }
        w.try_push(&block);
    }

    w.into_string()
}

/// Render the semantic buffer: position line (atomic), then the outline
/// (truncated with an ellipsis suffix if it does not fit whole).
pub fn render_semantic(buffer: &SemanticBuffer, budget_tokens: usize) -> String {
    let mut w = BudgetedWriter::new(budget_tokens);

    if let Some(pos) = &buffer.position {
        let pct = if pos.total_topics > 0 {
            (pos.current_topic_index as f32 / pos.total_topics as f32 * 100.0).round() as u32
        } else {
            0
        };
        let unit = pos.current_unit_title.as_deref().unwrap_or("—");
        let line = format!(
            "Course {} | Unit {} | Progress: topic {} of {} ({}%)",
            pos.curriculum_title, unit, pos.current_topic_index + 1, pos.total_topics, pct
        );
        w.try_push(&line);
    }

    if !buffer.outline.is_empty() {
        let prefix = if w.remaining_tokens() < w.budget_tokens {
            "\n\n"
        } else {
            ""
        };
        // both affixes are reserved out of the remaining budget by
        // push_truncated_block before the cut point is chosen, so the
        // position line, the separator, the outline slice, and the
        // ellipsis together never exceed budget_tokens.
        w.push_truncated_block(prefix, &buffer.outline, "…");
    }

    w.into_string()
}
