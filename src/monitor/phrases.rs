//! Phrase/weight tables for the confidence monitor. Data, not code — hosts
//! can add or override entries at construction time without touching this
//! file.

use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PhraseTables {
    pub hedging: HashMap<String, f32>,
    pub deflection: HashMap<String, f32>,
    pub knowledge_gap: HashMap<String, f32>,
    pub vague: HashMap<String, f32>,
    pub topic_boundary: Vec<String>,
    pub out_of_scope: Vec<String>,
    pub clarification_needed: Vec<String>,
    pub speculation: Vec<String>,
}

fn map(pairs: &[(&str, f32)]) -> HashMap<String, f32> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PhraseTables {
    fn default() -> Self {
        Self {
            hedging: map(&[
                ("i'm not sure", 1.0),
                ("i am not sure", 1.0),
                ("not certain", 0.7),
                ("i think", 0.6),
                ("maybe", 1.0),
                ("perhaps", 0.6),
                ("probably", 0.5),
                ("might be", 0.6),
                ("could be", 0.5),
                ("i guess", 0.5),
                ("roughly", 0.8),
                ("sort of", 0.4),
                ("kind of", 0.4),
            ]),
            deflection: map(&[
                ("let's move on", 0.7),
                ("that's not important", 0.6),
                ("let's focus on something else", 0.7),
                ("we don't need to worry about", 0.6),
                ("good question, but", 0.5),
                ("anyway,", 0.3),
            ]),
            knowledge_gap: map(&[
                ("i don't know", 0.9),
                ("i do not know", 0.9),
                ("no idea", 0.8),
                ("i'm not familiar", 0.7),
                ("i am not familiar", 0.7),
                ("i can't recall", 0.6),
                ("i cannot recall", 0.6),
                ("not sure what", 0.5),
            ]),
            vague: map(&[
                ("roughly", 0.5),
                ("around", 0.4),
                ("stuff", 0.5),
                ("things", 0.4),
                ("whatever", 0.6),
                ("in general", 0.4),
                ("basically", 0.4),
                ("you know", 0.5),
                ("and so on", 0.4),
                ("etc", 0.3),
            ]),
            topic_boundary: list(&[
                "outside my training",
                "beyond the scope of this course",
                "not part of this curriculum",
                "that's a different topic",
                "outside this lesson",
            ]),
            out_of_scope: list(&[
                "outside my training",
                "not something i can help with",
                "beyond what i know",
                "that's outside my expertise",
                "i'm not equipped to",
            ]),
            clarification_needed: list(&[
                "could you clarify",
                "what do you mean by",
                "can you rephrase",
                "i need more context",
                "could you be more specific",
            ]),
            speculation: list(&[
                "i would guess",
                "hypothetically",
                "in theory",
                "it's possible that",
                "speculating",
            ]),
        }
    }
}

impl PhraseTables {
    pub fn register_hedging(&mut self, phrase: impl Into<String>, weight: f32) {
        self.hedging.insert(phrase.into(), weight);
    }

    pub fn register_deflection(&mut self, phrase: impl Into<String>, weight: f32) {
        self.deflection.insert(phrase.into(), weight);
    }

    pub fn register_knowledge_gap(&mut self, phrase: impl Into<String>, weight: f32) {
        self.knowledge_gap.insert(phrase.into(), weight);
    }

    pub fn register_vague(&mut self, phrase: impl Into<String>, weight: f32) {
        self.vague.insert(phrase.into(), weight);
    }
}
