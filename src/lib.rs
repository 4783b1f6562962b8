//! Foveated Context Management: token-budgeted, priority-ordered context
//! assembly for a streaming voice-tutoring LLM. See each module for the
//! piece of the system it owns.

pub mod budget;
pub mod buffers;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod expansion;
pub mod manager;
pub mod metrics;
pub mod monitor;
pub mod summarizer;

pub use budget::{budget_for, estimate_tokens, BudgetConfig, ModelWindowTable, Tier};
pub use coordinator::{Message, SessionCoordinator};
pub use error::{FovError, Result};
pub use expansion::{CurriculumPort, ExpansionHandler, ExpansionRequest, ExpansionResult, Scope};
pub use manager::{AssembledContext, ContextManager};
pub use monitor::{ConfidenceMonitor, ConfidenceRecord, ExpansionRecommendation, Marker, Priority, Trend};
pub use summarizer::{LlmSummarizer, LlmSummarizerConfig, Summarizer, TruncatingSummarizer};
