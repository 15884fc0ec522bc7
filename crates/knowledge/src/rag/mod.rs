//! Multi-step question answering over the index.
//!
//! A question is planned into independent searches, each search is answered
//! from its own retrieved excerpts, and the sub-answers are merged into one
//! cited answer. [`AskEngine`] drives the stages and streams [`AskEvent`]s.

pub mod answer;
pub mod ask;
pub mod citations;
pub mod events;
pub mod planner;
pub mod stage;
pub mod synthesis;
pub mod types;

pub use ask::{AskEngine, AskState};
pub use citations::{sanitize_citations, SanitizedText};
pub use events::{AskEvent, AskStream};
pub use stage::StageContext;
pub use types::{FinalAnswer, ModelOverrides, SearchDirective, Strategy, SubAnswer};
