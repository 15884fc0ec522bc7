//! Command handlers for the docask CLI.

pub mod ask;
pub mod models;
pub mod search;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use models::ModelsCommand;
pub use search::SearchCommand;
