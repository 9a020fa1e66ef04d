//! Command handlers for the epiqa CLI.

pub mod ask;
pub mod chat;
pub mod index;
pub mod prompts;
pub mod schema;
mod setup;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use index::IndexCommand;
pub use prompts::PromptsCommand;
pub use schema::SchemaCommand;
