//! Prompt system for epiqa.
//!
//! Every language-model call in the workspace is phrased by a YAML prompt
//! definition. Definitions ship built into the binary and can be overridden
//! per workspace by dropping `<id>.yml` into `.epiqa/prompts/`.
//!
//! - YAML-based prompt definitions
//! - Handlebars template rendering (no HTML escaping)
//! - Declared parameters checked before rendering

pub mod builder;
pub mod library;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use library::PromptLibrary;
pub use loader::{list_prompts, load_prompt, parse_prompt, BUILTIN_PROMPTS};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
