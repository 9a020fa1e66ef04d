//! In-memory prompt library resolved once per process.

use crate::builder::build_prompt;
use crate::loader::{load_prompt, BUILTIN_PROMPTS};
use crate::types::{BuiltPrompt, PromptDefinition};
use epiqa_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// All prompt definitions the generators need, with workspace overrides applied.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    prompts: HashMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Load every built-in prompt id, honouring overrides in `workspace_path`.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut prompts = HashMap::new();
        for (id, _) in BUILTIN_PROMPTS {
            prompts.insert(id.to_string(), load_prompt(workspace_path, id)?);
        }
        tracing::debug!(count = prompts.len(), "Prompt library loaded");
        Ok(Self { prompts })
    }

    /// Library with built-in definitions only.
    pub fn builtin() -> AppResult<Self> {
        let mut prompts = HashMap::new();
        for (id, contents) in BUILTIN_PROMPTS {
            prompts.insert(id.to_string(), crate::loader::parse_prompt(contents, "built-in")?);
        }
        Ok(Self { prompts })
    }

    /// Look up a definition by id.
    pub fn get(&self, id: &str) -> AppResult<&PromptDefinition> {
        self.prompts
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", id)))
    }

    /// Build the prompt `id` from `(name, value)` pairs.
    pub fn render(&self, id: &str, variables: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        let vars = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_prompt(self.get(id)?, vars)
    }
}
