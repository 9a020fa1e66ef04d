//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use epiqa_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every parameter declared in `definition.params` must be present in
/// `variables`; undeclared variables referenced by the template render empty.
///
/// # Example
/// ```no_run
/// use epiqa_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "How many cases in 2023?".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .params
        .iter()
        .filter(|param| !variables.contains_key(param.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing parameters: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let user = render_template(&definition.template, &variables)?;
    let system = definition
        .system
        .as_deref()
        .map(|system| render_template(system, &variables))
        .transpose()?
        .map(|system| system.trim().to_string())
        .filter(|system| !system.is_empty());

    Ok(BuiltPrompt::new(
        system,
        user.trim_end().to_string(),
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(system: Option<&str>) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            system: system.map(str::to_string),
            template: "Question: {{question}}\n".to_string(),
            params: vec!["question".to_string()],
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{question}}", &vars(&[("question", "a < b")]));
        assert_eq!(result.unwrap(), "Question: a < b");
    }

    #[test]
    fn test_build_prompt_renders_system_and_user() {
        let def = definition(Some("Use table '{{question}}'"));
        let built = build_prompt(&def, vars(&[("question", "srag_cases")])).unwrap();

        assert_eq!(built.user, "Question: srag_cases");
        assert_eq!(built.system.as_deref(), Some("Use table 'srag_cases'"));
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_missing_param() {
        let def = definition(None);
        let result = build_prompt(&def, HashMap::new());
        match result {
            Err(AppError::Prompt(msg)) => assert!(msg.contains("question")),
            other => panic!("Expected prompt error, got {:?}", other),
        }
    }

    #[test]
    fn test_render_template_unknown_variable_is_empty() {
        let result = render_template("Rows: {{row_count}}", &HashMap::new());
        assert_eq!(result.unwrap(), "Rows: ");
    }
}
