//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use bookrag_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Both the system and user templates are rendered with the same variables.
/// Rendering is strict: a template referring to a variable that was not
/// supplied is an error rather than an empty string.
///
/// # Example
/// ```no_run
/// use bookrag_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is a gait cycle?".to_string());
/// vars.insert("context".to_string(), "[1] A gait cycle ...".to_string());
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

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?
        .map(|s| s.trim_end().to_string());
    let user = render_template(&definition.template, &variables)?
        .trim_end()
        .to_string();

    Ok(BuiltPrompt {
        system,
        user,
        prompt_id: definition.id.clone(),
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Book text is plain text, not HTML
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceScope, PromptBehavior};

    fn definition(system: Option<&str>, template: &str) -> PromptDefinition {
        PromptDefinition {
            id: "test.prompt".to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            behavior: PromptBehavior {
                evidence: EvidenceScope::Book,
            },
            system: system.map(str::to_string),
            template: template.to_string(),
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
        let result = render_template("Question: {{question}}", &vars(&[("question", "Why?")]));
        assert_eq!(result.unwrap(), "Question: Why?");
    }

    #[test]
    fn test_book_text_is_not_html_escaped() {
        let result = render_template("{{context}}", &vars(&[("context", "a < b && \"c\"")]));
        assert_eq!(result.unwrap(), "a < b && \"c\"");
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let result = render_template("Question: {{missing}}", &HashMap::new());
        assert!(matches!(result, Err(AppError::Prompt(_))));
    }

    #[test]
    fn test_build_prompt_renders_system_and_user() {
        let def = definition(
            Some("Use only the {{kind}}.\n"),
            "{{context}}\nQUESTION: {{question}}\n",
        );
        let built = build_prompt(
            &def,
            vars(&[
                ("kind", "book"),
                ("context", "[1] Walking is cyclic."),
                ("question", "Is walking cyclic?"),
            ]),
        )
        .unwrap();

        assert_eq!(built.system.as_deref(), Some("Use only the book."));
        assert_eq!(built.user, "[1] Walking is cyclic.\nQUESTION: Is walking cyclic?");
        assert_eq!(built.prompt_id, "test.prompt");
    }

    #[test]
    fn test_build_prompt_without_system() {
        let built = build_prompt(&definition(None, "{{question}}"), vars(&[("question", "q")])).unwrap();
        assert!(built.system.is_none());
    }
}
