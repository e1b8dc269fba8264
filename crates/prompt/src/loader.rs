//! Prompt loader for YAML prompt definitions.
//!
//! Workspace files in `.bookrag/prompts/` shadow the built-in prompts of the
//! same id.

use crate::builtin::{builtin_ids, builtin_source};
use crate::types::PromptDefinition;
use bookrag_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Directory, relative to the workspace, holding prompt overrides.
pub const PROMPTS_DIR: &str = ".bookrag/prompts";

/// Load a prompt definition by ID.
///
/// Looks for `<id>.yml` in `.bookrag/prompts/` first and falls back to the
/// built-in definition.
///
/// # Example
/// ```no_run
/// use bookrag_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "book.answer.full")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompt_path(workspace_path, prompt_id);

    let definition = if prompt_file.exists() {
        tracing::debug!("Loading prompt from: {:?}", prompt_file);
        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;
        parse_prompt(&contents, &prompt_file.display().to_string())?
    } else if let Some(source) = builtin_source(prompt_id) {
        tracing::debug!("Using built-in prompt: {}", prompt_id);
        parse_prompt(source, "built-in")?
    } else {
        return Err(AppError::Prompt(format!(
            "Prompt not found: {} (no built-in and no {:?})",
            prompt_id, prompt_file
        )));
    };

    if definition.id != prompt_id {
        return Err(AppError::Prompt(format!(
            "Prompt file declares id '{}' but was requested as '{}'",
            definition.id, prompt_id
        )));
    }

    tracing::debug!("Loaded prompt: {} ({})", definition.id, definition.title);
    Ok(definition)
}

/// List all available prompt IDs: built-ins plus workspace overrides, sorted.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let mut prompt_ids: Vec<String> = builtin_ids().map(str::to_string).collect();

    let prompts_dir = workspace_path.join(PROMPTS_DIR);
    if prompts_dir.exists() {
        for entry in walkdir::WalkDir::new(&prompts_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    prompt_ids.push(stem.to_string());
                }
            }
        }
    }

    prompt_ids.sort();
    prompt_ids.dedup();
    Ok(prompt_ids)
}

fn prompt_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.yml", prompt_id))
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML ({}): {}", origin, e))
    })?;
    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: '{}'. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
