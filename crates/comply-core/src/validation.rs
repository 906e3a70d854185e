//! Pre-flight request checks, run before any network I/O.

use crate::error::ValidationError;
use crate::protocol::{ActionRequest, CancelRequest, CommandRequest, ProgressRequest, SuggestRequest};

pub const MAX_COMMAND_LENGTH: usize = 1000;
pub const MAX_SUGGEST_INPUT_LENGTH: usize = 500;
pub const MAX_WORKFLOW_ID_LENGTH: usize = 100;

type Result = std::result::Result<(), ValidationError>;

pub fn validate_command(request: &CommandRequest) -> Result {
    validate_command_text("command", &request.command)
}

pub fn validate_action(request: &ActionRequest) -> Result {
    validate_command_text("action", &request.action)?;
    if let Some(workflow_id) = &request.workflow_id {
        validate_workflow_id(workflow_id)?;
    }
    Ok(())
}

/// Empty input is allowed: it asks for the application's top-level suggestions.
pub fn validate_suggest(request: &SuggestRequest) -> Result {
    if request.input.chars().count() > MAX_SUGGEST_INPUT_LENGTH {
        return Err(ValidationError::new(
            "input",
            format!("must be at most {MAX_SUGGEST_INPUT_LENGTH} characters"),
        ));
    }
    Ok(())
}

pub fn validate_progress(request: &ProgressRequest) -> Result {
    if request.operation_id.trim().is_empty() {
        return Err(ValidationError::new("operationId", "must not be empty"));
    }
    Ok(())
}

pub fn validate_cancel(request: &CancelRequest) -> Result {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

    if !present(&request.operation_id) && !present(&request.workflow_id) {
        return Err(ValidationError::new(
            "operationId",
            "either operationId or workflowId is required",
        ));
    }
    if let Some(workflow_id) = request.workflow_id.as_deref().filter(|id| !id.is_empty()) {
        validate_workflow_id(workflow_id)?;
    }
    Ok(())
}

/// Workflow IDs are 1-100 characters of `[A-Za-z0-9_-]`.
pub fn validate_workflow_id(workflow_id: &str) -> Result {
    let length = workflow_id.chars().count();
    if length == 0 || length > MAX_WORKFLOW_ID_LENGTH {
        return Err(ValidationError::new(
            "workflowId",
            format!("must be 1-{MAX_WORKFLOW_ID_LENGTH} characters"),
        ));
    }
    if !workflow_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::new(
            "workflowId",
            "may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

fn validate_command_text(field: &str, text: &str) -> Result {
    if text.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    if text.chars().count() > MAX_COMMAND_LENGTH {
        return Err(ValidationError::new(
            field,
            format!("must be at most {MAX_COMMAND_LENGTH} characters"),
        ));
    }
    Ok(())
}
