//! MCP `add_failure` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `add_failure` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddFailureParams {
    /// What was tried.
    #[schemars(description = "What was tried. Required.")]
    pub attempt: String,

    /// Why it failed.
    #[schemars(description = "Why it failed. Required.")]
    pub reason_failed: String,

    /// What was learned.
    #[schemars(description = "What was learned. Required.")]
    pub lesson_learned: String,

    /// What was done instead, if anything.
    #[schemars(description = "What was done instead, if anything.")]
    pub alternative_solution: Option<String>,

    /// Where this knowledge came from.
    #[schemars(description = "Where this knowledge came from, e.g. a conversation reference.")]
    pub source: Option<String>,

    /// Project name. Defaults to the configured default project.
    #[schemars(description = "Project name. Defaults to the configured default project.")]
    pub project: Option<String>,
}
