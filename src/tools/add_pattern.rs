//! MCP `add_pattern` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `add_pattern` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddPatternParams {
    /// Short name of the pattern.
    #[schemars(description = "Short name of the pattern. Required.")]
    pub name: String,

    /// How the pattern is implemented.
    #[schemars(description = "How the pattern is implemented. Required.")]
    pub implementation: String,

    /// When the pattern applies. Must be at least 10 characters.
    #[schemars(description = "When the pattern applies. Required, at least 10 characters.")]
    pub context: String,

    /// Concrete situations where the pattern was used.
    #[schemars(description = "Concrete situations where the pattern has been used.")]
    pub use_cases: Option<Vec<String>>,

    /// Where this knowledge came from.
    #[schemars(description = "Where this knowledge came from, e.g. a conversation reference.")]
    pub source: Option<String>,

    /// Project name. Defaults to the configured default project.
    #[schemars(description = "Project name. Defaults to the configured default project.")]
    pub project: Option<String>,
}
