//! MCP `add_decision` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `add_decision` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddDecisionParams {
    /// What was decided.
    #[schemars(description = "What was decided. Required, must not be empty.")]
    pub description: String,

    /// Why this choice was made.
    #[schemars(description = "Why this choice was made.")]
    pub rationale: Option<String>,

    /// Options that were considered and rejected.
    #[schemars(description = "Options that were considered and rejected.")]
    pub alternatives: Option<Vec<String>>,

    /// Ids of nodes this decision relates to (advisory metadata, no edges are created).
    #[schemars(
        description = "Ids of existing nodes this decision relates to. Stored as metadata; relationship extraction creates the actual edges."
    )]
    pub related_to: Option<Vec<String>>,

    /// Where this knowledge came from (e.g. a conversation or document reference).
    #[schemars(description = "Where this knowledge came from, e.g. a conversation reference.")]
    pub source: Option<String>,

    /// Project name. Defaults to the configured default project.
    #[schemars(description = "Project name. Defaults to the configured default project.")]
    pub project: Option<String>,
}
