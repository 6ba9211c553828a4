//! MCP `find_related` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `find_related` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindRelatedParams {
    /// Node id to start from (e.g. `D-1a2b3c4d`).
    #[schemars(description = "Node id to start from, e.g. 'D-1a2b3c4d'.")]
    pub id: String,

    /// Maximum traversal depth in hops. Defaults to 2.
    #[schemars(description = "Maximum traversal depth in hops. Defaults to 2.")]
    pub depth: Option<usize>,
}
