//! MCP `query_decisions` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `query_decisions` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct QueryDecisionsParams {
    /// Natural language query. An empty query returns the most recent nodes.
    #[schemars(
        description = "Natural language query. Empty returns the most recent nodes instead of a ranked search."
    )]
    pub query: Option<String>,

    /// Filter by node kinds: `"decision"`, `"pattern"`, `"failure"`.
    #[schemars(description = "Filter by node kinds: 'decision', 'pattern', 'failure'.")]
    pub kinds: Option<Vec<String>>,

    /// Filter by project name.
    #[schemars(description = "Filter by project name.")]
    pub project: Option<String>,

    /// RFC 3339 start of an inclusive created-at range. Requires `end`.
    #[schemars(description = "RFC 3339 start of an inclusive created-at range. Requires 'end'.")]
    pub start: Option<String>,

    /// RFC 3339 end of an inclusive created-at range. Requires `start`.
    #[schemars(description = "RFC 3339 end of an inclusive created-at range. Requires 'start'.")]
    pub end: Option<String>,

    /// Maximum number of results. Defaults to 10.
    #[schemars(description = "Maximum number of results. Defaults to 10.")]
    pub limit: Option<usize>,
}
