//! MCP `get_timeline` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `get_timeline` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetTimelineParams {
    /// Optional topic to narrow the timeline. Empty means all nodes in range.
    #[schemars(description = "Optional topic to narrow the timeline. Empty means all nodes in range.")]
    pub topic: Option<String>,

    /// RFC 3339 start of the range, inclusive.
    #[schemars(description = "RFC 3339 start of the range, inclusive. Required.")]
    pub start: String,

    /// RFC 3339 end of the range, inclusive.
    #[schemars(description = "RFC 3339 end of the range, inclusive. Required.")]
    pub end: String,
}
