//! MCP `detect_gaps` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `detect_gaps` MCP tool. The analysis always covers the
/// whole graph; there are no filters.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct DetectGapsParams {}
