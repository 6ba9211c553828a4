//! Core knowledge type definitions.
//!
//! Defines [`NodeKind`] (the three knowledge categories), the typed node
//! bodies ([`Decision`], [`Pattern`], [`Failure`]) with their validation
//! rules, [`EdgeKind`] (relationship labels), and the full [`Node`] and
//! [`Edge`] records matching the table schemas.

use serde::{Deserialize, Serialize};

use crate::error::{KnowledgeError, Result};

/// The three knowledge node categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An architectural decision with rationale and alternatives.
    Decision,
    /// A reusable implementation pattern.
    Pattern,
    /// A failed attempt and the lesson learned from it.
    Failure,
}

impl NodeKind {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Pattern => "pattern",
            Self::Failure => "failure",
        }
    }

    /// Single-letter id prefix (`D-`, `P-`, `F-`).
    pub fn id_prefix(&self) -> char {
        match self {
            Self::Decision => 'D',
            Self::Pattern => 'P',
            Self::Failure => 'F',
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "decision" => Ok(Self::Decision),
            "pattern" => Ok(Self::Pattern),
            "failure" => Ok(Self::Failure),
            _ => Err(format!("unknown node kind: {s}")),
        }
    }
}

/// Relationship labels between knowledge nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    #[serde(rename = "SEMANTICALLY_SIMILAR")]
    SemanticallySimilar,
    #[serde(rename = "IMPLEMENTS")]
    Implements,
    #[serde(rename = "DEPENDS_ON")]
    DependsOn,
    #[serde(rename = "ADDRESSES")]
    Addresses,
    #[serde(rename = "SIMILAR_TO")]
    SimilarTo,
    #[serde(rename = "REFERENCES")]
    References,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticallySimilar => "SEMANTICALLY_SIMILAR",
            Self::Implements => "IMPLEMENTS",
            Self::DependsOn => "DEPENDS_ON",
            Self::Addresses => "ADDRESSES",
            Self::SimilarTo => "SIMILAR_TO",
            Self::References => "REFERENCES",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SEMANTICALLY_SIMILAR" => Ok(Self::SemanticallySimilar),
            "IMPLEMENTS" => Ok(Self::Implements),
            "DEPENDS_ON" => Ok(Self::DependsOn),
            "ADDRESSES" => Ok(Self::Addresses),
            "SIMILAR_TO" => Ok(Self::SimilarTo),
            "REFERENCES" => Ok(Self::References),
            _ => Err(format!("unknown edge kind: {s}")),
        }
    }
}

/// An architectural decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// What was decided. Must not be empty.
    pub description: String,
    /// Why it was decided, if recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Alternatives that were considered, in order.
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// Related node ids. Advisory metadata only; does not create edges.
    #[serde(default)]
    pub related_to: Vec<String>,
}

/// A reusable implementation pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub implementation: String,
    /// Where the pattern applies. Minimum 10 characters.
    pub context: String,
    #[serde(default)]
    pub use_cases: Vec<String>,
}

/// A failed attempt and what it taught.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub attempt: String,
    pub reason_failed: String,
    pub lesson_learned: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_solution: Option<String>,
}

/// The typed body of a knowledge node.
#[derive(Debug, Clone)]
pub enum NodeBody {
    Decision(Decision),
    Pattern(Pattern),
    Failure(Failure),
}

impl NodeBody {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Decision(_) => NodeKind::Decision,
            Self::Pattern(_) => NodeKind::Pattern,
            Self::Failure(_) => NodeKind::Failure,
        }
    }

    /// Validate field constraints. Must pass before persistence.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Decision(d) => {
                if d.description.trim().is_empty() {
                    return Err(KnowledgeError::validation(
                        "description",
                        "must not be empty",
                    ));
                }
            }
            Self::Pattern(p) => {
                if p.name.trim().is_empty() {
                    return Err(KnowledgeError::validation("name", "must not be empty"));
                }
                if p.implementation.trim().is_empty() {
                    return Err(KnowledgeError::validation(
                        "implementation",
                        "must not be empty",
                    ));
                }
                if p.context.chars().count() < 10 {
                    return Err(KnowledgeError::validation(
                        "context",
                        format!(
                            "must be at least 10 characters, got {}",
                            p.context.chars().count()
                        ),
                    ));
                }
            }
            Self::Failure(f) => {
                if f.attempt.trim().is_empty() {
                    return Err(KnowledgeError::validation("attempt", "must not be empty"));
                }
                if f.reason_failed.trim().is_empty() {
                    return Err(KnowledgeError::validation(
                        "reason_failed",
                        "must not be empty",
                    ));
                }
                if f.lesson_learned.trim().is_empty() {
                    return Err(KnowledgeError::validation(
                        "lesson_learned",
                        "must not be empty",
                    ));
                }
            }
        }
        Ok(())
    }

    /// The concatenated text used for FTS indexing and embedding.
    pub fn search_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        match self {
            Self::Decision(d) => {
                parts.push(&d.description);
                if let Some(ref r) = d.rationale {
                    parts.push(r);
                }
                parts.extend(d.alternatives.iter().map(String::as_str));
            }
            Self::Pattern(p) => {
                parts.push(&p.name);
                parts.push(&p.implementation);
                parts.push(&p.context);
                parts.extend(p.use_cases.iter().map(String::as_str));
            }
            Self::Failure(f) => {
                parts.push(&f.attempt);
                parts.push(&f.reason_failed);
                parts.push(&f.lesson_learned);
                if let Some(ref a) = f.alternative_solution {
                    parts.push(a);
                }
            }
        }
        parts
            .into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serialize the body to its JSON `fields` representation.
    pub fn to_json(&self) -> Result<String> {
        let json = match self {
            Self::Decision(d) => serde_json::to_string(d)?,
            Self::Pattern(p) => serde_json::to_string(p)?,
            Self::Failure(f) => serde_json::to_string(f)?,
        };
        Ok(json)
    }

    /// Deserialize a body from the `kind` column and the JSON `fields` column.
    pub fn from_json(kind: NodeKind, fields: &str) -> Result<Self> {
        Ok(match kind {
            NodeKind::Decision => Self::Decision(serde_json::from_str(fields)?),
            NodeKind::Pattern => Self::Pattern(serde_json::from_str(fields)?),
            NodeKind::Failure => Self::Failure(serde_json::from_str(fields)?),
        })
    }
}

/// A full node record, matching the `nodes` table schema.
#[derive(Debug, Clone)]
pub struct Node {
    /// Typed prefix + 8 hex chars (e.g. `D-1a2b3c4d`). Immutable.
    pub id: String,
    pub kind: NodeKind,
    /// Concatenated searchable text derived from the body.
    pub content: String,
    pub body: NodeBody,
    /// Provenance tag (e.g. which ingestion pipeline produced this node).
    pub source: Option<String>,
    /// Project namespace.
    pub project: Option<String>,
    /// RFC 3339 creation timestamp. Immutable.
    pub created_at: String,
}

/// A typed, weighted relationship, matching the `edges` table schema.
#[derive(Debug, Clone, Serialize)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
    /// Similarity or confidence, in `[0, 1]`.
    pub weight: f64,
    /// Whether an external relevance judge refined this edge.
    pub llm_classified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub created_at: String,
}

/// Generate a fresh node id: kind prefix + 8 random hex chars.
pub fn new_node_id(kind: NodeKind) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", kind.id_prefix(), &suffix[..8])
}
