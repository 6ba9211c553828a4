//! Optional LLM refinement of extracted relationships.
//!
//! The extractor proposes similarity edges; a [`RelationshipJudge`] can
//! reclassify a pair into a more specific edge kind with a confidence and a
//! one-line reasoning. The HTTP implementation talks to any OpenAI-compatible
//! chat completions endpoint. All calls are blocking; the CLI runs extraction
//! on a blocking thread.

use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{KnowledgeError, Result};
use crate::knowledge::types::EdgeKind;

/// A judge's verdict on one candidate pair.
#[derive(Debug, Clone)]
pub struct Judgment {
    pub kind: EdgeKind,
    pub confidence: f64,
    pub reasoning: String,
}

/// Classifies the relationship between two pieces of knowledge.
pub trait RelationshipJudge: Send + Sync {
    fn classify(&self, source_text: &str, target_text: &str) -> Result<Judgment>;
}

const SYSTEM_PROMPT: &str = "You classify the relationship between two engineering \
knowledge entries. Respond with a single JSON object: \
{\"relationship_type\": one of IMPLEMENTS, DEPENDS_ON, ADDRESSES, SIMILAR_TO, REFERENCES, \
\"confidence\": number between 0 and 1, \"reasoning\": one sentence}.";

/// Judge backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpJudge {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct RawJudgment {
    relationship_type: String,
    confidence: f64,
    reasoning: String,
}

impl HttpJudge {
    pub fn new(endpoint: &str, model: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                KnowledgeError::BackendUnavailable(format!("judge client init failed: {e}"))
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }
}

impl RelationshipJudge for HttpJudge {
    fn classify(&self, source_text: &str, target_text: &str) -> Result<Judgment> {
        let body = json!({
            "model": self.model,
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": format!("Entry A:\n{source_text}\n\nEntry B:\n{target_text}")},
            ],
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&body)
            .send()
            .map_err(|e| KnowledgeError::BackendUnavailable(format!("judge request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(KnowledgeError::BackendUnavailable(format!(
                "judge returned status {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response.json().map_err(|e| {
            KnowledgeError::BackendUnavailable(format!("judge response malformed: {e}"))
        })?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| {
                KnowledgeError::BackendUnavailable("judge returned no choices".to_string())
            })?;

        parse_judgment(content)
    }
}

/// Parse the judge's JSON verdict, tolerating markdown code fences.
fn parse_judgment(content: &str) -> Result<Judgment> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let raw: RawJudgment = serde_json::from_str(trimmed).map_err(|e| {
        KnowledgeError::BackendUnavailable(format!("judge verdict not valid JSON: {e}"))
    })?;
    let kind = EdgeKind::from_str(&raw.relationship_type).map_err(|e| {
        KnowledgeError::BackendUnavailable(format!("judge verdict: {e}"))
    })?;
    Ok(Judgment {
        kind,
        confidence: raw.confidence.clamp(0.0, 1.0),
        reasoning: raw.reasoning,
    })
}
