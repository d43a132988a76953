//! Core trait definitions for content sources, question generators, and
//! result sinks.
//!
//! Procedural sources live in [`crate::content`]; AI generators are
//! implemented by the `drillkit-providers` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GenerationError, PersistenceError};
use crate::item::Item;
use crate::model::{AnswerRecord, Difficulty, SessionDescriptor, SessionResult, Variant};

// ---------------------------------------------------------------------------
// Content sources
// ---------------------------------------------------------------------------

/// Supplier of session items.
///
/// Implementations must be deterministic for a given `seed` and may
/// randomize freely when no seed is given.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Name the source is registered under (e.g. "arithmetic").
    fn name(&self) -> &str;

    /// Produce up to `request.count` items.
    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError>;
}

/// Request for the next batch of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub session_id: Uuid,
    pub variant: Variant,
    pub count: usize,
    /// Current level of the session; procedural sources scale with it.
    pub level: u32,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub seed: Option<u64>,
    /// 0 for the batch fetched before the session starts.
    pub batch_index: u32,
}

impl BatchRequest {
    /// Seed for this batch, distinct per batch index.
    pub fn batch_seed(&self) -> Option<u64> {
        self.seed
            .map(|seed| seed.wrapping_add((self.batch_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)))
    }
}

// ---------------------------------------------------------------------------
// Question generator trait
// ---------------------------------------------------------------------------

/// Trait for AI back ends that write question sets from prompts.
#[async_trait]
pub trait QuizGenerator: Send + Sync {
    /// Human-readable provider name (e.g. "gateway").
    fn name(&self) -> &str;

    /// Run one completion.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;

    /// List models this generator can use.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to a question generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier (e.g. "google/gemini-2.5-flash").
    pub model: String,
    /// The main prompt.
    pub prompt: String,
    /// Optional system prompt override.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a question generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Raw completion text.
    pub content: String,
    /// Model that actually answered.
    pub model: String,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
}

/// Default system prompt for question generation.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert teacher writing assessment questions. Respond ONLY with JSON matching the requested shape. Do not add commentary before or after the JSON.";

// ---------------------------------------------------------------------------
// Result sink trait
// ---------------------------------------------------------------------------

/// Persistence collaborator for sessions.
///
/// The engine calls these fire-and-forget, in order, from a background
/// worker; an error is logged and never changes the session's outcome.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Register a new session. Returns the sink's own opaque id for it.
    async fn create_session(
        &self,
        session: &SessionDescriptor,
    ) -> Result<String, PersistenceError>;

    /// Record one scored answer.
    async fn record_answer(
        &self,
        remote_id: &str,
        answer: &AnswerRecord,
    ) -> Result<(), PersistenceError>;

    /// Store the final result.
    async fn finalize(&self, remote_id: &str, result: &SessionResult)
        -> Result<(), PersistenceError>;
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Extract the JSON payload from a model response.
///
/// Handles:
/// - ```json``` blocks (first one wins)
/// - Generic ``` blocks (if no json-specific block is found)
/// - Raw text, trimmed to the outermost `{...}` or `[...]`
pub fn extract_json_block(response: &str) -> String {
    let mut json_block: Option<String> = None;
    let mut generic_block: Option<String> = None;
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block && json_block.is_none() {
                json_block = Some(current_block.clone());
            } else if is_generic_block && generic_block.is_none() {
                generic_block = Some(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // Truncated (unclosed) block: keep what was accumulated
    if in_block && !current_block.is_empty() {
        if is_json_block && json_block.is_none() {
            json_block = Some(current_block);
        } else if is_generic_block && generic_block.is_none() {
            generic_block = Some(current_block);
        }
    }

    if let Some(block) = json_block.or(generic_block) {
        return block.trim().to_string();
    }

    outermost_json(response).unwrap_or(response.trim()).to_string()
}

fn outermost_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_fenced_block() {
        let input = "Here you go:\n\n```json\n{\"questions\": []}\n```\n\nGood luck!";
        assert_eq!(extract_json_block(input), "{\"questions\": []}");
    }

    #[test]
    fn extract_generic_block_fallback() {
        let input = "```\n[1, 2]\n```";
        assert_eq!(extract_json_block(input), "[1, 2]");
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\nnot this\n```\n\n```json\n{\"a\": 1}\n```\n";
        assert_eq!(extract_json_block(input), "{\"a\": 1}");
    }

    #[test]
    fn extract_raw_object_with_chatter() {
        let input = "Sure! {\"questions\": [{\"q\": 1}]} Hope this helps.";
        assert_eq!(extract_json_block(input), "{\"questions\": [{\"q\": 1}]}");
    }

    #[test]
    fn extract_truncated_unclosed_block() {
        let input = "```json\n{\"questions\": [";
        assert_eq!(extract_json_block(input), "{\"questions\": [");
    }

    #[test]
    fn extract_no_json_returns_trimmed_text() {
        assert_eq!(extract_json_block("  nothing here "), "nothing here");
    }

    #[test]
    fn batch_seed_varies_by_index() {
        let mut request = BatchRequest {
            session_id: Uuid::nil(),
            variant: Variant::Arithmetic,
            count: 5,
            level: 1,
            difficulty: Difficulty::Medium,
            subject: None,
            seed: Some(42),
            batch_index: 0,
        };
        let first = request.batch_seed();
        request.batch_index = 1;
        assert_ne!(first, request.batch_seed());
        assert_eq!(first, Some(42));
        request.seed = None;
        assert_eq!(request.batch_seed(), None);
    }
}
