//! Multiple-choice questions written by an AI generator.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::GenerationError;
use crate::item::{Item, ItemKind};
use crate::traits::{
    extract_json_block, BatchRequest, ContentSource, GenerationRequest, QuizGenerator,
};

/// Content source backed by a [`QuizGenerator`].
///
/// The generator must return exactly the requested number of well-formed
/// questions; anything else is [`GenerationError::MalformedOutput`].
pub struct RemoteQuizSource {
    generator: Arc<dyn QuizGenerator>,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl RemoteQuizSource {
    pub fn new(generator: Arc<dyn QuizGenerator>, model: impl Into<String>) -> Self {
        Self {
            generator,
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Build the generation prompt for one batch.
pub fn build_prompt(request: &BatchRequest) -> String {
    let subject = request.subject.as_deref().unwrap_or("general science");
    format!(
        "Write {count} {difficulty} multiple-choice questions about {subject} for a {variant} session.\n\
         Each question has exactly four options and one correct answer.\n\
         Respond with JSON of the form:\n\
         {{\"questions\": [{{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \
         \"correct_answer\": 0, \"explanation\": \"...\"}}]}}\n\
         `correct_answer` is the zero-based index of the correct option.",
        count = request.count,
        difficulty = request.difficulty,
        variant = request.variant,
    )
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuestionPayload {
    Wrapped { questions: Vec<RawQuestion> },
    Bare(Vec<RawQuestion>),
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    #[serde(alias = "correctAnswer", alias = "answer")]
    correct_answer: AnswerKey,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnswerKey {
    Index(usize),
    Text(String),
}

impl AnswerKey {
    fn resolve(&self, options: &[String]) -> Option<usize> {
        match self {
            AnswerKey::Index(i) => (*i < options.len()).then_some(*i),
            AnswerKey::Text(text) => {
                let text = text.trim();
                options
                    .iter()
                    .position(|o| o.trim().eq_ignore_ascii_case(text))
                    .or_else(|| {
                        let mut chars = text.chars();
                        match (chars.next(), chars.next()) {
                            (Some(c), None) if c.is_ascii_alphabetic() => {
                                let i = (c.to_ascii_uppercase() as u8 - b'A') as usize;
                                (i < options.len()).then_some(i)
                            }
                            _ => None,
                        }
                    })
            }
        }
    }
}

/// Parse a completion into exactly `expected` multiple-choice items.
pub fn parse_questions(content: &str, expected: usize) -> Result<Vec<Item>, GenerationError> {
    let json = extract_json_block(content);
    let payload: QuestionPayload = serde_json::from_str(&json)
        .map_err(|e| GenerationError::MalformedOutput(format!("invalid question JSON: {e}")))?;
    let raw = match payload {
        QuestionPayload::Wrapped { questions } => questions,
        QuestionPayload::Bare(questions) => questions,
    };

    if raw.len() != expected {
        return Err(GenerationError::MalformedOutput(format!(
            "expected {expected} questions, got {}",
            raw.len()
        )));
    }

    raw.into_iter()
        .enumerate()
        .map(|(n, q)| {
            if q.question.trim().is_empty() {
                return Err(GenerationError::MalformedOutput(format!(
                    "question {} has no text",
                    n + 1
                )));
            }
            if q.options.len() < 2 {
                return Err(GenerationError::MalformedOutput(format!(
                    "question {} has {} option(s)",
                    n + 1,
                    q.options.len()
                )));
            }
            let correct_index = q.correct_answer.resolve(&q.options).ok_or_else(|| {
                GenerationError::MalformedOutput(format!(
                    "question {} has no matching correct answer",
                    n + 1
                ))
            })?;
            Ok(Item::new(ItemKind::MultipleChoice {
                question: q.question,
                options: q.options,
                correct_index,
                explanation: q.explanation,
            }))
        })
        .collect()
}

#[async_trait]
impl ContentSource for RemoteQuizSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        let generation = GenerationRequest {
            model: self.model.clone(),
            prompt: build_prompt(request),
            system_prompt: None,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(
            generator = self.generator.name(),
            model = %self.model,
            count = request.count,
            "requesting questions"
        );
        let response = self.generator.generate(&generation).await?;
        tracing::debug!(latency_ms = response.latency_ms, "generator responded");

        parse_questions(&response.content, request.count)
    }
}
