//! Offline generator for tests and demos.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use drillkit_core::error::GenerationError;
use drillkit_core::traits::{GenerationRequest, GenerationResponse, ModelInfo, QuizGenerator};

const STOCK: &[(&str, [&str; 4], usize)] = &[
    ("What gas do plants absorb from the air?", ["Oxygen", "Carbon dioxide", "Nitrogen", "Helium"], 1),
    ("How many planets orbit the Sun?", ["Seven", "Eight", "Nine", "Ten"], 1),
    ("What is the boiling point of water at sea level in Celsius?", ["90", "100", "110", "120"], 1),
    ("Which organ pumps blood through the body?", ["Liver", "Lung", "Heart", "Kidney"], 2),
    ("What is H2O commonly called?", ["Salt", "Water", "Sugar", "Ammonia"], 1),
    ("Which planet is closest to the Sun?", ["Mercury", "Venus", "Earth", "Mars"], 0),
];

enum Reply {
    /// Answer `Write N ...` prompts with N stock questions.
    Stock,
    Fixed(String),
    Fail(GenerationError),
}

/// A generator that never leaves the process.
pub struct MockGenerator {
    reply: Reply,
    call_count: AtomicU32,
    last_request: Mutex<Option<GenerationRequest>>,
}

impl MockGenerator {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Answers with as many stock science questions as the prompt asks for.
    pub fn stock() -> Self {
        Self::with_reply(Reply::Stock)
    }

    pub fn with_fixed_response(response: &str) -> Self {
        Self::with_reply(Reply::Fixed(response.to_string()))
    }

    pub fn failing(error: GenerationError) -> Self {
        Self::with_reply(Reply::Fail(error))
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.last_request
            .lock()
            .ok()
            .and_then(|request| request.clone())
    }
}

/// Build `count` stock questions, cycling the bank.
fn stock_questions(count: usize) -> String {
    let questions: Vec<_> = STOCK
        .iter()
        .cycle()
        .take(count)
        .map(|(question, options, answer)| {
            json!({
                "question": question,
                "options": options,
                "correct_answer": answer,
            })
        })
        .collect();
    json!({ "questions": questions }).to_string()
}

fn requested_count(prompt: &str) -> usize {
    prompt
        .split_whitespace()
        .skip_while(|word| *word != "Write")
        .nth(1)
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

#[async_trait]
impl QuizGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let content = match &self.reply {
            Reply::Stock => stock_questions(requested_count(&request.prompt)),
            Reply::Fixed(content) => content.clone(),
            Reply::Fail(error) => return Err(error.clone()),
        };

        Ok(GenerationResponse {
            content,
            model: request.model.clone(),
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
        }]
    }
}
