//! TOML question banks for offline quizzes.
//!
//! Loads question banks from TOML files and directories, validates them, and
//! serves them through [`BankSource`].

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::content::batch_rng;
use crate::error::GenerationError;
use crate::item::{Item, ItemKind};
use crate::model::Difficulty;
use crate::traits::{BatchRequest, ContentSource};

/// A set of multiple-choice questions on one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    pub subject: Option<String>,
    pub questions: Vec<BankQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index of the correct option.
    pub answer: usize,
    pub explanation: Option<String>,
    /// `None` matches every requested difficulty.
    pub difficulty: Option<Difficulty>,
}

impl BankQuestion {
    pub fn to_item(&self) -> Item {
        Item::new(ItemKind::MultipleChoice {
            question: self.question.clone(),
            options: self.options.clone(),
            correct_index: self.answer,
            explanation: self.explanation.clone(),
        })
    }
}

/// Intermediate TOML structure for bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    subject: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    question: String,
    options: Vec<String>,
    answer: usize,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            if q.answer >= q.options.len() {
                anyhow::bail!(
                    "question {}: answer index {} is out of range for {} options",
                    q.id,
                    q.answer,
                    q.options.len()
                );
            }
            let difficulty = q
                .difficulty
                .map(|d| d.parse().map_err(|e: String| anyhow::anyhow!("{}", e)))
                .transpose()
                .with_context(|| format!("question {}", q.id))?;

            Ok(BankQuestion {
                id: q.id,
                question: q.question,
                options: q.options,
                answer: q.answer,
                explanation: q.explanation,
                difficulty,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        subject: parsed.bank.subject,
        questions,
    })
}

/// Recursively load all `.toml` bank files from a directory. Files that
/// fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file, or every bank under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    pub message: String,
}

/// Validate a bank for common issues.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    let mut seen_ids = HashSet::new();
    for q in &bank.questions {
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
    }

    for q in &bank.questions {
        let warn = |message: String| ValidationWarning {
            question_id: Some(q.id.clone()),
            message,
        };
        if q.question.trim().is_empty() {
            warnings.push(warn("question text is empty".into()));
        }
        if q.options.len() < 2 {
            warnings.push(warn(format!("only {} option(s)", q.options.len())));
        }
        let distinct: HashSet<String> = q.options.iter().map(|o| o.trim().to_lowercase()).collect();
        if distinct.len() != q.options.len() {
            warnings.push(warn("options are not distinct".into()));
        }
        if q.options.iter().any(|o| o.trim().is_empty()) {
            warnings.push(warn("an option is empty".into()));
        }
    }

    warnings
}

/// Serves multiple-choice items from loaded banks.
///
/// Banks are filtered by the requested subject, questions by difficulty
/// (falling back to every difficulty when none match), then shuffled.
/// Returns fewer items than requested when the bank is small.
#[derive(Debug, Clone, Default)]
pub struct BankSource {
    banks: Vec<QuestionBank>,
}

impl BankSource {
    pub fn new(banks: Vec<QuestionBank>) -> Self {
        Self { banks }
    }

    pub fn question_count(&self) -> usize {
        self.banks.iter().map(|b| b.questions.len()).sum()
    }
}

#[async_trait]
impl ContentSource for BankSource {
    fn name(&self) -> &str {
        "bank"
    }

    async fn next(&self, request: &BatchRequest) -> Result<Vec<Item>, GenerationError> {
        let on_subject: Vec<&BankQuestion> = self
            .banks
            .iter()
            .filter(|bank| match (&request.subject, &bank.subject) {
                (Some(wanted), Some(subject)) => wanted.eq_ignore_ascii_case(subject),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .flat_map(|bank| bank.questions.iter())
            .collect();

        if on_subject.is_empty() {
            return Err(GenerationError::Unavailable(match &request.subject {
                Some(subject) => format!("no bank questions on {subject}"),
                None => "no bank questions loaded".into(),
            }));
        }

        let matching: Vec<&BankQuestion> = on_subject
            .iter()
            .copied()
            .filter(|q| q.difficulty.is_none() || q.difficulty == Some(request.difficulty))
            .collect();
        let mut pool = if matching.is_empty() { on_subject } else { matching };

        let mut rng = batch_rng(request);
        pool.shuffle(&mut rng);
        Ok(pool
            .into_iter()
            .take(request.count)
            .map(BankQuestion::to_item)
            .collect())
    }
}
