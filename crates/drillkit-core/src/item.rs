//! Session items: the tagged union of everything a session can ask.
//!
//! Each variant carries its own correctness predicate. Open-board variants
//! (memory-match pairs, sudoku cells) additionally know which answers
//! *address* them, so one answer can be routed to one open item.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an item within one session. Assigned by the session on intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A 4×4 sudoku grid; `0` marks a blank cell.
pub type Grid = [[u8; 4]; 4];

/// Arithmetic operators used by the speed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '×',
            Operator::Div => '÷',
        }
    }

    /// Exact result. Division is only ever generated with an integer quotient.
    pub fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Sub => lhs - rhs,
            Operator::Mul => lhs * rhs,
            Operator::Div => {
                if rhs == 0 {
                    0
                } else {
                    lhs / rhs
                }
            }
        }
    }
}

/// The variant-specific payload of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    MultipleChoice {
        question: String,
        options: Vec<String>,
        correct_index: usize,
        #[serde(default)]
        explanation: Option<String>,
    },
    Arithmetic {
        lhs: i64,
        op: Operator,
        rhs: i64,
    },
    /// One concept of a memory-match deck, laid out at two card positions.
    MatchPair {
        concept: String,
        positions: (usize, usize),
        deck_size: usize,
    },
    /// One blank cell of a sudoku board.
    GridCell {
        row: usize,
        col: usize,
        solution: u8,
        givens: Grid,
    },
    ScrambledWord {
        scrambled: String,
        answer: String,
        #[serde(default)]
        hint: Option<String>,
    },
    TypingPrompt {
        word: String,
    },
}

/// A single question, puzzle cell, or round within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Puzzle or round this item belongs to. Open-board sessions open one
    /// group at a time.
    #[serde(default)]
    pub group: u32,
    #[serde(flatten)]
    pub kind: ItemKind,
}

impl Item {
    pub fn new(kind: ItemKind) -> Self {
        Self {
            id: ItemId(0),
            group: 0,
            kind,
        }
    }

    pub fn with_group(mut self, group: u32) -> Self {
        self.group = group;
        self
    }

    /// Short name of the item's variant, used in logs and persisted records.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ItemKind::MultipleChoice { .. } => "multiple_choice",
            ItemKind::Arithmetic { .. } => "arithmetic",
            ItemKind::MatchPair { .. } => "match_pair",
            ItemKind::GridCell { .. } => "grid_cell",
            ItemKind::ScrambledWord { .. } => "scrambled_word",
            ItemKind::TypingPrompt { .. } => "typing_prompt",
        }
    }

    /// Human-readable prompt, enough for a plain-text front end.
    pub fn prompt(&self) -> String {
        match &self.kind {
            ItemKind::MultipleChoice {
                question, options, ..
            } => {
                let labels = OptionLabels::for_options(options);
                let mut out = question.clone();
                for (i, option) in options.iter().enumerate() {
                    out.push_str(&format!("\n  {}) {}", labels.label(i), option));
                }
                out
            }
            ItemKind::Arithmetic { lhs, op, rhs } => format!("{lhs} {} {rhs} = ?", op.symbol()),
            ItemKind::MatchPair { deck_size, .. } => {
                format!("Flip two of {deck_size} cards (answer \"i,j\")")
            }
            ItemKind::GridCell { givens, .. } => {
                let mut out = String::from("Fill a cell (answer \"row,col,value\"):");
                for row in givens {
                    out.push_str("\n  ");
                    for cell in row {
                        if *cell == 0 {
                            out.push_str(". ");
                        } else {
                            out.push_str(&format!("{cell} "));
                        }
                    }
                }
                out
            }
            ItemKind::ScrambledWord {
                scrambled, hint, ..
            } => match hint {
                Some(hint) => format!("Unscramble: {scrambled} (hint: {hint})"),
                None => format!("Unscramble: {scrambled}"),
            },
            ItemKind::TypingPrompt { word } => format!("Type: {word}"),
        }
    }

    /// The accepted answer, rendered for result breakdowns.
    pub fn expected(&self) -> String {
        match &self.kind {
            ItemKind::MultipleChoice {
                options,
                correct_index,
                ..
            } => options.get(*correct_index).cloned().unwrap_or_default(),
            ItemKind::Arithmetic { lhs, op, rhs } => op.apply(*lhs, *rhs).to_string(),
            ItemKind::MatchPair { positions, .. } => format!("{},{}", positions.0, positions.1),
            ItemKind::GridCell { row, col, solution, .. } => format!("{row},{col},{solution}"),
            ItemKind::ScrambledWord { answer, .. } => answer.clone(),
            ItemKind::TypingPrompt { word } => word.clone(),
        }
    }

    /// Correctness predicate. An empty value (timeout) is never correct.
    pub fn is_correct(&self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        match &self.kind {
            ItemKind::MultipleChoice {
                options,
                correct_index,
                ..
            } => {
                let Some(correct) = options.get(*correct_index) else {
                    return false;
                };
                match OptionLabels::for_options(options).select(value, options.len()) {
                    Some(index) => index == *correct_index,
                    None => value.eq_ignore_ascii_case(correct.trim()),
                }
            }
            ItemKind::Arithmetic { lhs, op, rhs } => value
                .parse::<i64>()
                .map(|n| n == op.apply(*lhs, *rhs))
                .unwrap_or(false),
            ItemKind::MatchPair { positions, .. } => match parse_pair(value) {
                Some((a, b)) => {
                    (a, b) == *positions || (b, a) == *positions
                }
                None => false,
            },
            ItemKind::GridCell {
                row, col, solution, ..
            } => matches!(parse_cell(value), Some((r, c, v)) if r == *row && c == *col && v == *solution),
            ItemKind::ScrambledWord { answer, .. } => value.eq_ignore_ascii_case(answer.trim()),
            ItemKind::TypingPrompt { word } => value == word,
        }
    }

    /// Whether an open-board answer is aimed at this item.
    ///
    /// Memory-match answers address the pair holding the first flipped card;
    /// sudoku answers address the cell at their row and column. Other kinds
    /// are answered in sequence and never routed this way.
    pub fn addresses(&self, value: &str) -> bool {
        match &self.kind {
            ItemKind::MatchPair { positions, .. } => {
                matches!(parse_pair(value), Some((a, _)) if a == positions.0 || a == positions.1)
            }
            ItemKind::GridCell { row, col, .. } => {
                matches!(parse_cell(value), Some((r, c, _)) if r == *row && c == *col)
            }
            _ => false,
        }
    }
}

/// How multiple-choice options are labelled in prompts.
///
/// Letters are the default. A board where some option is itself a single
/// letter (element symbols like `B` or `C`) is numbered instead, so a typed
/// label never collides with option text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionLabels {
    Letters,
    Numbers,
}

impl OptionLabels {
    fn for_options(options: &[String]) -> Self {
        let single_letter = |o: &String| {
            let o = o.trim();
            o.len() == 1 && o.chars().all(|c| c.is_ascii_alphabetic())
        };
        if options.iter().any(single_letter) {
            OptionLabels::Numbers
        } else {
            OptionLabels::Letters
        }
    }

    fn label(self, index: usize) -> String {
        match self {
            OptionLabels::Letters => ((b'A' + (index % 26) as u8) as char).to_string(),
            OptionLabels::Numbers => (index + 1).to_string(),
        }
    }

    /// The option a typed label selects, if `value` is a label on this board.
    fn select(self, value: &str, count: usize) -> Option<usize> {
        let index = match self {
            OptionLabels::Letters => {
                let mut chars = value.chars();
                let c = chars.next()?;
                if chars.next().is_some() || !c.is_ascii_alphabetic() {
                    return None;
                }
                (c.to_ascii_uppercase() as u8 - b'A') as usize
            }
            OptionLabels::Numbers => value.parse::<usize>().ok()?.checked_sub(1)?,
        };
        (index < count).then_some(index)
    }
}

fn parse_numbers(value: &str) -> Vec<Option<usize>> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().ok())
        .collect()
}

fn parse_pair(value: &str) -> Option<(usize, usize)> {
    match parse_numbers(value).as_slice() {
        [Some(a), Some(b)] if a != b => Some((*a, *b)),
        _ => None,
    }
}

fn parse_cell(value: &str) -> Option<(usize, usize, u8)> {
    match parse_numbers(value).as_slice() {
        [Some(r), Some(c), Some(v)] if *v <= u8::MAX as usize => Some((*r, *c, *v as u8)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice() -> Item {
        Item::new(ItemKind::MultipleChoice {
            question: "Chemical symbol of sodium?".into(),
            options: vec!["Sd".into(), "Na".into(), "So".into(), "Nd".into()],
            correct_index: 1,
            explanation: None,
        })
    }

    fn symbols(correct_index: usize) -> Item {
        Item::new(ItemKind::MultipleChoice {
            question: "What is the chemical symbol of Oxygen?".into(),
            options: vec!["H".into(), "B".into(), "O".into(), "C".into()],
            correct_index,
            explanation: None,
        })
    }

    #[test]
    fn multiple_choice_accepts_text_or_letter() {
        let item = choice();
        assert!(item.prompt().contains("B) Na"));
        assert!(item.is_correct("Na"));
        assert!(item.is_correct(" na "));
        assert!(item.is_correct("b"));
        assert!(!item.is_correct("A"));
        assert!(!item.is_correct("E"));
        assert!(!item.is_correct(""));
    }

    #[test]
    fn single_letter_options_are_numbered() {
        let oxygen = symbols(2);
        let prompt = oxygen.prompt();
        assert!(prompt.contains("1) H"));
        assert!(prompt.contains("3) O"));
        assert!(!prompt.contains("C) O"));

        assert!(oxygen.is_correct("3"));
        assert!(oxygen.is_correct("O"));
        // Letters are option text on a numbered board, never positions.
        assert!(!oxygen.is_correct("C"));
        assert!(!oxygen.is_correct("A"));
        assert!(!oxygen.is_correct("5"));
        assert!(!oxygen.is_correct("0"));

        let carbon = symbols(3);
        assert!(carbon.is_correct("C"));
        assert!(carbon.is_correct("4"));
        assert!(!carbon.is_correct("3"));
    }

    #[test]
    fn arithmetic_uses_numeric_equality() {
        let item = Item::new(ItemKind::Arithmetic {
            lhs: 7,
            op: Operator::Add,
            rhs: 5,
        });
        assert!(item.is_correct("12"));
        assert!(item.is_correct(" 12"));
        assert!(!item.is_correct("13"));
        assert!(!item.is_correct("twelve"));
        assert_eq!(item.prompt(), "7 + 5 = ?");
    }

    #[test]
    fn match_pair_is_order_insensitive() {
        let item = Item::new(ItemKind::MatchPair {
            concept: "atom".into(),
            positions: (2, 5),
            deck_size: 8,
        });
        assert!(item.is_correct("2,5"));
        assert!(item.is_correct("5, 2"));
        assert!(!item.is_correct("2,3"));
        assert!(!item.is_correct("2,2"));
        assert!(item.addresses("5,1"));
        assert!(!item.addresses("1,5"));
    }

    #[test]
    fn grid_cell_compares_position_and_value() {
        let item = Item::new(ItemKind::GridCell {
            row: 1,
            col: 2,
            solution: 3,
            givens: [[0; 4]; 4],
        });
        assert!(item.is_correct("1,2,3"));
        assert!(!item.is_correct("1,2,4"));
        assert!(!item.is_correct("2,1,3"));
        assert!(item.addresses("1,2,4"));
        assert!(!item.addresses("0,2,3"));
    }

    #[test]
    fn scrambled_word_ignores_case() {
        let item = Item::new(ItemKind::ScrambledWord {
            scrambled: "tmoa".into(),
            answer: "atom".into(),
            hint: None,
        });
        assert!(item.is_correct("ATOM"));
        assert!(!item.is_correct("moat"));
    }

    #[test]
    fn typing_prompt_is_exact() {
        let item = Item::new(ItemKind::TypingPrompt {
            word: "Photosynthesis".into(),
        });
        assert!(item.is_correct("Photosynthesis"));
        assert!(!item.is_correct("photosynthesis"));
    }

    #[test]
    fn item_serde_is_tagged() {
        let item = choice().with_group(2);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "multiple_choice");
        assert_eq!(json["group"], 2);
        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }
}
