//! Keyword heuristics that split OCR text into ingredients and instructions.
//!
//! Used directly when no classification backend is configured, and as the
//! fallback when a backend produces no labels at all.

use serde::Serialize;

use crate::types::{text_lines, ClassifiedLine, Label};

/// Prefixes (lower-cased) that mark a line as an instruction.
const INSTRUCTION_STARTERS: &[&str] = &[
    "step", "1.", "1)", "- ", "* ", "first", "then", "next", "after", "finally",
];

/// Substrings (lower-cased) that mark a line as an ingredient.
const INGREDIENT_KEYWORDS: &[&str] = &[
    "cup",
    "tsp",
    "tbsp",
    "teaspoon",
    "tablespoon",
    "g",
    "kg",
    "ml",
    "oz",
    "pound",
    "slice",
];

/// Lines with more tokens than this are instructions.
const MAX_INGREDIENT_TOKENS: usize = 4;

/// Heuristic split of a document's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Segmented {
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

/// Label one trimmed line.
///
/// The instruction test runs first: a long line that mentions "cup" is still
/// an instruction.
pub fn label_line(line: &str) -> Label {
    let lower = line.to_lowercase();

    if INSTRUCTION_STARTERS
        .iter()
        .any(|starter| lower.starts_with(starter))
        || line.split_whitespace().count() > MAX_INGREDIENT_TOKENS
    {
        return Label::Instruction;
    }

    if INGREDIENT_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
    {
        return Label::Ingredient;
    }

    Label::Unknown
}

/// Label every line of `text`, in order. Discarded lines carry [`Label::Unknown`].
pub fn classify_text(text: &str) -> Vec<ClassifiedLine> {
    text_lines(text)
        .into_iter()
        .map(|line| {
            let label = label_line(&line);
            ClassifiedLine { line, label }
        })
        .collect()
}

/// Split `text` into ingredient and instruction lines.
pub fn segment(text: &str) -> Segmented {
    let mut segmented = Segmented::default();
    for classified in classify_text(text) {
        match classified.label {
            Label::Ingredient => segmented.ingredients.push(classified.line),
            Label::Instruction => segmented.instructions.push(classified.line),
            Label::Unknown => {}
        }
    }
    segmented
}
