//! Line labels shared by the heuristic and learned classification paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What a single line of recipe text is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ingredient,
    Instruction,
    /// Neither; dropped from assembled recipes.
    Unknown,
}

impl Label {
    /// Parse a backend label. Anything other than `ingredient` or
    /// `instruction` (e.g. `other`, `unknown`) is [`Label::Unknown`].
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "ingredient" => Label::Ingredient,
            "instruction" => Label::Instruction,
            _ => Label::Unknown,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Ingredient => write!(f, "ingredient"),
            Label::Instruction => write!(f, "instruction"),
            Label::Unknown => write!(f, "unknown"),
        }
    }
}

/// A text line with the label assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    pub line: String,
    pub label: Label,
}

impl ClassifiedLine {
    pub fn new(line: impl Into<String>, label: Label) -> Self {
        Self {
            line: line.into(),
            label,
        }
    }
}

/// Whether `c` ends a line. Besides `\n` and `\r` this covers vertical tab,
/// form feed, NEL and the Unicode line and paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split raw text into trimmed, non-empty lines, keeping their order.
pub fn text_lines(text: &str) -> Vec<String> {
    text.split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
