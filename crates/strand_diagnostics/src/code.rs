//! Stable identifiers such as `D006` or `T004`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The phase that reports a diagnostic. Each has its own code letter.
///
/// `Type` is special: the compile driver counts those apart so options can
/// make them fatal or not.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// `S`: the lexer or parser.
    Syntax,
    /// `I`: reading sources.
    Io,
    /// `D`: library, part, import and export directives.
    Directive,
    /// `R`: binding names to declarations.
    Resolution,
    /// `T`: static types.
    Type,
    /// `C`: the compile as a whole.
    Compiler,
}

impl Category {
    const LETTERS: [(Category, char); 6] = [
        (Category::Syntax, 'S'),
        (Category::Io, 'I'),
        (Category::Directive, 'D'),
        (Category::Resolution, 'R'),
        (Category::Type, 'T'),
        (Category::Compiler, 'C'),
    ];

    /// The code letter.
    pub fn prefix(self) -> char {
        Self::LETTERS
            .iter()
            .find_map(|&(category, letter)| (category == self).then_some(letter))
            .unwrap_or('?')
    }
}

/// A category plus a number, printed as letter and three digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// Reporting phase.
    pub category: Category,
    /// Unique within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// `category` and `number` combined.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_are_distinct() {
        let mut letters: Vec<char> = Category::LETTERS.iter().map(|&(c, _)| c.prefix()).collect();
        letters.sort_unstable();
        letters.dedup();
        assert_eq!(letters.len(), Category::LETTERS.len());
        assert!(!letters.contains(&'?'));
    }

    #[test]
    fn numbers_are_zero_padded() {
        assert_eq!(DiagnosticCode::new(Category::Directive, 6).to_string(), "D006");
        assert_eq!(DiagnosticCode::new(Category::Io, 1).to_string(), "I001");
        assert_eq!(DiagnosticCode::new(Category::Type, 101).to_string(), "T101");
    }
}
