// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

use super::grammar::ParserPosition;
use crate::tokenizer::TokError;

#[allow(clippy::enum_variant_names)]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("tokenizer error: {0}")]
    TokenizerError(#[from] TokError),

    #[error("parser error at {line}:{column}: expected {expected}, found {found}")]
    ParserError {
        line: u32,
        column: u32,
        expected: String,
        found: String,
    },

    /// Bracket or operator nesting exceeded the parser's recursion limit.
    #[error("expression nested too deeply at line {line}")]
    NestingTooDeep { line: u32 },
}

impl ParserError {
    /// The 1-based line the error was detected on.
    pub fn line(&self) -> u32 {
        match self {
            ParserError::TokenizerError(err) => err.line(),
            ParserError::ParserError { line, .. } | ParserError::NestingTooDeep { line } => *line,
        }
    }
}

impl From<peg::error::ParseError<ParserPosition>> for ParserError {
    fn from(err: peg::error::ParseError<ParserPosition>) -> Self {
        ParserError::ParserError {
            line: err.location.line,
            column: err.location.column,
            expected: err.expected.to_string(),
            found: err.location.found,
        }
    }
}
