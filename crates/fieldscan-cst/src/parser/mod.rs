// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Parser producing a non-collapsed concrete syntax tree.
//!
//! The grammar in [`grammar`] is a `peg` grammar over the token stream. Every
//! production builds a node for its symbol even when the node has a single
//! child, so an expression always materializes the full
//! `test → or_test → ... → power → atom` chain. Selectors written against the
//! grammar names therefore match regardless of how simple the expression is.

mod errors;
mod grammar;

pub use errors::ParserError;

use crate::kind::{is_constant, is_keyword, TokKind};
use crate::tokenizer::{tokenize, Tok};
use crate::tree::SyntaxNode;
use grammar::{python, TokVec};

/// Maximum nesting of expressions before the parser gives up.
pub const MAX_NESTING: usize = 32;

/// Parse a statement block into a `file_input` node.
pub(crate) fn parse_file_input(source: &str) -> Result<SyntaxNode, ParserError> {
    let toks = tokenize(source)?;
    check_nesting(&toks)?;
    python::file_input(&TokVec::from(toks)).map_err(ParserError::from)
}

/// Reject token streams whose expressions would recurse past [`MAX_NESTING`].
///
/// Each open bracket starts a level. Right-recursive prefixes (`not`,
/// `lambda`, `await`, unary operators, `**` and conditional `else`) deepen
/// the current level until the next comma closes the item.
fn check_nesting(toks: &[Tok<'_>]) -> Result<(), ParserError> {
    let mut levels: Vec<usize> = vec![0];
    let mut prev: Option<Tok<'_>> = None;
    for tok in toks {
        match tok.kind {
            TokKind::Lpar | TokKind::Lsqb | TokKind::Lbrace => levels.push(0),
            TokKind::Rpar | TokKind::Rsqb | TokKind::Rbrace => {
                if levels.len() > 1 {
                    levels.pop();
                }
            }
            TokKind::Comma => {
                if let Some(level) = levels.last_mut() {
                    *level = 0;
                }
            }
            TokKind::Newline | TokKind::Semi => levels = vec![0],
            _ if deepens(*tok, prev) => {
                if let Some(level) = levels.last_mut() {
                    *level += 1;
                }
            }
            _ => {}
        }
        let depth = levels.len() - 1 + levels.iter().sum::<usize>();
        if depth > MAX_NESTING {
            return Err(ParserError::NestingTooDeep { line: tok.line });
        }
        prev = Some(*tok);
    }
    Ok(())
}

fn deepens(tok: Tok<'_>, prev: Option<Tok<'_>>) -> bool {
    match tok.kind {
        TokKind::Name => match tok.text {
            "not" | "lambda" | "await" => true,
            "else" => prev.is_some_and(|p| !p.kind.is_layout()),
            _ => false,
        },
        TokKind::DoubleStar => true,
        TokKind::Plus | TokKind::Minus | TokKind::Tilde => !prev.is_some_and(ends_operand),
        _ => false,
    }
}

fn ends_operand(tok: Tok<'_>) -> bool {
    match tok.kind {
        TokKind::Name => !is_keyword(tok.text) || is_constant(tok.text),
        TokKind::Number
        | TokKind::String
        | TokKind::Ellipsis
        | TokKind::Rpar
        | TokKind::Rsqb
        | TokKind::Rbrace => true,
        _ => false,
    }
}
