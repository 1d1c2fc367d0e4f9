// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Renders a flattened token stream back into approximate source text.
//!
//! Whitespace and comments are not preserved. Operators are emitted without
//! surrounding spaces and reserved words are padded on both sides, which is
//! enough to keep literal and arithmetic expressions re-parseable.

use crate::kind::TokKind;
use crate::tree::Token;

/// Coarse classification used by the spacing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// A reserved word other than `True`, `False` and `None`.
    Keyword,
    /// Identifiers and the keyword constants.
    Name,
    /// `NUMBER` and `STRING`.
    Literal,
    /// Operators and delimiters.
    Operator,
    /// `NEWLINE`, `INDENT`, `DEDENT`, `ENDMARKER`.
    Layout,
}

impl TokenClass {
    pub fn of(token: &Token) -> TokenClass {
        match token.kind() {
            TokKind::Name if token.is_keyword() && !token.is_constant() => TokenClass::Keyword,
            TokKind::Name => TokenClass::Name,
            TokKind::Number | TokKind::String => TokenClass::Literal,
            kind if kind.is_layout() => TokenClass::Layout,
            _ => TokenClass::Operator,
        }
    }
}

/// Spacing policy for one token class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacing {
    pub needs_leading_space: bool,
    pub needs_trailing_space: bool,
}

/// The spacing table.
pub fn spacing(class: TokenClass) -> Spacing {
    match class {
        TokenClass::Keyword => Spacing {
            needs_leading_space: true,
            needs_trailing_space: true,
        },
        TokenClass::Name | TokenClass::Literal | TokenClass::Operator | TokenClass::Layout => {
            Spacing {
                needs_leading_space: false,
                needs_trailing_space: false,
            }
        }
    }
}

/// Render tokens to text.
///
/// # Example
///
/// ```
/// use fieldscan_cst::{render, SyntaxTree};
///
/// let tree = SyntaxTree::parse("x = lambda: not  a\n").unwrap();
/// assert_eq!(render(tree.root().flatten()), "x= lambda : not a");
/// ```
pub fn render<'t>(tokens: impl IntoIterator<Item = &'t Token>) -> String {
    let mut out = String::new();
    for token in tokens {
        let class = TokenClass::of(token);
        if class == TokenClass::Layout {
            continue;
        }
        let policy = spacing(class);
        if policy.needs_leading_space && !out.ends_with(' ') {
            out.push(' ');
        }
        match token.kind().fixed_text() {
            Some(text) => out.push_str(text),
            None => out.push_str(token.text()),
        }
        if policy.needs_trailing_space {
            out.push(' ');
        }
    }
    out.trim().to_string()
}
