// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Recognize `name = path(args)` field declarations.

use tracing::debug;

use fieldscan_cst::{render, NodeRef, TokKind, Token};

use crate::arguments::parse_arguments;
use crate::types::FieldDefinition;

/// Decompose a class-body statement into a field definition.
///
/// The statement must flatten to `NAME '=' path '(' ... ')'`, where `path`
/// is at least one token with no `=` in it and the closing parenthesis is
/// the last token.
/// Anything else, including argument lists that do not re-parse, is not a
/// field declaration and yields `None`.
pub fn extract_field(stmt: NodeRef<'_>) -> Option<FieldDefinition> {
    let bits = stmt.flatten();
    let Some((name, definition)) = split_assignment(&bits) else {
        debug!("skipping statement that is not an assignment: {}", stmt.reform());
        return None;
    };

    let lpar = definition.iter().position(|t| t.kind() == TokKind::Lpar);
    let (lpar, last) = match (lpar, definition.last()) {
        (Some(lpar), Some(last))
            if lpar > 0
                && last.kind() == TokKind::Rpar
                && !definition[..lpar].iter().any(|t| t.kind() == TokKind::Equal) =>
        {
            (lpar, definition.len() - 1)
        }
        _ => {
            debug!("skipping {name}: right-hand side is not a constructor call");
            return None;
        }
    };

    let constructor_path = render(definition[..lpar].iter().copied());
    let rendered_args = render(definition[lpar + 1..last].iter().copied());
    match parse_arguments(&rendered_args) {
        Ok((positional, keywords)) => {
            let mut def = FieldDefinition::new(name, constructor_path);
            for arg in positional {
                def = def.with_positional(arg);
            }
            for (keyword, value) in keywords {
                def = def.with_keyword(keyword, value);
            }
            Some(def)
        }
        Err(e) => {
            debug!("skipping {name}: arguments `{rendered_args}` did not parse: {e}");
            None
        }
    }
}

/// `NAME '=' rest` → `(name, rest)`
fn split_assignment<'a, 't>(bits: &'a [&'t Token]) -> Option<(&'t str, &'a [&'t Token])> {
    match bits {
        [name, eq, rest @ ..]
            if name.kind() == TokKind::Name && !name.is_keyword() && eq.kind() == TokKind::Equal =>
        {
            Some((name.text(), rest))
        }
        _ => None,
    }
}
