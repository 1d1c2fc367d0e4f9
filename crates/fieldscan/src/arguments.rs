// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Decompose a rendered argument list into positional and keyword parts.
//!
//! The fragment `a,b,kw=1,other='x'` is parsed as if it were a chained
//! assignment statement, `a,b,kw = 1,other = 'x'`. Each `testlist` of that
//! statement is a group; the last item of every group but the final one
//! names a keyword whose value is the first item of the next group.
//!
//! Unpacked `*iterable` arguments have no fixed position and are rejected.
//!
//! A bare name passed positionally before further positional arguments of a
//! later group can be taken for a keyword. Field declarations do not pass
//! arguments that way in practice.

use indexmap::IndexMap;

use fieldscan_cst::{Symbol, SyntaxTree};

use crate::error::ArgumentError;

/// Positional argument texts and keyword → value texts, in source order.
pub type ParsedArguments = (Vec<String>, IndexMap<String, String>);

/// Split `rendered` (a reformed argument list without parentheses).
///
/// ```
/// use fieldscan::arguments::parse_arguments;
///
/// let (args, kwargs) = parse_arguments("'a',max_length=32,null=True").unwrap();
/// assert_eq!(args, vec!["'a'"]);
/// assert_eq!(kwargs["max_length"], "32");
/// assert_eq!(kwargs["null"], "True");
/// ```
pub fn parse_arguments(rendered: &str) -> Result<ParsedArguments, ArgumentError> {
    let tree = SyntaxTree::parse(&format!("{rendered}\n"))?;
    let groups = tree.root().find_all(Symbol::Testlist, true);

    let mut positional = Vec::new();
    let mut keywords = IndexMap::new();
    let mut pending: Option<String> = None;

    let last_group = groups.len().saturating_sub(1);
    for (i, group) in groups.iter().enumerate() {
        if let Some(star) = group.children().find(|n| n.is(Symbol::StarExpr)) {
            return Err(ArgumentError::Unpacked(star.reform()));
        }
        let items: Vec<_> = group.children().filter(|n| n.is(Symbol::Test)).collect();
        let last_item = items.len().saturating_sub(1);
        for (j, item) in items.iter().enumerate() {
            let text = item.reform();
            if let Some(keyword) = pending.take() {
                keywords.insert(keyword, text);
            } else if j == last_item && i != last_group {
                pending = Some(text);
            } else {
                positional.push(text);
            }
        }
    }
    Ok((positional, keywords))
}
