// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! CSS-like selectors over the concrete syntax tree.
//!
//! ## Grammar
//!
//! ```text
//! <selector>    := <alternative> ("," <alternative>)*
//! <alternative> := "^" [<combinator>] <name> (<combinator> <name>)*
//!                | <name> (<combinator> <name>)*
//! <combinator>  := whitespace          (any descendant)
//!                | ">"                 (direct child)
//! <name>        := symbol name | token name
//! ```
//!
//! Without `^`, the first name is searched among every descendant of the
//! node the selector is applied to. With `^`, matching starts at that node
//! itself. Each following step replaces the current set with the matches of
//! its name under every node in the set. A `>` restricts only the step that
//! immediately follows it. Results of all alternatives are concatenated, so
//! a node reachable along two paths appears twice.
//!
//! ## Examples
//!
//! ```text
//! classdef                                   # every class definition
//! ^ > classdef > suite > stmt                # statements of this class body
//! expr_stmt NAME, import_from                # two alternatives
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, repeat, separated};
use winnow::prelude::*;
use winnow::token::take_while;
use winnow::ModalResult;

use crate::kind::Kind;
use crate::tree::NodeRef;

/// Error type for selector compilation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector text does not match the selector grammar.
    #[error("invalid selector '{input}': {message}")]
    InvalidSelector { input: String, message: String },

    /// A name in the selector is neither a grammar symbol nor a token kind.
    #[error("unknown kind '{name}' in selector")]
    UnknownKind { name: String },
}

/// How a step relates to the nodes matched so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub combinator: Combinator,
    pub kind: Kind,
}

/// Where an alternative starts matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `^`: the node the selector is applied to.
    SelfNode,
    /// Every descendant of the given kind.
    Search(Kind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub anchor: Anchor,
    pub steps: Vec<Step>,
}

/// A compiled selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Alternative>,
}

impl Selector {
    /// Compile selector text.
    ///
    /// # Example
    ///
    /// ```
    /// use fieldscan_cst::{Selector, SyntaxTree};
    ///
    /// let selector = Selector::compile("power > trailer > arglist").unwrap();
    /// let tree = SyntaxTree::parse("x = f(a, b=1)\n").unwrap();
    /// let args: Vec<String> = tree.root().select(&selector).iter().map(|n| n.reform()).collect();
    /// assert_eq!(args, vec!["a,b=1"]);
    /// ```
    pub fn compile(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::InvalidSelector {
                input: input.to_string(),
                message: "empty selector".to_string(),
            });
        }

        let raw = parse_selector
            .parse(trimmed)
            .map_err(|e| SelectorError::InvalidSelector {
                input: input.to_string(),
                message: format!("{:?}", e),
            })?;

        let alternatives = raw
            .into_iter()
            .map(RawAlternative::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: trimmed.to_string(),
            alternatives,
        })
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    /// Run the selector with `node` as the `^` anchor and search root.
    pub fn apply<'t>(&self, node: NodeRef<'t>) -> Vec<NodeRef<'t>> {
        let mut results = Vec::new();
        for alternative in &self.alternatives {
            let mut current = match alternative.anchor {
                Anchor::SelfNode => vec![node],
                Anchor::Search(kind) => node.find_all(kind, true),
            };
            for step in &alternative.steps {
                let recursive = step.combinator == Combinator::Descendant;
                current = current
                    .iter()
                    .flat_map(|n| n.find_all(step.kind, recursive))
                    .collect();
            }
            results.extend(current);
        }
        results
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::compile(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

struct RawAlternative<'s> {
    anchored: bool,
    first: Option<&'s str>,
    steps: Vec<(Combinator, &'s str)>,
}

impl RawAlternative<'_> {
    fn resolve(self) -> Result<Alternative, SelectorError> {
        let lookup = |name: &str| {
            Kind::from_name(name).ok_or_else(|| SelectorError::UnknownKind {
                name: name.to_string(),
            })
        };
        let anchor = match (self.anchored, self.first) {
            (false, Some(name)) => Anchor::Search(lookup(name)?),
            _ => Anchor::SelfNode,
        };
        let steps = self
            .steps
            .into_iter()
            .map(|(combinator, name)| Ok(Step { combinator, kind: lookup(name)? }))
            .collect::<Result<Vec<_>, SelectorError>>()?;
        Ok(Alternative { anchor, steps })
    }
}

/// Parse the comma-separated list of alternatives.
fn parse_selector<'s>(input: &mut &'s str) -> ModalResult<Vec<RawAlternative<'s>>> {
    separated(1.., parse_alternative, ',').parse_next(input)
}

/// Parse one alternative, surrounding whitespace included.
fn parse_alternative<'s>(input: &mut &'s str) -> ModalResult<RawAlternative<'s>> {
    let _ = multispace0.parse_next(input)?;

    let anchored = opt('^').parse_next(input)?.is_some();
    let mut steps = Vec::new();
    let first = if anchored {
        let combinator = opt(parse_combinator)
            .parse_next(input)?
            .unwrap_or(Combinator::Descendant);
        let name = parse_name(input)?;
        steps.push((combinator, name));
        None
    } else {
        Some(parse_name(input)?)
    };

    let rest: Vec<(Combinator, &str)> =
        repeat(0.., (parse_combinator, parse_name)).parse_next(input)?;
    steps.extend(rest);

    let _ = multispace0.parse_next(input)?;
    Ok(RawAlternative {
        anchored,
        first,
        steps,
    })
}

/// Parse a combinator: `>` with optional whitespace, or bare whitespace.
fn parse_combinator(input: &mut &str) -> ModalResult<Combinator> {
    alt((
        delimited(multispace0, '>', multispace0).value(Combinator::Child),
        multispace1.value(Combinator::Descendant),
    ))
    .parse_next(input)
}

/// Parse a kind name.
fn parse_name<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::{Symbol, TokKind};
    use crate::tree::SyntaxTree;

    fn texts(nodes: &[NodeRef<'_>]) -> Vec<String> {
        nodes.iter().map(|n| n.reform()).collect()
    }

    // =========================================================================
    // Compile Tests
    // =========================================================================

    #[test]
    fn test_compile_search_with_steps() {
        let selector = Selector::compile("classdef > suite expr_stmt").unwrap();
        assert_eq!(
            selector.alternatives(),
            &[Alternative {
                anchor: Anchor::Search(Kind::Symbol(Symbol::Classdef)),
                steps: vec![
                    Step {
                        combinator: Combinator::Child,
                        kind: Kind::Symbol(Symbol::Suite),
                    },
                    Step {
                        combinator: Combinator::Descendant,
                        kind: Kind::Symbol(Symbol::ExprStmt),
                    },
                ],
            }]
        );
    }

    #[test]
    fn test_compile_anchored() {
        let selector = Selector::compile("^ > classdef>NAME").unwrap();
        let alternative = &selector.alternatives()[0];
        assert_eq!(alternative.anchor, Anchor::SelfNode);
        assert_eq!(
            alternative.steps,
            vec![
                Step {
                    combinator: Combinator::Child,
                    kind: Kind::Symbol(Symbol::Classdef),
                },
                Step {
                    combinator: Combinator::Child,
                    kind: Kind::Token(TokKind::Name),
                },
            ]
        );

        let descendant = Selector::compile("^ NAME").unwrap();
        assert_eq!(
            descendant.alternatives()[0].steps[0].combinator,
            Combinator::Descendant
        );
    }

    #[test]
    fn test_compile_alternatives() {
        let selector: Selector = " import_name , import_from ".parse().unwrap();
        assert_eq!(selector.alternatives().len(), 2);
        assert_eq!(selector.to_string(), "import_name , import_from");
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            Selector::compile(""),
            Err(SelectorError::InvalidSelector { .. })
        ));
        assert!(matches!(
            Selector::compile("classdef >"),
            Err(SelectorError::InvalidSelector { .. })
        ));
        assert!(matches!(
            Selector::compile("classdef,,suite"),
            Err(SelectorError::InvalidSelector { .. })
        ));
        assert_eq!(
            Selector::compile("classdef > klass"),
            Err(SelectorError::UnknownKind {
                name: "klass".to_string()
            })
        );
    }

    // =========================================================================
    // Apply Tests
    // =========================================================================

    #[test]
    fn test_apply_child_restricts_single_step() {
        let tree = SyntaxTree::parse("class A:\n    x = f(1)\n    def g(self):\n        y = 2\n")
            .unwrap();

        let direct = tree
            .find("^ > stmt > compound_stmt > classdef > suite > stmt > simple_stmt > small_stmt > expr_stmt")
            .unwrap();
        assert_eq!(texts(&direct), vec!["x=f(1)"]);

        // Without the child restriction the method body is reached too.
        let nested = tree.find("classdef expr_stmt").unwrap();
        assert_eq!(texts(&nested), vec!["x=f(1)", "y=2"]);

        // The `>` applies only to `suite`; `expr_stmt` is then any descendant.
        let mixed = tree.find("classdef > suite expr_stmt").unwrap();
        assert_eq!(texts(&mixed), vec!["x=f(1)", "y=2"]);
    }

    #[test]
    fn test_apply_anchor_is_invoking_node() {
        let tree = SyntaxTree::parse("class A:\n    x = 1\nclass B:\n    y = 2\n").unwrap();
        let classes = tree.find("compound_stmt").unwrap();
        assert_eq!(classes.len(), 2);

        let second = classes[1];
        let fields = second
            .find("^ > classdef > suite > stmt > simple_stmt > small_stmt > expr_stmt")
            .unwrap();
        assert_eq!(texts(&fields), vec!["y=2"]);

        // An unanchored search excludes the invoking node itself.
        assert!(second.find("compound_stmt").unwrap().is_empty());
    }

    #[test]
    fn test_apply_concatenates_alternatives_without_dedup() {
        let tree = SyntaxTree::parse("x = 1\n").unwrap();
        let results = tree.find("expr_stmt, expr_stmt").unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].same_node(&results[1]));
    }

    #[test]
    fn test_apply_token_kinds() {
        let tree = SyntaxTree::parse("x = f(a, b)\n").unwrap();
        let names = tree.find("trailer NAME").unwrap();
        assert_eq!(texts(&names), vec!["a", "b"]);
    }
}
