// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! A Python statement-block parser producing a queryable Concrete Syntax Tree.
//!
//! The tree keeps every grammar production as a node, including single-child
//! chains, so structure can be matched by grammar name with a small selector
//! language.
//!
//! # Overview
//!
//! - **Parsing**: [`SyntaxTree::parse`] tokenizes and parses a `file_input`.
//! - **Traversal**: [`NodeRef::walk`], [`NodeRef::flatten`], [`NodeRef::find_all`].
//! - **Selectors**: [`NodeRef::find`] and [`Selector`] for CSS-like queries.
//! - **Reform**: [`render`] turns a token stream back into approximate source.
//!
//! # Quick Start
//!
//! ```
//! use fieldscan_cst::SyntaxTree;
//!
//! let source = "class Person(models.Model):\n    name = models.CharField(max_length=32)\n";
//! let tree = SyntaxTree::parse(source).expect("parse error");
//!
//! let fields = tree
//!     .find("classdef > suite > stmt > simple_stmt > small_stmt > expr_stmt")
//!     .expect("valid selector");
//! assert_eq!(fields[0].reform(), "name=models.CharField(max_length=32)");
//! ```

// ============================================================================
// Public modules and re-exports
// ============================================================================

/// Grammar symbols, token kinds and reserved words.
pub mod kind;
pub use kind::{is_constant, is_keyword, Kind, Symbol, TokKind, KEYWORDS};

/// Tokenizer.
pub mod tokenizer;
pub use tokenizer::{tokenize, Tok, TokError};

/// Statement grammar (`peg`).
pub mod parser;
pub use parser::{ParserError, MAX_NESTING};

/// Tree types and traversal.
pub mod tree;
pub use tree::{Element, NodeRef, SyntaxNode, SyntaxTree, Token, Walk};

/// Selector compilation and matching.
pub mod selector;
pub use selector::{Alternative, Anchor, Combinator, Selector, SelectorError, Step};

/// Token-to-source rendering.
pub mod reform;
pub use reform::{render, spacing, Spacing, TokenClass};
