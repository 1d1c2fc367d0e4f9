// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The concrete syntax tree and its traversal primitives.
//!
//! A [`SyntaxTree`] owns a root [`Element`]. All queries go through
//! [`NodeRef`], a cheap `Copy` view that borrows from the tree:
//!
//! - [`NodeRef::walk`] yields `(kind, subtree)` pairs in pre-order, excluding
//!   the node itself. Traversal uses an explicit stack, so tree depth is not
//!   bounded by the call stack.
//! - [`NodeRef::flatten`] yields the non-layout leaf tokens in document order.
//! - [`NodeRef::find_all`] filters a walk by kind.
//! - [`NodeRef::find`] runs a selector (see [`crate::selector`]).

use std::fmt;

use crate::kind::{is_constant, is_keyword, Kind, Symbol, TokKind};
use crate::parser::{self, ParserError};
use crate::reform::render;
use crate::selector::{Selector, SelectorError};

// ============================================================================
// Tree elements
// ============================================================================

/// A leaf of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokKind,
    text: String,
}

impl Token {
    pub fn new(kind: TokKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn kind(&self) -> TokKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True for `NEWLINE`, `INDENT`, `DEDENT` and `ENDMARKER`.
    pub fn is_layout(&self) -> bool {
        self.kind.is_layout()
    }

    /// True for a `NAME` token spelling a reserved word.
    pub fn is_keyword(&self) -> bool {
        self.kind == TokKind::Name && is_keyword(&self.text)
    }

    /// True for a `NAME` token spelling `True`, `False` or `None`.
    pub fn is_constant(&self) -> bool {
        self.kind == TokKind::Name && is_constant(&self.text)
    }
}

/// An interior node labelled with a grammar symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    symbol: Symbol,
    children: Vec<Element>,
}

impl SyntaxNode {
    pub fn new(symbol: Symbol, children: Vec<Element>) -> Self {
        Self { symbol, children }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }
}

/// Either an interior node or a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    Node(SyntaxNode),
    Token(Token),
}

impl Element {
    pub fn kind(&self) -> Kind {
        match self {
            Element::Node(node) => Kind::Symbol(node.symbol),
            Element::Token(token) => Kind::Token(token.kind),
        }
    }
}

// ============================================================================
// SyntaxTree
// ============================================================================

/// An owned concrete syntax tree for one statement block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    root: Element,
}

impl SyntaxTree {
    /// Parse a standalone statement block (`file_input`).
    ///
    /// # Errors
    ///
    /// Returns a [`ParserError`] if `source` does not tokenize or does not
    /// match the grammar.
    ///
    /// # Example
    ///
    /// ```
    /// use fieldscan_cst::{Symbol, SyntaxTree};
    ///
    /// let tree = SyntaxTree::parse("x = f(1)\n").unwrap();
    /// assert_eq!(tree.root().symbol(), Some(Symbol::FileInput));
    /// ```
    pub fn parse(source: &str) -> Result<Self, ParserError> {
        let node = parser::parse_file_input(source)?;
        Ok(Self {
            root: Element::Node(node),
        })
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            element: &self.root,
        }
    }

    /// Run a selector against the root node.
    pub fn find(&self, selector: &str) -> Result<Vec<NodeRef<'_>>, SelectorError> {
        self.root().find(selector)
    }
}

// ============================================================================
// NodeRef
// ============================================================================

/// A borrowed view of one element of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    element: &'t Element,
}

impl<'t> NodeRef<'t> {
    pub fn new(element: &'t Element) -> Self {
        Self { element }
    }

    pub fn kind(&self) -> Kind {
        self.element.kind()
    }

    /// The grammar symbol, for interior nodes.
    pub fn symbol(&self) -> Option<Symbol> {
        match self.element {
            Element::Node(node) => Some(node.symbol),
            Element::Token(_) => None,
        }
    }

    /// The token, for leaves.
    pub fn token(&self) -> Option<&'t Token> {
        match self.element {
            Element::Token(token) => Some(token),
            Element::Node(_) => None,
        }
    }

    /// True if this element has the given kind.
    pub fn is(&self, kind: impl Into<Kind>) -> bool {
        self.kind() == kind.into()
    }

    /// True if both views point at the same element.
    pub fn same_node(&self, other: &NodeRef<'_>) -> bool {
        std::ptr::eq(self.element, other.element)
    }

    /// Direct children, in order. Empty for tokens.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let children: &'t [Element] = match self.element {
            Element::Node(node) => &node.children,
            Element::Token(_) => &[],
        };
        children.iter().map(NodeRef::new)
    }

    pub fn child(&self, index: usize) -> Option<NodeRef<'t>> {
        self.children().nth(index)
    }

    pub fn child_count(&self) -> usize {
        match self.element {
            Element::Node(node) => node.children.len(),
            Element::Token(_) => 0,
        }
    }

    /// Pre-order traversal excluding this node.
    ///
    /// With `recursive == false` only direct children are yielded.
    pub fn walk(&self, recursive: bool) -> Walk<'t> {
        let mut stack = Vec::new();
        if let Element::Node(node) = self.element {
            stack.extend(node.children.iter().rev());
        }
        Walk { stack, recursive }
    }

    /// The non-layout leaf tokens under this node, in document order.
    pub fn flatten(&self) -> Vec<&'t Token> {
        if let Some(token) = self.token() {
            return if token.is_layout() { Vec::new() } else { vec![token] };
        }
        self.walk(true)
            .filter_map(|(_, subtree)| subtree.token())
            .filter(|token| !token.is_layout())
            .collect()
    }

    /// Every element of the given kind among the children (or descendants).
    pub fn find_all(&self, kind: impl Into<Kind>, recursive: bool) -> Vec<NodeRef<'t>> {
        let kind = kind.into();
        self.walk(recursive)
            .filter(|(k, _)| *k == kind)
            .map(|(_, subtree)| subtree)
            .collect()
    }

    /// Compile and run a selector with this node as the `^` anchor.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectorError`] if the selector does not compile.
    pub fn find(&self, selector: &str) -> Result<Vec<NodeRef<'t>>, SelectorError> {
        Ok(Selector::compile(selector)?.apply(*self))
    }

    /// Run a precompiled selector with this node as the `^` anchor.
    pub fn select(&self, selector: &Selector) -> Vec<NodeRef<'t>> {
        selector.apply(*self)
    }

    /// Approximate source text of this subtree.
    pub fn reform(&self) -> String {
        render(self.flatten())
    }

    fn pretty(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self.element {
            Element::Token(token) => {
                writeln!(f, "{:indent$}{} {:?}", "", token.kind.name(), token.text)
            }
            Element::Node(node) => {
                writeln!(f, "{:indent$}{}", "", node.symbol.name())?;
                for child in self.children() {
                    child.pretty(f, indent + 2)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.kind())
    }
}

/// Indented dump of the subtree with kind names, for debugging.
impl fmt::Display for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pretty(f, 0)
    }
}

/// Iterator returned by [`NodeRef::walk`].
pub struct Walk<'t> {
    stack: Vec<&'t Element>,
    recursive: bool,
}

impl<'t> Iterator for Walk<'t> {
    type Item = (Kind, NodeRef<'t>);

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        if self.recursive {
            if let Element::Node(node) = element {
                self.stack.extend(node.children.iter().rev());
            }
        }
        Some((element.kind(), NodeRef::new(element)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(nodes: &[NodeRef<'_>]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.kind().name()).collect()
    }

    #[test]
    fn walk_is_preorder_and_excludes_self() {
        let tree = SyntaxTree::parse("x = 1\n").unwrap();
        let stmt = tree.root().find_all(Symbol::ExprStmt, true)[0];
        let kinds: Vec<Kind> = stmt.walk(false).map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                Kind::Symbol(Symbol::Testlist),
                Kind::Token(TokKind::Equal),
                Kind::Symbol(Symbol::Testlist),
            ]
        );

        let all: Vec<Kind> = stmt.walk(true).map(|(k, _)| k).collect();
        assert_eq!(all[0], Kind::Symbol(Symbol::Testlist));
        assert_eq!(all[1], Kind::Symbol(Symbol::Test));
        assert!(!all.contains(&Kind::Symbol(Symbol::ExprStmt)));
    }

    #[test]
    fn flatten_skips_layout_tokens() {
        let tree = SyntaxTree::parse("class A:\n    x = f(1)\n").unwrap();
        let texts: Vec<&str> = tree.root().flatten().iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["class", "A", ":", "x", "=", "f", "(", "1", ")"]);
    }

    #[test]
    fn find_all_direct_versus_recursive() {
        let tree = SyntaxTree::parse("a = 1\nb = 2\n").unwrap();
        let root = tree.root();
        assert_eq!(root.find_all(Symbol::Stmt, false).len(), 2);
        assert_eq!(root.find_all(Symbol::ExprStmt, false).len(), 0);
        assert_eq!(root.find_all(Symbol::ExprStmt, true).len(), 2);
    }

    #[test]
    fn deep_nesting_walks_without_recursion() {
        let depth = crate::MAX_NESTING;
        let source = format!("x = {}1{}\n", "(".repeat(depth), ")".repeat(depth));
        let tree = SyntaxTree::parse(&source).unwrap();
        let atoms = tree.root().find_all(Symbol::Atom, true);
        // `x`, the literal, and one per pair of parentheses.
        assert_eq!(atoms.len(), depth + 2);
        assert_eq!(
            tree.root().reform(),
            format!("x={}1{}", "(".repeat(depth), ")".repeat(depth))
        );
    }

    #[test]
    fn display_dumps_kind_names() {
        let tree = SyntaxTree::parse("pass\n").unwrap();
        let dump = tree.root().to_string();
        assert!(dump.starts_with("file_input\n"));
        assert!(dump.contains("pass_stmt"));
        assert!(dump.contains("NAME \"pass\""));
        let stmt = tree.root().find_all(Symbol::Stmt, false);
        assert_eq!(names(&stmt), vec!["stmt"]);
    }
}
