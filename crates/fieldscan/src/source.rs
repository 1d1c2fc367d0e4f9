// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Source text retrieval and normalization.

use std::collections::HashMap;

use fieldscan_cst::{NodeRef, Symbol, SyntaxTree, TokKind};

use crate::error::ScanResult;
use crate::model::ModelClass;

/// Supplies source text for classes and modules.
pub trait SourceProvider {
    /// Source text of the class, or of a block that contains it.
    fn class_source(&self, model: &ModelClass) -> Option<String>;

    /// Source text of a module, by dotted path.
    fn module_source(&self, module: &str) -> Option<String>;
}

/// In-memory sources keyed by module path.
///
/// A class's source is its module's source unless a class-specific snippet
/// was registered; the scanner locates the class inside whatever it gets.
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    modules: HashMap<String, String>,
    classes: HashMap<String, String>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_module(&mut self, module: impl Into<String>, source: impl Into<String>) {
        self.modules.insert(module.into(), source.into());
    }

    /// Register source for one class, keyed by `module.Name`.
    pub fn insert_class(&mut self, qualified_name: impl Into<String>, source: impl Into<String>) {
        self.classes.insert(qualified_name.into(), source.into());
    }

    pub fn with_module(mut self, module: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert_module(module, source);
        self
    }
}

impl SourceProvider for MemorySources {
    fn class_source(&self, model: &ModelClass) -> Option<String> {
        self.classes
            .get(&model.qualified_name())
            .or_else(|| self.modules.get(&model.module))
            .cloned()
    }

    fn module_source(&self, module: &str) -> Option<String> {
        self.modules.get(module).cloned()
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Prepare retrieved source for parsing: unify line endings, remove the
/// common indentation and ensure a trailing newline.
pub fn normalize_source(source: &str) -> String {
    let unified = source.replace("\r\n", "\n").replace('\r', "\n");
    let mut text = dedent(&unified);
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Remove the whitespace prefix shared by every non-blank line.
///
/// Whitespace-only lines are emptied and do not take part in the margin.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .reduce(common_prefix)
        .unwrap_or("");

    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(line.strip_prefix(margin).unwrap_or(line));
    }
    out
}

fn common_prefix<'s>(a: &'s str, b: &'s str) -> &'s str {
    let len = a
        .char_indices()
        .zip(b.chars())
        .take_while(|((_, x), y)| x == y)
        .last()
        .map(|((i, c), _)| i + c.len_utf8())
        .unwrap_or(0);
    &a[..len]
}

// ============================================================================
// Class location
// ============================================================================

/// Find the statement that defines class `name` (case-insensitive).
///
/// Returns the first `compound_stmt` or `decorated` node with a direct
/// `classdef` child of that name, in search order.
pub fn locate_class<'t>(tree: &'t SyntaxTree, name: &str) -> ScanResult<Option<NodeRef<'t>>> {
    let wanted = name.to_lowercase();
    let candidates = tree.find("compound_stmt, decorated")?;
    Ok(candidates.into_iter().find(|candidate| {
        classdef_of(*candidate)
            .and_then(class_name)
            .is_some_and(|found| found.to_lowercase() == wanted)
    }))
}

/// The direct `classdef` child of a located class statement.
pub fn classdef_of(node: NodeRef<'_>) -> Option<NodeRef<'_>> {
    node.children().find(|child| child.is(Symbol::Classdef))
}

/// The class name token text of a `classdef` node.
pub fn class_name<'t>(classdef: NodeRef<'t>) -> Option<&'t str> {
    classdef
        .children()
        .filter_map(|child| child.token())
        .filter(|token| token.kind() == TokKind::Name)
        .nth(1)
        .map(|token| token.text())
}
