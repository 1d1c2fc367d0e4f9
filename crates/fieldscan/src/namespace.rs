// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Name bindings recovered from module and class bodies.
//!
//! A [`Namespace`] is what the evaluator looks names up in. It is built by
//! walking statements in order, the way the interpreter would bind them,
//! without executing anything:
//!
//! - `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`
//! - `from m import x as y` binds `y` to `m.x`; relative imports resolve
//!   against the module's package; star imports bind nothing
//! - `class` and `def` bind their qualified name
//! - assignments bind the evaluated right-hand side, or unbind the target
//!   when it cannot be evaluated
//! - bodies of `if`, `try` and `with` blocks are walked in order

use indexmap::IndexMap;
use tracing::{debug, trace};

use fieldscan_cst::{NodeRef, Symbol, SyntaxTree, TokKind};

use crate::eval::{evaluate, Overlay, Scope};
use crate::source::{normalize_source, SourceProvider};
use crate::value::Value;

/// Ordered name → value bindings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    bindings: IndexMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn unbind(&mut self, name: &str) -> Option<Value> {
        self.bindings.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Bindings made by the top-level statements of a module.
    ///
    /// `root` is the `file_input` node of the module's tree; `module_path` is
    /// its dotted path, used to qualify classes and functions and to resolve
    /// relative imports.
    pub fn from_module(root: NodeRef<'_>, module_path: &str) -> Namespace {
        let mut binder = Binder {
            ns: Namespace::new(),
            outer: None,
            prefix: module_path,
            package: Some(package_of(module_path)),
        };
        binder.block(root);
        binder.ns
    }

    /// Bindings made by a class body.
    ///
    /// Right-hand sides see the class bindings made so far, then `module`.
    /// Nested classes and methods are qualified with `qualname`.
    pub fn from_class(classdef: NodeRef<'_>, module: &Namespace, qualname: &str) -> Namespace {
        let mut binder = Binder {
            ns: Namespace::new(),
            outer: Some(module),
            prefix: qualname,
            package: None,
        };
        if let Some(suite) = classdef.children().find(|c| c.is(Symbol::Suite)) {
            binder.block(suite);
        }
        binder.ns
    }
}

impl Scope for Namespace {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Fetch, parse and bind a module by dotted path.
///
/// Returns `None` when the source is unavailable or does not parse.
pub fn load_module_namespace(sources: &dyn SourceProvider, module: &str) -> Option<Namespace> {
    let Some(source) = sources.module_source(module) else {
        debug!("no source available for module {module}");
        return None;
    };
    match SyntaxTree::parse(&normalize_source(&source)) {
        Ok(tree) => Some(Namespace::from_module(tree.root(), module)),
        Err(e) => {
            debug!("module {module} could not be parsed: {e}");
            None
        }
    }
}

/// `a.b.c` → `a.b`
fn package_of(module_path: &str) -> &str {
    module_path.rsplit_once('.').map_or("", |(package, _)| package)
}

// ============================================================================
// Binder
// ============================================================================

struct Binder<'a> {
    ns: Namespace,
    /// Enclosing module bindings, for class bodies.
    outer: Option<&'a Namespace>,
    /// Qualifier for class and function names.
    prefix: &'a str,
    /// Package for relative imports; `None` inside class bodies.
    package: Option<&'a str>,
}

impl Binder<'_> {
    /// Bind every statement directly inside `node` (a `file_input` or `suite`).
    fn block(&mut self, node: NodeRef<'_>) {
        for child in node.children() {
            match child.symbol() {
                Some(Symbol::Stmt) => {
                    if let Some(inner) = child.child(0) {
                        self.statement(inner);
                    }
                }
                Some(Symbol::SimpleStmt) => self.statement(child),
                _ => {}
            }
        }
    }

    fn statement(&mut self, node: NodeRef<'_>) {
        match node.symbol() {
            Some(Symbol::SimpleStmt) => {
                for small in node.children().filter(|c| c.is(Symbol::SmallStmt)) {
                    if let Some(inner) = small.child(0) {
                        self.small_statement(inner);
                    }
                }
            }
            Some(Symbol::CompoundStmt) => {
                if let Some(inner) = node.child(0) {
                    self.compound_statement(inner);
                }
            }
            _ => {}
        }
    }

    fn small_statement(&mut self, node: NodeRef<'_>) {
        match node.symbol() {
            Some(Symbol::ExprStmt) => self.assignment(node),
            Some(Symbol::ImportStmt) => match node.child(0) {
                Some(import) if import.is(Symbol::ImportName) => self.import_name(import),
                Some(import) => self.import_from(import),
                None => {}
            },
            Some(Symbol::DelStmt) => {
                if let Some(targets) = node.child(1) {
                    for name in target_names(targets) {
                        self.ns.unbind(name);
                    }
                }
            }
            _ => {}
        }
    }

    fn compound_statement(&mut self, node: NodeRef<'_>) {
        match node.symbol() {
            Some(Symbol::IfStmt | Symbol::TryStmt | Symbol::WithStmt) => {
                for suite in node.children().filter(|c| c.is(Symbol::Suite)) {
                    self.block(suite);
                }
            }
            Some(Symbol::Classdef | Symbol::Funcdef) => self.definition(node),
            Some(Symbol::Decorated | Symbol::AsyncStmt) => {
                if let Some(target) = node.child(1) {
                    self.compound_statement(target);
                }
            }
            _ => {}
        }
    }

    /// `class Name` / `def name` bind the qualified name.
    fn definition(&mut self, node: NodeRef<'_>) {
        if let Some(name) = node.child(1).and_then(|c| c.token()) {
            let path = qualify(self.prefix, name.text());
            self.ns.bind(name.text(), Value::Reference(path));
        }
    }

    // expr_stmt: testlist (annassign | augassign (yield_expr|testlist) |
    //                      ('=' (yield_expr|testlist))*)
    fn assignment(&mut self, node: NodeRef<'_>) {
        let children: Vec<_> = node.children().collect();
        match children.as_slice() {
            [_] => {}
            [target, annassign] if annassign.is(Symbol::Annassign) => {
                // ':' test ['=' rhs]
                if let Some(rhs) = annassign.child(3) {
                    let value = self.evaluate(rhs);
                    self.bind_target(*target, value);
                }
            }
            [target, op, _] if op.is(Symbol::Augassign) => {
                for name in target_names(*target) {
                    self.ns.unbind(name);
                }
            }
            [targets @ .., rhs] => {
                let value = self.evaluate(*rhs);
                for target in targets.iter().filter(|t| !t.is(TokKind::Equal)) {
                    self.bind_target(*target, value.clone());
                }
            }
            [] => {}
        }
    }

    /// Evaluate a right-hand side; `None` when it cannot be evaluated.
    fn evaluate(&self, rhs: NodeRef<'_>) -> Option<Value> {
        let result = match self.outer {
            Some(module) => evaluate(rhs, &Overlay::new(&self.ns, module)),
            None => evaluate(rhs, &self.ns),
        };
        result
            .inspect_err(|e| trace!("unbinding assignment target: {e}"))
            .ok()
    }

    /// Bind a (possibly tuple) target list to an evaluation result.
    fn bind_target(&mut self, target: NodeRef<'_>, value: Option<Value>) {
        let items: Vec<_> = target.children().filter(|c| !c.is(TokKind::Comma)).collect();
        let is_tuple = items.len() != 1 || target.children().any(|c| c.is(TokKind::Comma));
        let names: Vec<Option<&str>> = items.iter().map(|item| simple_name(*item)).collect();

        if !is_tuple {
            if let Some(name) = names.first().copied().flatten() {
                match value {
                    Some(v) => self.ns.bind(name, v),
                    None => {
                        self.ns.unbind(name);
                    }
                }
            }
            return;
        }

        match value {
            Some(Value::Tuple(values) | Value::List(values)) if values.len() == names.len() => {
                for (name, v) in names.iter().zip(values) {
                    if let Some(name) = name {
                        self.ns.bind(*name, v);
                    }
                }
            }
            _ => {
                for name in names.into_iter().flatten() {
                    self.ns.unbind(name);
                }
            }
        }
    }

    // import_name: 'import' dotted_as_names
    fn import_name(&mut self, node: NodeRef<'_>) {
        let Some(names) = node.child(1) else {
            return;
        };
        for item in names.children().filter(|c| c.is(Symbol::DottedAsName)) {
            let Some(dotted) = item.child(0) else {
                continue;
            };
            let path = dotted.reform();
            match item.child(2).and_then(|c| c.token()) {
                Some(alias) => self.ns.bind(alias.text(), Value::Reference(path)),
                None => {
                    let head = path.split('.').next().unwrap_or_default().to_string();
                    self.ns.bind(head.clone(), Value::Reference(head));
                }
            }
        }
    }

    // import_from: 'from' ('.' | '...')* [dotted_name] 'import'
    //              ('*' | '(' import_as_names ')' | import_as_names)
    fn import_from(&mut self, node: NodeRef<'_>) {
        let mut level = 0;
        let mut module = None;
        let mut names = None;
        for child in node.children() {
            if child.is(TokKind::Dot) {
                level += 1;
            } else if child.is(TokKind::Ellipsis) {
                level += 3;
            } else if child.is(Symbol::DottedName) {
                module = Some(child.reform());
            } else if child.is(Symbol::ImportAsNames) {
                names = Some(child);
            }
        }
        let Some(names) = names else {
            // Star import.
            return;
        };
        let Some(base) = self.resolve_module(level, module.as_deref()) else {
            debug!("cannot resolve relative import in {}", self.prefix);
            return;
        };
        for item in names.children().filter(|c| c.is(Symbol::ImportAsName)) {
            let Some(name) = item.child(0).and_then(|c| c.token()) else {
                continue;
            };
            let bound = item
                .child(2)
                .and_then(|c| c.token())
                .map_or(name.text(), |alias| alias.text());
            self.ns
                .bind(bound, Value::Reference(qualify(&base, name.text())));
        }
    }

    fn resolve_module(&self, level: usize, module: Option<&str>) -> Option<String> {
        if level == 0 {
            return module.map(str::to_string);
        }
        let mut package: Vec<&str> = self
            .package?
            .split('.')
            .filter(|segment| !segment.is_empty())
            .collect();
        for _ in 1..level {
            package.pop()?;
        }
        if package.is_empty() {
            return None;
        }
        package.extend(module);
        Some(package.join("."))
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// The bare name an assignment target item binds, if it is one.
fn simple_name<'t>(item: NodeRef<'t>) -> Option<&'t str> {
    match item.flatten().as_slice() {
        [token] if token.kind() == TokKind::Name && !token.is_keyword() => Some(token.text()),
        _ => None,
    }
}

fn target_names<'t>(targets: NodeRef<'t>) -> Vec<&'t str> {
    targets
        .children()
        .filter(|c| !c.is(TokKind::Comma))
        .filter_map(simple_name)
        .collect()
}
