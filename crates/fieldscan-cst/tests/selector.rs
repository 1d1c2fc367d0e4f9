// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Selector behavior on realistic model sources.

use fieldscan_cst::{NodeRef, Selector, Symbol, SyntaxTree};

const MODELS: &str = r#"
from django.db import models

class Base(models.Model):
    created = models.DateTimeField(auto_now_add=True)

    class Meta:
        abstract = True

@register
class Person(Base):
    """A person."""
    name = models.CharField(max_length=32)
    age = models.IntegerField(default=0); nickname = models.CharField(max_length=8)

    def greet(self):
        message = "hi"
        return message
"#;

const FIELD_SELECTOR: &str = "^ > classdef > suite > stmt > simple_stmt > small_stmt > expr_stmt";

fn texts(nodes: &[NodeRef<'_>]) -> Vec<String> {
    nodes.iter().map(|n| n.reform()).collect()
}

/// The `compound_stmt` or `decorated` node holding the named class.
fn class_node<'t>(tree: &'t SyntaxTree, name: &str) -> NodeRef<'t> {
    tree.find("compound_stmt, decorated")
        .expect("selector")
        .into_iter()
        .find(|n| {
            n.find_all(Symbol::Classdef, false)
                .first()
                .and_then(|c| c.child(1))
                .and_then(|t| t.token())
                .is_some_and(|t| t.text() == name)
        })
        .expect("class present")
}

#[test]
fn class_body_statements_are_direct_only() {
    let tree = SyntaxTree::parse(MODELS.trim_start()).expect("parse");
    let base = class_node(&tree, "Base");
    let fields = base.find(FIELD_SELECTOR).expect("selector");
    // `abstract = True` lives in the nested Meta class and is not matched.
    assert_eq!(
        texts(&fields),
        vec!["created=models.DateTimeField(auto_now_add=True)"]
    );
}

#[test]
fn decorated_class_is_anchored_at_decorated_node() {
    let tree = SyntaxTree::parse(MODELS.trim_start()).expect("parse");
    let person = class_node(&tree, "Person");
    assert_eq!(person.symbol(), Some(Symbol::Decorated));

    let fields = person.find(FIELD_SELECTOR).expect("selector");
    assert_eq!(
        texts(&fields),
        vec![
            "\"\"\"A person.\"\"\"",
            "name=models.CharField(max_length=32)",
            "age=models.IntegerField(default=0)",
            "nickname=models.CharField(max_length=8)",
        ]
    );
}

#[test]
fn descendant_search_reaches_method_bodies() {
    let tree = SyntaxTree::parse(MODELS.trim_start()).expect("parse");
    let selector = Selector::compile("funcdef expr_stmt").expect("selector");
    let found = tree.root().select(&selector);
    assert_eq!(texts(&found), vec!["message=\"hi\""]);
}

#[test]
fn selector_compiles_once_and_applies_many_times() {
    let selector: Selector = "import_from > dotted_name".parse().expect("selector");
    let first = SyntaxTree::parse("from a.b import c\n").expect("parse");
    let second = SyntaxTree::parse("from x import y\nfrom . import z\n").expect("parse");
    assert_eq!(texts(&first.root().select(&selector)), vec!["a.b"]);
    assert_eq!(texts(&second.root().select(&selector)), vec!["x"]);
}
