// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Reformatted statements parse back to the same token stream.

use fieldscan_cst::{render, SyntaxTree, TokKind};

fn token_stream(source: &str) -> Vec<(TokKind, String)> {
    let tree = SyntaxTree::parse(source).expect("parse");
    tree.root()
        .flatten()
        .into_iter()
        .map(|t| (t.kind(), t.text().to_string()))
        .collect()
}

fn assert_roundtrip(source: &str) {
    let tree = SyntaxTree::parse(source).expect("parse");
    let rendered = render(tree.root().flatten());
    let reparsed = format!("{}\n", rendered);
    assert_eq!(
        token_stream(source),
        token_stream(&reparsed),
        "{:?} rendered as {:?}",
        source,
        rendered
    );
}

#[test]
fn arithmetic_roundtrips() {
    assert_roundtrip("1+2\n");
    assert_roundtrip("x = -(3 ** 2) // 4 % 5\n");
}

#[test]
fn field_declarations_roundtrip() {
    assert_roundtrip("name = models.CharField(max_length=32, default='unknown')\n");
    assert_roundtrip("owner = models.ForeignKey('auth.User', null=True, on_delete=models.CASCADE)\n");
    assert_roundtrip("created = models.DateTimeField(default=datetime.datetime.now)\n");
}

#[test]
fn keyword_expressions_roundtrip() {
    assert_roundtrip("x = a if not b else lambda y: y\n");
    assert_roundtrip("x = [i for i in range(10) if i not in seen]\n");
    assert_roundtrip("x = {'a': 1, **rest}\n");
}

#[test]
fn one_plus_two_renders_compactly() {
    let tree = SyntaxTree::parse("1 + 2\n").expect("parse");
    assert_eq!(render(tree.root().flatten()), "1+2");
}
