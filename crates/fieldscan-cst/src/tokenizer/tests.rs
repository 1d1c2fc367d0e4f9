// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use super::{tokenize, TokError};
use crate::kind::TokKind;

fn tokenize_all(text: &str) -> Result<Vec<(TokKind, &str)>, TokError> {
    let mut result: Vec<(TokKind, &str)> = tokenize(text)?
        .into_iter()
        .map(|tok| (tok.kind, tok.text))
        .collect();
    // Remove the EndMarker, since it's on every non-error token stream.
    assert_eq!(result.pop().expect("EndMarker").0, TokKind::EndMarker);
    // Also remove the synthesized newline at the end
    if let Some((TokKind::Newline, "")) = result.last() {
        result.pop();
    }
    Ok(result)
}

#[test]
fn test_identifier() {
    assert_eq!(
        tokenize_all("test input"),
        Ok(vec![(TokKind::Name, "test"), (TokKind::Name, "input")])
    );

    assert_eq!(
        tokenize_all("{ends_with_op}"),
        Ok(vec![
            (TokKind::Lbrace, "{"),
            (TokKind::Name, "ends_with_op"),
            (TokKind::Rbrace, "}")
        ])
    );

    assert_eq!(
        tokenize_all("\u{0100}\u{0101}unicode"),
        Ok(vec![(TokKind::Name, "\u{0100}\u{0101}unicode")])
    );
}

#[test]
fn test_numbers() {
    for text in ["0", "1_000", "0xFF", "0o17", "0b1010", "1.5", "1.", ".5", "1e10", "2.5E-3", "3j"] {
        assert_eq!(tokenize_all(text), Ok(vec![(TokKind::Number, text)]), "{}", text);
    }
}

#[test]
fn test_operators_longest_match() {
    assert_eq!(
        tokenize_all("a **= b // c ... ->"),
        Ok(vec![
            (TokKind::Name, "a"),
            (TokKind::DoubleStarEqual, "**="),
            (TokKind::Name, "b"),
            (TokKind::DoubleSlash, "//"),
            (TokKind::Name, "c"),
            (TokKind::Ellipsis, "..."),
            (TokKind::RArrow, "->"),
        ])
    );
}

#[test]
fn test_strings() {
    assert_eq!(
        tokenize_all(r#"'a' "b\"c" r'\d' b"x" f'{y}'"#),
        Ok(vec![
            (TokKind::String, "'a'"),
            (TokKind::String, r#""b\"c""#),
            (TokKind::String, r"r'\d'"),
            (TokKind::String, r#"b"x""#),
            (TokKind::String, "f'{y}'"),
        ])
    );
}

#[test]
fn test_triple_quoted_string_spans_lines() {
    let toks = tokenize("x = '''one\ntwo'''\ny = 1\n").unwrap();
    assert_eq!(toks[2].kind, TokKind::String);
    assert_eq!(toks[2].text, "'''one\ntwo'''");
    assert_eq!(toks[2].line, 1);
    let y = toks.iter().find(|t| t.text == "y").unwrap();
    assert_eq!(y.line, 3);
}

#[test]
fn test_unterminated_string() {
    assert_eq!(
        tokenize_all("x = 'abc\n"),
        Err(TokError::UnterminatedString { line: 1 })
    );
    assert_eq!(
        tokenize_all("x = '''abc\n"),
        Err(TokError::UnterminatedTripleString { line: 1 })
    );
}

#[test]
fn test_indent_dedent() {
    assert_eq!(
        tokenize_all("class A:\n    x = 1\n\n    # comment\n    y = 2\nz = 3\n"),
        Ok(vec![
            (TokKind::Name, "class"),
            (TokKind::Name, "A"),
            (TokKind::Colon, ":"),
            (TokKind::Newline, "\n"),
            (TokKind::Indent, ""),
            (TokKind::Name, "x"),
            (TokKind::Equal, "="),
            (TokKind::Number, "1"),
            (TokKind::Newline, "\n"),
            (TokKind::Name, "y"),
            (TokKind::Equal, "="),
            (TokKind::Number, "2"),
            (TokKind::Newline, "\n"),
            (TokKind::Dedent, ""),
            (TokKind::Name, "z"),
            (TokKind::Equal, "="),
            (TokKind::Number, "3"),
            (TokKind::Newline, "\n"),
        ])
    );
}

#[test]
fn test_dedents_at_end_of_input() {
    let kinds: Vec<TokKind> = tokenize("if a:\n    if b:\n        c")
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        &kinds[kinds.len() - 4..],
        &[TokKind::Newline, TokKind::Dedent, TokKind::Dedent, TokKind::EndMarker]
    );
}

#[test]
fn test_inconsistent_dedent() {
    assert_eq!(
        tokenize_all("if a:\n    b\n  c\n"),
        Err(TokError::Dedent { line: 3 })
    );
}

#[test]
fn test_implicit_line_joining() {
    assert_eq!(
        tokenize_all("f(a,\n  b)"),
        Ok(vec![
            (TokKind::Name, "f"),
            (TokKind::Lpar, "("),
            (TokKind::Name, "a"),
            (TokKind::Comma, ","),
            (TokKind::Name, "b"),
            (TokKind::Rpar, ")"),
        ])
    );
}

#[test]
fn test_backslash_continuation() {
    assert_eq!(
        tokenize_all("a = \\\n    1"),
        Ok(vec![
            (TokKind::Name, "a"),
            (TokKind::Equal, "="),
            (TokKind::Number, "1"),
        ])
    );
    assert_eq!(
        tokenize_all("a = \\ 1"),
        Err(TokError::LineContinuation { line: 1 })
    );
}

#[test]
fn test_brackets_must_balance() {
    assert_eq!(
        tokenize_all("f(a]"),
        Err(TokError::UnmatchedBracket { line: 1, bracket: ']' })
    );
    assert_eq!(tokenize_all("f(a"), Err(TokError::UnexpectedEof { line: 1 }));
}

#[test]
fn test_crlf_line_endings() {
    assert_eq!(
        tokenize_all("a\r\nb"),
        Ok(vec![
            (TokKind::Name, "a"),
            (TokKind::Newline, "\r\n"),
            (TokKind::Name, "b"),
        ])
    );
}

#[test]
fn test_unexpected_character() {
    assert_eq!(
        tokenize_all("a $ b"),
        Err(TokError::UnexpectedCharacter { line: 1, ch: '$' })
    );
}
