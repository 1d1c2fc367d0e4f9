// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Tokenizer for Python statement blocks.
//!
//! Produces the token stream consumed by the parser: names, numbers, strings
//! and operators, plus the layout tokens `NEWLINE`, `INDENT`, `DEDENT` and a
//! final `ENDMARKER`.
//!
//! # Layout Rules
//!
//! - Blank lines and comment-only lines produce no tokens.
//! - Newlines inside `()`, `[]` and `{}` are ignored (implicit line joining).
//! - A backslash immediately before a newline joins the two lines.
//! - Indentation is measured with tabs advancing to the next multiple of 8.
//! - At end of input a `NEWLINE` is emitted if the last line had tokens,
//!   followed by one `DEDENT` per open indentation level.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::kind::TokKind;

#[cfg(test)]
mod tests;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:0[xX](?:_?[0-9a-fA-F])+|0[oO](?:_?[0-7])+|0[bB](?:_?[01])+|(?:[0-9](?:_?[0-9])*\.?(?:[0-9](?:_?[0-9])*)?|\.[0-9](?:_?[0-9])*)(?:[eE][+-]?[0-9](?:_?[0-9])*)?[jJ]?)",
    )
    .expect("number pattern is valid")
});

/// String prefixes accepted before a quote, compared case-insensitively.
const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// Errors produced while tokenizing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokError {
    #[error("unterminated string literal at line {line}")]
    UnterminatedString { line: u32 },

    #[error("unterminated triple-quoted string starting at line {line}")]
    UnterminatedTripleString { line: u32 },

    #[error("unindent does not match any outer indentation level at line {line}")]
    Dedent { line: u32 },

    #[error("unmatched '{bracket}' at line {line}")]
    UnmatchedBracket { line: u32, bracket: char },

    #[error("unexpected character {ch:?} at line {line}")]
    UnexpectedCharacter { line: u32, ch: char },

    #[error("unexpected character after line continuation at line {line}")]
    LineContinuation { line: u32 },

    #[error("unexpected end of input inside brackets opened at line {line}")]
    UnexpectedEof { line: u32 },
}

impl TokError {
    pub fn line(&self) -> u32 {
        match self {
            TokError::UnterminatedString { line }
            | TokError::UnterminatedTripleString { line }
            | TokError::Dedent { line }
            | TokError::UnmatchedBracket { line, .. }
            | TokError::UnexpectedCharacter { line, .. }
            | TokError::LineContinuation { line }
            | TokError::UnexpectedEof { line } => *line,
        }
    }
}

/// A token with its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tok<'a> {
    pub kind: TokKind,
    pub text: &'a str,
    /// 1-based line of the first character.
    pub line: u32,
    /// 0-based byte column of the first character.
    pub col: u32,
}

/// Tokenize a statement block.
///
/// # Errors
///
/// Returns a [`TokError`] for unterminated strings, inconsistent dedents,
/// unbalanced brackets and characters outside the language.
///
/// # Example
///
/// ```
/// use fieldscan_cst::{tokenize, TokKind};
///
/// let toks = tokenize("x = 1").unwrap();
/// let kinds: Vec<TokKind> = toks.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![TokKind::Name, TokKind::Equal, TokKind::Number, TokKind::Newline, TokKind::EndMarker]
/// );
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Tok<'_>>, TokError> {
    let mut state = TokState::new(source);
    state.run()?;
    Ok(state.tokens)
}

struct TokState<'a> {
    src: &'a str,
    pos: usize,
    line: u32,
    line_start: usize,
    at_line_start: bool,
    indents: Vec<usize>,
    /// Open brackets with the line they were opened on.
    brackets: Vec<(char, u32)>,
    tokens: Vec<Tok<'a>>,
}

impl<'a> TokState<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            line_start: 0,
            at_line_start: true,
            indents: vec![0],
            brackets: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn push(&mut self, kind: TokKind, start: usize) {
        self.tokens.push(Tok {
            kind,
            text: &self.src[start..self.pos],
            line: self.line,
            col: start.saturating_sub(self.line_start) as u32,
        });
    }

    fn push_layout(&mut self, kind: TokKind) {
        self.tokens.push(Tok {
            kind,
            text: "",
            line: self.line,
            col: self.pos.saturating_sub(self.line_start) as u32,
        });
    }

    fn newline(&mut self, width: usize) {
        self.pos += width;
        self.line += 1;
        self.line_start = self.pos;
    }

    /// Width in bytes of a line break at the current position, if any.
    fn line_break(&self) -> Option<usize> {
        let rest = self.rest();
        if rest.starts_with("\r\n") {
            Some(2)
        } else if rest.starts_with('\n') || rest.starts_with('\r') {
            Some(1)
        } else {
            None
        }
    }

    fn line_has_tokens(&self) -> bool {
        matches!(
            self.tokens.last(),
            Some(tok) if !matches!(tok.kind, TokKind::Newline | TokKind::Indent | TokKind::Dedent)
        )
    }

    fn run(&mut self) -> Result<(), TokError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                if !self.indentation()? {
                    break;
                }
            }

            let Some(c) = self.peek() else {
                break;
            };

            match c {
                ' ' | '\t' | '\x0c' => self.pos += 1,
                '#' => self.skip_comment(),
                '\r' | '\n' => {
                    let width = self.line_break().unwrap_or(1);
                    if self.brackets.is_empty() {
                        if self.line_has_tokens() {
                            self.tokens.push(Tok {
                                kind: TokKind::Newline,
                                text: &self.src[self.pos..self.pos + width],
                                line: self.line,
                                col: self.pos.saturating_sub(self.line_start) as u32,
                            });
                        }
                        self.at_line_start = true;
                    }
                    self.newline(width);
                }
                '\\' => {
                    self.pos += 1;
                    match self.line_break() {
                        Some(width) => self.newline(width),
                        None => return Err(TokError::LineContinuation { line: self.line }),
                    }
                }
                '"' | '\'' => self.string(self.pos)?,
                '0'..='9' => self.number()?,
                '.' if matches!(self.peek_second(), Some('0'..='9')) => self.number()?,
                c if c == '_' || c.is_alphabetic() => self.name_or_prefixed_string()?,
                _ => self.operator(c)?,
            }
        }

        if let Some((_, line)) = self.brackets.last() {
            return Err(TokError::UnexpectedEof { line: *line });
        }
        if self.line_has_tokens() {
            self.push_layout(TokKind::Newline);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push_layout(TokKind::Dedent);
        }
        self.push_layout(TokKind::EndMarker);
        Ok(())
    }

    /// Measure indentation at the start of a logical line and emit
    /// `INDENT`/`DEDENT` tokens. Returns false at end of input.
    fn indentation(&mut self) -> Result<bool, TokError> {
        loop {
            let mut width = 0usize;
            let mut offset = 0usize;
            for c in self.rest().chars() {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / 8 + 1) * 8,
                    '\x0c' => width = 0,
                    _ => break,
                }
                offset += 1;
            }
            self.pos += offset;

            match self.peek() {
                None => return Ok(false),
                Some('#') => {
                    self.skip_comment();
                    match self.line_break() {
                        Some(w) => self.newline(w),
                        None => return Ok(false),
                    }
                }
                Some('\r') | Some('\n') => {
                    let w = self.line_break().unwrap_or(1);
                    self.newline(w);
                }
                Some(_) => {
                    let current = self.indents.last().copied().unwrap_or(0);
                    if width > current {
                        self.indents.push(width);
                        self.push_layout(TokKind::Indent);
                    } else if width < current {
                        while self.indents.last().is_some_and(|&level| level > width) {
                            self.indents.pop();
                            self.push_layout(TokKind::Dedent);
                        }
                        if self.indents.last().copied() != Some(width) {
                            return Err(TokError::Dedent { line: self.line });
                        }
                    }
                    self.at_line_start = false;
                    return Ok(true);
                }
            }
        }
    }

    fn skip_comment(&mut self) {
        let end = self
            .rest()
            .find(['\r', '\n'])
            .map(|i| self.pos + i)
            .unwrap_or(self.src.len());
        self.pos = end;
    }

    fn number(&mut self) -> Result<(), TokError> {
        let start = self.pos;
        match NUMBER.find(self.rest()) {
            Some(m) if !m.as_str().is_empty() => {
                self.pos += m.end();
                self.push(TokKind::Number, start);
                Ok(())
            }
            _ => Err(TokError::UnexpectedCharacter {
                line: self.line,
                ch: self.peek().unwrap_or('.'),
            }),
        }
    }

    fn name_or_prefixed_string(&mut self) -> Result<(), TokError> {
        let start = self.pos;
        let len: usize = self
            .rest()
            .chars()
            .take_while(|c| *c == '_' || c.is_alphanumeric())
            .map(char::len_utf8)
            .sum();
        let word = &self.src[start..start + len];
        let quoted = matches!(self.src[start + len..].chars().next(), Some('"' | '\''));
        if quoted && STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str()) {
            self.pos += len;
            return self.string(start);
        }
        self.pos += len;
        self.push(TokKind::Name, start);
        Ok(())
    }

    /// Scan a string literal whose prefix (if any) starts at `start` and
    /// whose opening quote is at the current position.
    fn string(&mut self, start: usize) -> Result<(), TokError> {
        let start_line = self.line;
        let start_col = start.saturating_sub(self.line_start) as u32;
        let quote = self.peek().unwrap_or('"');
        let triple = quote.to_string().repeat(3);
        let is_triple = self.rest().starts_with(triple.as_str());
        self.pos += if is_triple { 3 } else { 1 };

        loop {
            let Some(c) = self.peek() else {
                return Err(if is_triple {
                    TokError::UnterminatedTripleString { line: start_line }
                } else {
                    TokError::UnterminatedString { line: start_line }
                });
            };
            match c {
                '\\' => {
                    self.pos += 1;
                    match self.line_break() {
                        Some(width) => self.newline(width),
                        None => {
                            if let Some(escaped) = self.peek() {
                                self.pos += escaped.len_utf8();
                            }
                        }
                    }
                }
                '\r' | '\n' => {
                    if !is_triple {
                        return Err(TokError::UnterminatedString { line: start_line });
                    }
                    let width = self.line_break().unwrap_or(1);
                    self.newline(width);
                }
                c if c == quote => {
                    if !is_triple {
                        self.pos += 1;
                        break;
                    }
                    if self.rest().starts_with(triple.as_str()) {
                        self.pos += 3;
                        break;
                    }
                    self.pos += 1;
                }
                c => self.pos += c.len_utf8(),
            }
        }

        self.tokens.push(Tok {
            kind: TokKind::String,
            text: &self.src[start..self.pos],
            line: start_line,
            col: start_col,
        });
        Ok(())
    }

    fn operator(&mut self, c: char) -> Result<(), TokError> {
        let start = self.pos;
        let rest = self.rest();
        let kind = [3usize, 2, 1].iter().find_map(|&width| {
            rest.get(..width).and_then(TokKind::from_operator)
        });
        let Some(kind) = kind else {
            return Err(TokError::UnexpectedCharacter { line: self.line, ch: c });
        };

        match kind {
            TokKind::Lpar | TokKind::Lsqb | TokKind::Lbrace => self.brackets.push((c, self.line)),
            TokKind::Rpar | TokKind::Rsqb | TokKind::Rbrace => {
                let opener = match kind {
                    TokKind::Rpar => '(',
                    TokKind::Rsqb => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == opener => {}
                    _ => {
                        return Err(TokError::UnmatchedBracket {
                            line: self.line,
                            bracket: c,
                        })
                    }
                }
            }
            _ => {}
        }

        self.pos += kind.fixed_text().map(str::len).unwrap_or(1);
        self.push(kind, start);
        Ok(())
    }
}
