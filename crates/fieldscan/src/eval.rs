// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Restricted expression evaluator.
//!
//! Evaluates the literal subset of the expression grammar directly on the
//! concrete syntax tree: numbers, strings, bytes, the keyword constants,
//! tuples, lists, dicts, unary and arithmetic operators, name lookup and
//! attribute access on references. Nothing is ever called. Anything outside
//! that subset is rejected with [`EvalError::Unsupported`].

use std::sync::LazyLock;

use fieldscan_cst::{NodeRef, ParserError, Selector, Symbol, SyntaxTree, TokKind};
use thiserror::Error;

use crate::value::Value;

/// Largest sequence the evaluator will build by repetition or concatenation.
pub const MAX_SEQUENCE_LEN: usize = 1 << 20;

/// Why an expression could not be evaluated.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("unsupported expression: {0}")]
    Unsupported(String),

    #[error("name '{0}' is not bound")]
    UnboundName(String),

    #[error("invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("unsupported operand types for {op}: '{left}' and '{right}'")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("bad operand type for unary {op}: '{operand}'")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,

    #[error("result exceeds {MAX_SEQUENCE_LEN} items")]
    TooLarge,

    #[error(transparent)]
    Parse(#[from] ParserError),
}

pub type EvalResult<T> = Result<T, EvalError>;

// ============================================================================
// Scopes
// ============================================================================

/// Name bindings visible to the evaluator.
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

/// A scope with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl Scope for EmptyScope {
    fn lookup(&self, _name: &str) -> Option<&Value> {
        None
    }
}

/// `top` shadows `base`.
#[derive(Clone, Copy)]
pub struct Overlay<'a> {
    pub top: &'a dyn Scope,
    pub base: &'a dyn Scope,
}

impl<'a> Overlay<'a> {
    pub fn new(top: &'a dyn Scope, base: &'a dyn Scope) -> Self {
        Self { top, base }
    }
}

impl Scope for Overlay<'_> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.top.lookup(name).or_else(|| self.base.lookup(name))
    }
}

// ============================================================================
// Entry points
// ============================================================================

static EXPRESSION_STMT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::compile("^ > stmt > simple_stmt > small_stmt > expr_stmt")
        .expect("expression statement selector is valid")
});

/// Parse `source` as a single expression and evaluate it.
///
/// ```
/// use fieldscan::eval::{evaluate_source, EmptyScope};
/// use fieldscan::value::Value;
///
/// let value = evaluate_source("(1 + 2) * 3", &EmptyScope).unwrap();
/// assert_eq!(value, Value::Int(9));
/// ```
pub fn evaluate_source(source: &str, scope: &dyn Scope) -> EvalResult<Value> {
    let tree = SyntaxTree::parse(&format!("{}\n", source.trim()))?;
    let root = tree.root();
    let statements = root.select(&EXPRESSION_STMT);
    match statements.as_slice() {
        [stmt] if stmt.child_count() == 1 => match stmt.child(0) {
            Some(expr) => evaluate(expr, scope),
            None => Err(EvalError::Unsupported("empty statement".into())),
        },
        _ => Err(EvalError::Unsupported("not a single expression".into())),
    }
}

/// Evaluate an expression node.
pub fn evaluate(node: NodeRef<'_>, scope: &dyn Scope) -> EvalResult<Value> {
    Evaluator { scope }.eval(node)
}

struct Evaluator<'s> {
    scope: &'s dyn Scope,
}

impl Evaluator<'_> {
    fn eval(&self, node: NodeRef<'_>) -> EvalResult<Value> {
        let Some(symbol) = node.symbol() else {
            return Err(unsupported_token(node));
        };
        match symbol {
            Symbol::Testlist | Symbol::Exprlist => self.items_or_single(node),
            Symbol::ArithExpr | Symbol::Term => self.binary_chain(node),
            Symbol::Factor => self.factor(node),
            Symbol::Power => self.power(node),
            Symbol::Atom => self.atom(node),
            Symbol::Test
            | Symbol::NamedexprTest
            | Symbol::OrTest
            | Symbol::AndTest
            | Symbol::NotTest
            | Symbol::Comparison
            | Symbol::Expr
            | Symbol::XorExpr
            | Symbol::AndExpr
            | Symbol::ShiftExpr => match (node.child_count(), node.child(0)) {
                (1, Some(inner)) => self.eval(inner),
                _ => Err(EvalError::Unsupported(describe(symbol).into())),
            },
            other => Err(EvalError::Unsupported(describe(other).into())),
        }
    }

    /// A comma-separated list: a tuple if any comma is present.
    fn items_or_single(&self, node: NodeRef<'_>) -> EvalResult<Value> {
        let has_comma = node.children().any(|c| c.is(TokKind::Comma));
        let mut items = self.items(node)?;
        if !has_comma && items.len() == 1 {
            return Ok(items.remove(0));
        }
        Ok(Value::Tuple(items))
    }

    fn items(&self, node: NodeRef<'_>) -> EvalResult<Vec<Value>> {
        if node.children().any(|c| c.is(Symbol::CompFor)) {
            return Err(EvalError::Unsupported("comprehension".into()));
        }
        node.children()
            .filter(|c| !c.is(TokKind::Comma))
            .map(|item| self.eval(item))
            .collect()
    }

    fn binary_chain(&self, node: NodeRef<'_>) -> EvalResult<Value> {
        let mut children = node.children();
        let Some(first) = children.next() else {
            return Err(EvalError::Unsupported("empty expression".into()));
        };
        let mut acc = self.eval(first)?;
        while let (Some(op), Some(rhs)) = (children.next(), children.next()) {
            let op = op
                .token()
                .map(|t| t.kind())
                .ok_or_else(|| EvalError::Unsupported("operator".into()))?;
            acc = binary(op, acc, self.eval(rhs)?)?;
        }
        Ok(acc)
    }

    fn factor(&self, node: NodeRef<'_>) -> EvalResult<Value> {
        match (node.child(0), node.child(1)) {
            (Some(inner), None) => self.eval(inner),
            (Some(op), Some(operand)) => {
                let op = op.token().map(|t| t.kind()).unwrap_or(TokKind::Plus);
                unary(op, self.eval(operand)?)
            }
            _ => Err(EvalError::Unsupported("empty expression".into())),
        }
    }

    // power: ['await'] atom trailer* ['**' factor]
    fn power(&self, node: NodeRef<'_>) -> EvalResult<Value> {
        if let Some(trailer) = node
            .children()
            .filter(|c| c.is(Symbol::Trailer))
            .find(|t| !t.child(0).is_some_and(|c| c.is(TokKind::Dot)))
        {
            let what = if trailer.child(0).is_some_and(|c| c.is(TokKind::Lpar)) {
                "call"
            } else {
                "subscript"
            };
            return Err(EvalError::Unsupported(what.into()));
        }
        let mut children = node.children().peekable();
        let mut value = match children.next() {
            Some(first) if first.is(Symbol::Atom) => self.atom(first)?,
            _ => return Err(EvalError::Unsupported("await expression".into())),
        };
        while let Some(trailer) = children.next_if(|c| c.is(Symbol::Trailer)) {
            value = attribute(value, trailer)?;
        }
        if let (Some(_), Some(exponent)) = (children.next(), children.next()) {
            value = binary(TokKind::DoubleStar, value, self.eval(exponent)?)?;
        }
        Ok(value)
    }

    fn atom(&self, node: NodeRef<'_>) -> EvalResult<Value> {
        let Some(first) = node.child(0).and_then(|c| c.token()) else {
            return Err(EvalError::Unsupported("atom".into()));
        };
        let inner = node.child(1).filter(|c| c.symbol().is_some());
        match first.kind() {
            TokKind::Lpar => match inner {
                None => Ok(Value::Tuple(Vec::new())),
                Some(body) if body.is(Symbol::TestlistComp) => self.items_or_single(body),
                Some(_) => Err(EvalError::Unsupported("yield expression".into())),
            },
            TokKind::Lsqb => match inner {
                None => Ok(Value::List(Vec::new())),
                Some(body) => Ok(Value::List(self.items(body)?)),
            },
            TokKind::Lbrace => match inner {
                None => Ok(Value::Dict(Vec::new())),
                Some(body) => self.dict(body),
            },
            TokKind::Name => match first.text() {
                "True" => Ok(Value::Bool(true)),
                "False" => Ok(Value::Bool(false)),
                "None" => Ok(Value::None),
                name => self
                    .scope
                    .lookup(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UnboundName(name.to_string())),
            },
            TokKind::Number => parse_number(first.text()),
            TokKind::String => {
                let pieces = node.children().filter_map(|c| c.token()).map(|t| t.text());
                parse_strings(pieces)
            }
            TokKind::Ellipsis => Err(EvalError::Unsupported("Ellipsis".into())),
            _ => Err(unsupported_token(node)),
        }
    }

    // dictorsetmaker, restricted to `test ':' test (',' test ':' test)* [',']`
    fn dict(&self, node: NodeRef<'_>) -> EvalResult<Value> {
        if node.children().any(|c| c.is(Symbol::CompFor)) {
            return Err(EvalError::Unsupported("comprehension".into()));
        }
        if node.children().any(|c| c.is(TokKind::DoubleStar)) {
            return Err(EvalError::Unsupported("dict unpacking".into()));
        }
        if !node.children().any(|c| c.is(TokKind::Colon)) {
            return Err(EvalError::Unsupported("set display".into()));
        }

        let mut pairs: Vec<(Value, Value)> = Vec::new();
        let mut parts = node
            .children()
            .filter(|c| !c.is(TokKind::Comma) && !c.is(TokKind::Colon));
        while let (Some(k), Some(v)) = (parts.next(), parts.next()) {
            let key = self.eval(k)?;
            if !key.is_hashable() {
                return Err(EvalError::Unsupported(format!(
                    "unhashable dict key of type '{}'",
                    key.type_name()
                )));
            }
            let value = self.eval(v)?;
            match pairs.iter_mut().find(|(existing, _)| same_key(existing, &key)) {
                Some(slot) => slot.1 = value,
                None => pairs.push((key, value)),
            }
        }
        Ok(Value::Dict(pairs))
    }
}

/// `.name` on a reference extends the dotted path.
fn attribute(value: Value, trailer: NodeRef<'_>) -> EvalResult<Value> {
    match value {
        Value::Reference(path) => {
            let name = trailer
                .child(1)
                .and_then(|c| c.token())
                .map(|t| t.text())
                .unwrap_or_default();
            Ok(Value::Reference(format!("{path}.{name}")))
        }
        other => Err(EvalError::Unsupported(format!(
            "attribute of '{}' value",
            other.type_name()
        ))),
    }
}

fn describe(symbol: Symbol) -> &'static str {
    match symbol {
        Symbol::Test => "conditional expression",
        Symbol::NamedexprTest => "assignment expression",
        Symbol::OrTest | Symbol::AndTest | Symbol::NotTest => "boolean operator",
        Symbol::Comparison => "comparison",
        Symbol::Expr | Symbol::XorExpr | Symbol::AndExpr | Symbol::ShiftExpr => {
            "bitwise operator"
        }
        Symbol::Lambdef => "lambda",
        Symbol::StarExpr => "starred expression",
        Symbol::YieldExpr => "yield expression",
        other => other.name(),
    }
}

fn unsupported_token(node: NodeRef<'_>) -> EvalError {
    EvalError::Unsupported(format!("token {}", node.kind()))
}

fn op_text(op: TokKind) -> &'static str {
    op.fixed_text().unwrap_or("?")
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Int(n) => Some(Num::Int(*n)),
            Value::Float(x) => Some(Num::Float(*x)),
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }
}

/// Dict key identity: `1`, `1.0` and `True` are the same key.
fn same_key(a: &Value, b: &Value) -> bool {
    match (Num::of(a), Num::of(b)) {
        (Some(Num::Int(x)), Some(Num::Int(y))) => x == y,
        (Some(x), Some(y)) => x.to_f64() == y.to_f64(),
        _ => match (a, b) {
            (Value::Tuple(xs), Value::Tuple(ys)) => {
                xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_key(x, y))
            }
            _ => a == b,
        },
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Int(n) => Some(*n),
        _ => None,
    }
}

fn mismatch(op: TokKind, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op_text(op),
        left: left.type_name(),
        right: right.type_name(),
    }
}

fn unary(op: TokKind, operand: Value) -> EvalResult<Value> {
    let bad = || EvalError::BadOperand {
        op: op_text(op),
        operand: operand.type_name(),
    };
    let num = Num::of(&operand).ok_or_else(bad)?;
    match (op, num) {
        (TokKind::Plus, Num::Int(n)) => Ok(Value::Int(n)),
        (TokKind::Plus, Num::Float(x)) => Ok(Value::Float(x)),
        (TokKind::Minus, Num::Int(n)) => n.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (TokKind::Minus, Num::Float(x)) => Ok(Value::Float(-x)),
        (TokKind::Tilde, Num::Int(n)) => Ok(Value::Int(!n)),
        _ => Err(bad()),
    }
}

fn binary(op: TokKind, left: Value, right: Value) -> EvalResult<Value> {
    if let (Some(a), Some(b)) = (Num::of(&left), Num::of(&right)) {
        return arithmetic(op, a, b);
    }
    match (op, left, right) {
        (TokKind::Plus, Value::Str(a), Value::Str(b)) => {
            check_len(a.len() + b.len())?;
            Ok(Value::Str(a + &b))
        }
        (TokKind::Plus, Value::Bytes(a), Value::Bytes(b)) => Ok(Value::Bytes(concat(a, b)?)),
        (TokKind::Plus, Value::List(a), Value::List(b)) => Ok(Value::List(concat(a, b)?)),
        (TokKind::Plus, Value::Tuple(a), Value::Tuple(b)) => Ok(Value::Tuple(concat(a, b)?)),
        (TokKind::Star, seq, count) | (TokKind::Star, count, seq) if as_int(&count).is_some() => {
            let times = as_int(&count).unwrap_or(0);
            repeat(seq, times, &count)
        }
        (TokKind::Percent, Value::Str(_), _) => {
            Err(EvalError::Unsupported("string formatting".into()))
        }
        (TokKind::At, _, _) => Err(EvalError::Unsupported("matrix multiplication".into())),
        (op, left, right) => Err(mismatch(op, &left, &right)),
    }
}

fn check_len(len: usize) -> EvalResult<()> {
    if len > MAX_SEQUENCE_LEN {
        Err(EvalError::TooLarge)
    } else {
        Ok(())
    }
}

fn concat<T>(mut a: Vec<T>, b: Vec<T>) -> EvalResult<Vec<T>> {
    check_len(a.len() + b.len())?;
    a.extend(b);
    Ok(a)
}

fn repeated<T: Clone>(items: &[T], times: i64) -> EvalResult<Vec<T>> {
    let times = usize::try_from(times.max(0)).map_err(|_| EvalError::TooLarge)?;
    let len = items.len().checked_mul(times).ok_or(EvalError::TooLarge)?;
    check_len(len)?;
    Ok(items.iter().cloned().cycle().take(len).collect())
}

fn repeat(seq: Value, times: i64, count: &Value) -> EvalResult<Value> {
    match seq {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::Str(repeated(&chars, times)?.into_iter().collect()))
        }
        Value::Bytes(b) => Ok(Value::Bytes(repeated(&b, times)?)),
        Value::List(items) => Ok(Value::List(repeated(&items, times)?)),
        Value::Tuple(items) => Ok(Value::Tuple(repeated(&items, times)?)),
        other => Err(mismatch(TokKind::Star, &other, count)),
    }
}

fn arithmetic(op: TokKind, a: Num, b: Num) -> EvalResult<Value> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int_arithmetic(op, x, y),
        _ => float_arithmetic(op, a.to_f64(), b.to_f64()),
    }
}

fn int_arithmetic(op: TokKind, x: i64, y: i64) -> EvalResult<Value> {
    let result = match op {
        TokKind::Plus => x.checked_add(y),
        TokKind::Minus => x.checked_sub(y),
        TokKind::Star => x.checked_mul(y),
        TokKind::Slash => {
            if y == 0 {
                return Err(EvalError::DivisionByZero);
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        TokKind::DoubleSlash => {
            if y == 0 {
                return Err(EvalError::DivisionByZero);
            }
            x.checked_div(y).map(|q| {
                if x % y != 0 && ((x < 0) != (y < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        TokKind::Percent => {
            if y == 0 {
                return Err(EvalError::DivisionByZero);
            }
            x.checked_rem(y)
                .map(|r| if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r })
        }
        TokKind::DoubleStar => {
            if y < 0 {
                if x == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                return Ok(Value::Float((x as f64).powf(y as f64)));
            }
            u32::try_from(y).ok().and_then(|e| x.checked_pow(e))
        }
        TokKind::At => return Err(EvalError::Unsupported("matrix multiplication".into())),
        _ => return Err(EvalError::Unsupported(op.name().into())),
    };
    result.map(Value::Int).ok_or(EvalError::Overflow)
}

fn float_arithmetic(op: TokKind, x: f64, y: f64) -> EvalResult<Value> {
    let divides = matches!(op, TokKind::Slash | TokKind::DoubleSlash | TokKind::Percent);
    if divides && y == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    let result = match op {
        TokKind::Plus => x + y,
        TokKind::Minus => x - y,
        TokKind::Star => x * y,
        TokKind::Slash => x / y,
        TokKind::DoubleSlash => (x / y).floor(),
        TokKind::Percent => {
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                r + y
            } else {
                r
            }
        }
        TokKind::DoubleStar => {
            if x == 0.0 && y < 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            if x < 0.0 && y.fract() != 0.0 {
                return Err(EvalError::Unsupported("complex result".into()));
            }
            let r = x.powf(y);
            if r.is_infinite() && x.is_finite() && y.is_finite() {
                return Err(EvalError::Overflow);
            }
            r
        }
        TokKind::At => return Err(EvalError::Unsupported("matrix multiplication".into())),
        _ => return Err(EvalError::Unsupported(op.name().into())),
    };
    Ok(Value::Float(result))
}

// ============================================================================
// Literals
// ============================================================================

fn parse_number(text: &str) -> EvalResult<Value> {
    let invalid = || EvalError::InvalidLiteral(text.to_string());
    if text.starts_with('_') || text.ends_with('_') || text.contains("__") {
        return Err(invalid());
    }
    let clean = text.replace('_', "").to_ascii_lowercase();
    if clean.ends_with('j') {
        return Err(EvalError::Unsupported("complex literal".into()));
    }

    let radix = match clean.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_int(&clean[2..], radix, text);
    }
    if clean.contains(['.', 'e']) {
        return clean.parse::<f64>().map(Value::Float).map_err(|_| invalid());
    }
    if clean.len() > 1 && clean.starts_with('0') && clean.bytes().any(|b| b != b'0') {
        return Err(invalid());
    }
    parse_int(&clean, 10, text)
}

fn parse_int(digits: &str, radix: u32, text: &str) -> EvalResult<Value> {
    use std::num::IntErrorKind;
    i64::from_str_radix(digits, radix)
        .map(Value::Int)
        .map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => EvalError::Overflow,
            _ => EvalError::InvalidLiteral(text.to_string()),
        })
}

enum StringLiteral {
    Text(String),
    Bytes(Vec<u8>),
}

/// Decode and concatenate adjacent string literal tokens.
fn parse_strings<'a>(pieces: impl Iterator<Item = &'a str>) -> EvalResult<Value> {
    let mut text: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    for piece in pieces {
        match parse_string(piece)? {
            StringLiteral::Text(s) => text.get_or_insert_with(String::new).push_str(&s),
            StringLiteral::Bytes(b) => bytes.get_or_insert_with(Vec::new).extend(b),
        }
        check_len(text.as_ref().map_or(0, String::len) + bytes.as_ref().map_or(0, Vec::len))?;
    }
    match (text, bytes) {
        (Some(_), Some(_)) => Err(EvalError::InvalidLiteral(
            "cannot mix bytes and nonbytes literals".into(),
        )),
        (Some(s), None) => Ok(Value::Str(s)),
        (None, Some(b)) => Ok(Value::Bytes(b)),
        (None, None) => Ok(Value::Str(String::new())),
    }
}

fn parse_string(token: &str) -> EvalResult<StringLiteral> {
    let invalid = || EvalError::InvalidLiteral(token.to_string());
    let quote_at = token.find(['\'', '"']).ok_or_else(invalid)?;
    let prefix = token[..quote_at].to_ascii_lowercase();
    if prefix.contains('f') {
        return Err(EvalError::Unsupported("f-string".into()));
    }
    let is_bytes = prefix.contains('b');
    let is_raw = prefix.contains('r');

    let quoted = &token[quote_at..];
    let delim_len = if quoted.starts_with("'''") || quoted.starts_with("\"\"\"") {
        3
    } else {
        1
    };
    if quoted.len() < delim_len * 2 {
        return Err(invalid());
    }
    let body = &quoted[delim_len..quoted.len() - delim_len];

    if is_bytes {
        if !body.is_ascii() {
            return Err(EvalError::InvalidLiteral(
                "bytes can only contain ASCII literal characters".into(),
            ));
        }
        if is_raw {
            return Ok(StringLiteral::Bytes(body.as_bytes().to_vec()));
        }
        let codes = decode_escapes(body, true)?;
        let bytes = codes
            .into_iter()
            .map(|c| u8::try_from(c).map_err(|_| invalid()))
            .collect::<EvalResult<Vec<u8>>>()?;
        return Ok(StringLiteral::Bytes(bytes));
    }

    if is_raw {
        return Ok(StringLiteral::Text(body.to_string()));
    }
    let text = decode_escapes(body, false)?
        .into_iter()
        .map(|c| char::from_u32(c).ok_or_else(invalid))
        .collect::<EvalResult<String>>()?;
    Ok(StringLiteral::Text(text))
}

/// Decode backslash escapes into code points. Unknown escapes are kept
/// verbatim, backslash included.
fn decode_escapes(body: &str, bytes: bool) -> EvalResult<Vec<u32>> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c as u32);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\' as u32);
            break;
        };
        match esc {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(esc as u32),
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(0x0a),
            'r' => out.push(0x0d),
            't' => out.push(0x09),
            'v' => out.push(0x0b),
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(code);
            }
            'x' => out.push(hex_escape(&mut chars, 2, "\\x")?),
            'u' if !bytes => out.push(hex_escape(&mut chars, 4, "\\u")?),
            'U' if !bytes => out.push(hex_escape(&mut chars, 8, "\\U")?),
            'N' if !bytes => {
                return Err(EvalError::Unsupported("named unicode escape".into()));
            }
            other => {
                out.push('\\' as u32);
                out.push(other as u32);
            }
        }
    }
    Ok(out)
}

fn hex_escape(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    width: usize,
    escape: &str,
) -> EvalResult<u32> {
    let digits: String = chars.by_ref().take(width).collect();
    if digits.len() != width {
        return Err(EvalError::InvalidLiteral(format!("truncated {escape} escape")));
    }
    u32::from_str_radix(&digits, 16)
        .map_err(|_| EvalError::InvalidLiteral(format!("truncated {escape} escape")))
}
