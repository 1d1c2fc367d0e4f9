// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! The statement-block grammar, written as a `peg` grammar over tokens.
//!
//! Productions follow the classic statement grammar with every symbol kept
//! as a node. Rules that share a prefix are factored so that no input is
//! parsed twice by sibling alternatives.

use std::fmt;

use peg::{Parse, ParseElem, RuleResult};

use crate::kind::{is_constant, is_keyword, Symbol, TokKind};
use crate::tokenizer::Tok;
use crate::tree::{Element, SyntaxNode, Token};

const COMP_OPS: &[TokKind] = &[
    TokKind::Less,
    TokKind::Greater,
    TokKind::EqEqual,
    TokKind::GreaterEqual,
    TokKind::LessEqual,
    TokKind::NotEqual,
];
const SHIFT_OPS: &[TokKind] = &[TokKind::LeftShift, TokKind::RightShift];
const ARITH_OPS: &[TokKind] = &[TokKind::Plus, TokKind::Minus];
const TERM_OPS: &[TokKind] = &[
    TokKind::Star,
    TokKind::At,
    TokKind::Slash,
    TokKind::Percent,
    TokKind::DoubleSlash,
];
const UNARY_OPS: &[TokKind] = &[TokKind::Plus, TokKind::Minus, TokKind::Tilde];
const UNPACK_OPS: &[TokKind] = &[TokKind::Star, TokKind::DoubleStar];
const BINDING_OPS: &[TokKind] = &[TokKind::Equal, TokKind::ColonEqual];
const RELATIVE_DOTS: &[TokKind] = &[TokKind::Dot, TokKind::Ellipsis];

// ============================================================================
// Token input
// ============================================================================

/// The token stream the grammar runs over.
pub struct TokVec<'a>(Vec<Tok<'a>>);

impl<'a> From<Vec<Tok<'a>>> for TokVec<'a> {
    fn from(toks: Vec<Tok<'a>>) -> Self {
        TokVec(toks)
    }
}

/// The token a parse failed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserPosition {
    pub line: u32,
    pub column: u32,
    /// Description of the offending token.
    pub found: String,
}

impl fmt::Display for ParserPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl Parse for TokVec<'_> {
    type PositionRepr = ParserPosition;

    fn start(&self) -> usize {
        0
    }

    fn is_eof(&self, pos: usize) -> bool {
        pos >= self.0.len()
    }

    fn position_repr(&self, pos: usize) -> ParserPosition {
        match self.0.get(pos).or_else(|| self.0.last()) {
            Some(tok) => ParserPosition {
                line: tok.line,
                column: tok.col,
                found: describe(tok),
            },
            None => ParserPosition {
                line: 1,
                column: 0,
                found: TokKind::EndMarker.name().to_string(),
            },
        }
    }
}

impl<'input, 'a: 'input> ParseElem<'input> for TokVec<'a> {
    type Element = Tok<'a>;

    fn parse_elem(&'input self, pos: usize) -> RuleResult<Tok<'a>> {
        match self.0.get(pos) {
            Some(tok) => RuleResult::Matched(pos + 1, *tok),
            None => RuleResult::Failed,
        }
    }
}

fn describe(tok: &Tok<'_>) -> String {
    match tok.kind {
        TokKind::Name | TokKind::Number | TokKind::String => format!("{:?}", tok.text),
        kind => match kind.fixed_text() {
            Some(text) => format!("'{}'", text),
            None => kind.name().to_string(),
        },
    }
}

// ============================================================================
// Node construction
// ============================================================================

fn leaf(tok: Tok<'_>) -> Element {
    Element::Token(Token::new(tok.kind, tok.text))
}

fn node(symbol: Symbol, children: Vec<Element>) -> Element {
    Element::Node(SyntaxNode::new(symbol, children))
}

/// `first (sep item)* [sep]`, flattened in source order.
fn list(first: Element, rest: Vec<[Element; 2]>, trailing: Option<Element>) -> Vec<Element> {
    let mut children = vec![first];
    children.extend(rest.into_iter().flatten());
    children.extend(trailing);
    children
}

/// `head parts...` with optional pieces dropped.
fn seq(head: Vec<Element>, parts: impl IntoIterator<Item = Option<Vec<Element>>>) -> Vec<Element> {
    let mut children = head;
    children.extend(parts.into_iter().flatten().flatten());
    children
}

fn expected(kind: TokKind) -> &'static str {
    kind.fixed_text().unwrap_or(kind.name())
}

peg::parser! {
    pub grammar python<'a>() for TokVec<'a> {

        // ====================================================================
        // Terminals
        // ====================================================================

        rule op(kind: TokKind) -> Element
            = [t] {? if t.kind == kind { Ok(leaf(t)) } else { Err(expected(kind)) } }

        rule ops(kinds: &'static [TokKind]) -> Element
            = [t] {? if kinds.contains(&t.kind) { Ok(leaf(t)) } else { Err("operator") } }

        rule kw(word: &'static str) -> Element
            = [t] {? if t.kind == TokKind::Name && t.text == word { Ok(leaf(t)) } else { Err(word) } }

        /// A `NAME` that is not a reserved word.
        rule name() -> Element
            = [t] {? if t.kind == TokKind::Name && !is_keyword(t.text) { Ok(leaf(t)) } else { Err("name") } }

        rule comma() -> Element = op(TokKind::Comma)

        // ====================================================================
        // Statements
        // ====================================================================

        // file_input: (NEWLINE | stmt)* ENDMARKER
        pub rule file_input() -> SyntaxNode
            = items:(op(TokKind::Newline) / stmt())* end:op(TokKind::EndMarker) {
                let mut children = items;
                children.push(end);
                SyntaxNode::new(Symbol::FileInput, children)
            }

        // stmt: simple_stmt | compound_stmt
        rule stmt() -> Element
            = s:(compound_stmt() / simple_stmt()) { node(Symbol::Stmt, vec![s]) }

        // simple_stmt: small_stmt (';' small_stmt)* [';'] NEWLINE
        rule simple_stmt() -> Element
            = first:small_stmt() rest:(s:op(TokKind::Semi) t:small_stmt() { [s, t] })*
              semi:op(TokKind::Semi)? nl:op(TokKind::Newline) {
                let mut children = list(first, rest, semi);
                children.push(nl);
                node(Symbol::SimpleStmt, children)
            }

        // small_stmt: expr_stmt | del_stmt | pass_stmt | flow_stmt | import_stmt
        //           | global_stmt | nonlocal_stmt | assert_stmt
        rule small_stmt() -> Element
            = s:(
                del_stmt() / pass_stmt() / flow_stmt() / import_stmt()
                / name_list_stmt("global", Symbol::GlobalStmt)
                / name_list_stmt("nonlocal", Symbol::NonlocalStmt)
                / assert_stmt() / expr_stmt()
            ) { node(Symbol::SmallStmt, vec![s]) }

        // expr_stmt: testlist (annassign | augassign (yield_expr|testlist) |
        //                      ('=' (yield_expr|testlist))*)
        rule expr_stmt() -> Element
            = target:testlist() tail:expr_stmt_tail() { node(Symbol::ExprStmt, seq(vec![target], [Some(tail)])) }

        rule expr_stmt_tail() -> Vec<Element>
            = a:annassign() { vec![a] }
            / a:augassign() v:yield_or_testlist() { vec![a, v] }
            / assigns:(e:op(TokKind::Equal) v:yield_or_testlist() { [e, v] })* {
                assigns.into_iter().flatten().collect()
            }

        // annassign: ':' test ['=' (yield_expr|testlist)]
        rule annassign() -> Element
            = c:op(TokKind::Colon) t:test() v:(e:op(TokKind::Equal) r:yield_or_testlist() { vec![e, r] })? {
                node(Symbol::Annassign, seq(vec![c, t], [v]))
            }

        rule augassign() -> Element
            = [t] {?
                if t.kind.is_augassign() {
                    Ok(node(Symbol::Augassign, vec![leaf(t)]))
                } else {
                    Err("augmented assignment")
                }
            }

        rule yield_or_testlist() -> Element = yield_expr() / testlist()

        // del_stmt: 'del' exprlist
        rule del_stmt() -> Element
            = k:kw("del") e:exprlist() { node(Symbol::DelStmt, vec![k, e]) }

        rule pass_stmt() -> Element
            = k:kw("pass") { node(Symbol::PassStmt, vec![k]) }

        // flow_stmt: break_stmt | continue_stmt | return_stmt | raise_stmt | yield_stmt
        rule flow_stmt() -> Element
            = s:(
                k:kw("break") { node(Symbol::BreakStmt, vec![k]) }
                / k:kw("continue") { node(Symbol::ContinueStmt, vec![k]) }
                / return_stmt() / raise_stmt()
                / y:yield_expr() { node(Symbol::YieldStmt, vec![y]) }
            ) { node(Symbol::FlowStmt, vec![s]) }

        // return_stmt: 'return' [testlist]
        rule return_stmt() -> Element
            = k:kw("return") v:testlist()? { node(Symbol::ReturnStmt, seq(vec![k], [v.map(|v| vec![v])])) }

        // raise_stmt: 'raise' [test ['from' test]]
        rule raise_stmt() -> Element
            = k:kw("raise") arg:raise_arg()? { node(Symbol::RaiseStmt, seq(vec![k], [arg])) }

        rule raise_arg() -> Vec<Element>
            = t:test() cause:(f:kw("from") c:test() { vec![f, c] })? { seq(vec![t], [cause]) }

        // import_stmt: import_name | import_from
        rule import_stmt() -> Element
            = i:(import_name() / import_from()) { node(Symbol::ImportStmt, vec![i]) }

        // import_name: 'import' dotted_as_names
        rule import_name() -> Element
            = k:kw("import") n:dotted_as_names() { node(Symbol::ImportName, vec![k, n]) }

        // import_from: 'from' (('.' | '...')* dotted_name | ('.' | '...')+)
        //              'import' ('*' | '(' import_as_names ')' | import_as_names)
        rule import_from() -> Element
            = f:kw("from") dots:ops(RELATIVE_DOTS)* module:dotted_name()? i:kw("import") targets:import_targets() {?
                if dots.is_empty() && module.is_none() {
                    Err("module name")
                } else {
                    let mut children = vec![f];
                    children.extend(dots);
                    children.extend(module);
                    children.push(i);
                    children.extend(targets);
                    Ok(node(Symbol::ImportFrom, children))
                }
            }

        rule import_targets() -> Vec<Element>
            = s:op(TokKind::Star) { vec![s] }
            / l:op(TokKind::Lpar) n:import_as_names() r:op(TokKind::Rpar) { vec![l, n, r] }
            / n:import_as_names() { vec![n] }

        // import_as_names: import_as_name (',' import_as_name)* [',']
        rule import_as_names() -> Element
            = first:import_as_name() rest:(c:comma() n:import_as_name() { [c, n] })* trailing:comma()? {
                node(Symbol::ImportAsNames, list(first, rest, trailing))
            }

        // import_as_name: NAME ['as' NAME]
        rule import_as_name() -> Element
            = n:name() alias:alias()? { node(Symbol::ImportAsName, seq(vec![n], [alias])) }

        // dotted_as_names: dotted_as_name (',' dotted_as_name)*
        rule dotted_as_names() -> Element
            = first:dotted_as_name() rest:(c:comma() d:dotted_as_name() { [c, d] })* {
                node(Symbol::DottedAsNames, list(first, rest, None))
            }

        // dotted_as_name: dotted_name ['as' NAME]
        rule dotted_as_name() -> Element
            = d:dotted_name() alias:alias()? { node(Symbol::DottedAsName, seq(vec![d], [alias])) }

        rule alias() -> Vec<Element>
            = a:kw("as") n:name() { vec![a, n] }

        // dotted_name: NAME ('.' NAME)*
        rule dotted_name() -> Element
            = first:name() rest:(d:op(TokKind::Dot) n:name() { [d, n] })* {
                node(Symbol::DottedName, list(first, rest, None))
            }

        // global_stmt: 'global' NAME (',' NAME)*
        // nonlocal_stmt: 'nonlocal' NAME (',' NAME)*
        rule name_list_stmt(word: &'static str, symbol: Symbol) -> Element
            = k:kw(word) first:name() rest:(c:comma() n:name() { [c, n] })* {
                node(symbol, seq(vec![k], [Some(list(first, rest, None))]))
            }

        // assert_stmt: 'assert' test [',' test]
        rule assert_stmt() -> Element
            = k:kw("assert") t:test() msg:(c:comma() m:test() { vec![c, m] })? {
                node(Symbol::AssertStmt, seq(vec![k, t], [msg]))
            }

        // ====================================================================
        // Compound statements
        // ====================================================================

        // compound_stmt: if_stmt | while_stmt | for_stmt | try_stmt | with_stmt
        //              | funcdef | classdef | decorated | async_stmt
        rule compound_stmt() -> Element
            = c:(
                if_stmt() / while_stmt() / for_stmt() / try_stmt() / with_stmt()
                / funcdef() / classdef() / decorated() / async_stmt()
            ) { node(Symbol::CompoundStmt, vec![c]) }

        // async_stmt: 'async' (funcdef | with_stmt | for_stmt)
        rule async_stmt() -> Element
            = k:kw("async") t:(funcdef() / with_stmt() / for_stmt()) { node(Symbol::AsyncStmt, vec![k, t]) }

        // decorated: decorators (classdef | funcdef | async_stmt)
        rule decorated() -> Element
            = d:decorators() t:(classdef() / funcdef() / async_stmt()) { node(Symbol::Decorated, vec![d, t]) }

        // decorators: decorator+
        rule decorators() -> Element
            = ds:decorator()+ { node(Symbol::Decorators, ds) }

        // decorator: '@' namedexpr_test NEWLINE
        rule decorator() -> Element
            = a:op(TokKind::At) e:namedexpr_test() nl:op(TokKind::Newline) { node(Symbol::Decorator, vec![a, e, nl]) }

        // if_stmt: 'if' namedexpr_test ':' suite ('elif' namedexpr_test ':' suite)*
        //          ['else' ':' suite]
        rule if_stmt() -> Element
            = k:kw("if") c:namedexpr_test() b:block()
              elifs:(e:kw("elif") t:namedexpr_test() b:block() { seq(vec![e, t], [Some(b)]) })*
              orelse:else_clause()? {
                let mut children = seq(vec![k, c], [Some(b)]);
                children.extend(elifs.into_iter().flatten());
                node(Symbol::IfStmt, seq(children, [orelse]))
            }

        // while_stmt: 'while' namedexpr_test ':' suite ['else' ':' suite]
        rule while_stmt() -> Element
            = k:kw("while") c:namedexpr_test() b:block() orelse:else_clause()? {
                node(Symbol::WhileStmt, seq(vec![k, c], [Some(b), orelse]))
            }

        // for_stmt: 'for' exprlist 'in' testlist ':' suite ['else' ':' suite]
        rule for_stmt() -> Element
            = k:kw("for") t:exprlist() i:kw("in") l:testlist() b:block() orelse:else_clause()? {
                node(Symbol::ForStmt, seq(vec![k, t, i, l], [Some(b), orelse]))
            }

        // try_stmt: 'try' ':' suite
        //           ((except_clause ':' suite)+ ['else' ':' suite] ['finally' ':' suite]
        //           | 'finally' ':' suite)
        rule try_stmt() -> Element
            = k:kw("try") b:block() rest:try_tail() { node(Symbol::TryStmt, seq(vec![k], [Some(b), Some(rest)])) }

        rule try_tail() -> Vec<Element>
            = handlers:(h:except_clause() b:block() { seq(vec![h], [Some(b)]) })+
              orelse:else_clause()? last:finally_clause()? {
                seq(handlers.into_iter().flatten().collect(), [orelse, last])
            }
            / finally_clause()

        rule finally_clause() -> Vec<Element>
            = f:kw("finally") b:block() { seq(vec![f], [Some(b)]) }

        // except_clause: 'except' [test ['as' NAME]]
        rule except_clause() -> Element
            = k:kw("except") t:(t:test() a:alias()? { seq(vec![t], [a]) })? {
                node(Symbol::ExceptClause, seq(vec![k], [t]))
            }

        // with_stmt: 'with' with_item (',' with_item)* ':' suite
        rule with_stmt() -> Element
            = k:kw("with") first:with_item() rest:(c:comma() w:with_item() { [c, w] })* b:block() {
                node(Symbol::WithStmt, seq(vec![k], [Some(list(first, rest, None)), Some(b)]))
            }

        // with_item: test ['as' expr]
        rule with_item() -> Element
            = t:test() target:(a:kw("as") e:expr() { vec![a, e] })? { node(Symbol::WithItem, seq(vec![t], [target])) }

        // funcdef: 'def' NAME parameters ['->' test] ':' suite
        rule funcdef() -> Element
            = k:kw("def") n:name() p:parameters()
              ret:(a:op(TokKind::RArrow) t:test() { vec![a, t] })? b:block() {
                node(Symbol::Funcdef, seq(vec![k, n, p], [ret, Some(b)]))
            }

        // parameters: '(' [typedargslist] ')'
        rule parameters() -> Element
            = l:op(TokKind::Lpar) a:params(Symbol::Typedargslist, true)? r:op(TokKind::Rpar) {
                node(Symbol::Parameters, seq(vec![l], [a.map(|a| vec![a]), Some(vec![r])]))
            }

        // typedargslist / varargslist: comma-separated parameters, where each
        // is '/', '*' [param], '**' param, or param ['=' test].
        rule params(symbol: Symbol, annotated: bool) -> Element
            = first:param_item(annotated) rest:(c:comma() p:param_item(annotated) { seq(vec![c], [Some(p)]) })*
              trailing:comma()? {
                let mut children = first;
                children.extend(rest.into_iter().flatten());
                children.extend(trailing);
                node(symbol, children)
            }

        rule param_item(annotated: bool) -> Vec<Element>
            = s:op(TokKind::Slash) { vec![s] }
            / s:op(TokKind::Star) p:param(annotated)? { seq(vec![s], [p.map(|p| vec![p])]) }
            / s:op(TokKind::DoubleStar) p:param(annotated) { vec![s, p] }
            / p:param(annotated) d:(e:op(TokKind::Equal) t:test() { vec![e, t] })? { seq(vec![p], [d]) }

        // tfpdef: NAME [':' test]
        // vfpdef: NAME
        rule param(annotated: bool) -> Element
            = n:name() ann:(
                c:(c:op(TokKind::Colon) {? if annotated { Ok(c) } else { Err("parameter") } })
                t:test() { vec![c, t] }
            )? {
                let symbol = if annotated { Symbol::Tfpdef } else { Symbol::Vfpdef };
                node(symbol, seq(vec![n], [ann]))
            }

        // classdef: 'class' NAME ['(' [arglist] ')'] ':' suite
        rule classdef() -> Element
            = k:kw("class") n:name()
              bases:(l:op(TokKind::Lpar) a:arglist()? r:op(TokKind::Rpar) { seq(vec![l], [a.map(|a| vec![a]), Some(vec![r])]) })?
              b:block() {
                node(Symbol::Classdef, seq(vec![k, n], [bases, Some(b)]))
            }

        /// `':' suite`
        rule block() -> Vec<Element>
            = c:op(TokKind::Colon) s:suite() { vec![c, s] }

        /// `'else' ':' suite`
        rule else_clause() -> Vec<Element>
            = e:kw("else") b:block() { seq(vec![e], [Some(b)]) }

        // suite: simple_stmt | NEWLINE INDENT stmt+ DEDENT
        rule suite() -> Element
            = nl:op(TokKind::Newline) indent:op(TokKind::Indent) body:stmt()+ dedent:op(TokKind::Dedent) {
                let mut children = vec![nl, indent];
                children.extend(body);
                children.push(dedent);
                node(Symbol::Suite, children)
            }
            / s:simple_stmt() { node(Symbol::Suite, vec![s]) }

        // ====================================================================
        // Expressions
        // ====================================================================

        // testlist: (test|star_expr) (',' (test|star_expr))* [',']
        rule testlist() -> Element
            = first:test_or_star() rest:(c:comma() t:test_or_star() { [c, t] })* trailing:comma()? {
                node(Symbol::Testlist, list(first, rest, trailing))
            }

        // exprlist: (expr|star_expr) (',' (expr|star_expr))* [',']
        rule exprlist() -> Element
            = first:expr_or_star() rest:(c:comma() e:expr_or_star() { [c, e] })* trailing:comma()? {
                node(Symbol::Exprlist, list(first, rest, trailing))
            }

        rule test_or_star() -> Element = star_expr() / test()

        rule expr_or_star() -> Element = star_expr() / expr()

        rule namedexpr_or_star() -> Element = star_expr() / namedexpr_test()

        // star_expr: '*' expr
        rule star_expr() -> Element
            = s:op(TokKind::Star) e:expr() { node(Symbol::StarExpr, vec![s, e]) }

        // namedexpr_test: test [':=' test]
        rule namedexpr_test() -> Element
            = t:test() w:(c:op(TokKind::ColonEqual) v:test() { vec![c, v] })? {
                node(Symbol::NamedexprTest, seq(vec![t], [w]))
            }

        // test: or_test ['if' or_test 'else' test] | lambdef
        rule test() -> Element
            = l:lambdef() { node(Symbol::Test, vec![l]) }
            / o:or_test() cond:(i:kw("if") c:or_test() e:kw("else") t:test() { vec![i, c, e, t] })? {
                node(Symbol::Test, seq(vec![o], [cond]))
            }

        // lambdef: 'lambda' [varargslist] ':' test
        rule lambdef() -> Element
            = k:kw("lambda") a:params(Symbol::Varargslist, false)? c:op(TokKind::Colon) t:test() {
                node(Symbol::Lambdef, seq(vec![k], [a.map(|a| vec![a]), Some(vec![c, t])]))
            }

        // or_test: and_test ('or' and_test)*
        rule or_test() -> Element
            = first:and_test() rest:(k:kw("or") a:and_test() { [k, a] })* {
                node(Symbol::OrTest, list(first, rest, None))
            }

        // and_test: not_test ('and' not_test)*
        rule and_test() -> Element
            = first:not_test() rest:(k:kw("and") n:not_test() { [k, n] })* {
                node(Symbol::AndTest, list(first, rest, None))
            }

        // not_test: 'not' not_test | comparison
        rule not_test() -> Element
            = k:kw("not") n:not_test() { node(Symbol::NotTest, vec![k, n]) }
            / c:comparison() { node(Symbol::NotTest, vec![c]) }

        // comparison: expr (comp_op expr)*
        rule comparison() -> Element
            = first:expr() rest:(o:comp_op() e:expr() { [o, e] })* {
                node(Symbol::Comparison, list(first, rest, None))
            }

        // comp_op: '<'|'>'|'=='|'>='|'<='|'!='|'in'|'not' 'in'|'is'|'is' 'not'
        rule comp_op() -> Element
            = o:ops(COMP_OPS) { node(Symbol::CompOp, vec![o]) }
            / i:kw("in") { node(Symbol::CompOp, vec![i]) }
            / n:kw("not") i:kw("in") { node(Symbol::CompOp, vec![n, i]) }
            / i:kw("is") n:kw("not")? { node(Symbol::CompOp, seq(vec![i], [n.map(|n| vec![n])])) }

        // expr: xor_expr ('|' xor_expr)*
        rule expr() -> Element
            = first:xor_expr() rest:(o:op(TokKind::Vbar) x:xor_expr() { [o, x] })* {
                node(Symbol::Expr, list(first, rest, None))
            }

        // xor_expr: and_expr ('^' and_expr)*
        rule xor_expr() -> Element
            = first:and_expr() rest:(o:op(TokKind::Circumflex) a:and_expr() { [o, a] })* {
                node(Symbol::XorExpr, list(first, rest, None))
            }

        // and_expr: shift_expr ('&' shift_expr)*
        rule and_expr() -> Element
            = first:shift_expr() rest:(o:op(TokKind::Amper) s:shift_expr() { [o, s] })* {
                node(Symbol::AndExpr, list(first, rest, None))
            }

        // shift_expr: arith_expr (('<<'|'>>') arith_expr)*
        rule shift_expr() -> Element
            = first:arith_expr() rest:(o:ops(SHIFT_OPS) a:arith_expr() { [o, a] })* {
                node(Symbol::ShiftExpr, list(first, rest, None))
            }

        // arith_expr: term (('+'|'-') term)*
        rule arith_expr() -> Element
            = first:term() rest:(o:ops(ARITH_OPS) t:term() { [o, t] })* {
                node(Symbol::ArithExpr, list(first, rest, None))
            }

        // term: factor (('*'|'@'|'/'|'%'|'//') factor)*
        rule term() -> Element
            = first:factor() rest:(o:ops(TERM_OPS) f:factor() { [o, f] })* {
                node(Symbol::Term, list(first, rest, None))
            }

        // factor: ('+'|'-'|'~') factor | power
        rule factor() -> Element
            = o:ops(UNARY_OPS) f:factor() { node(Symbol::Factor, vec![o, f]) }
            / p:power() { node(Symbol::Factor, vec![p]) }

        // power: ['await'] atom trailer* ['**' factor]
        rule power() -> Element
            = aw:kw("await")? a:atom() trailers:trailer()*
              exp:(o:op(TokKind::DoubleStar) f:factor() { vec![o, f] })? {
                let mut children: Vec<Element> = aw.into_iter().collect();
                children.push(a);
                children.extend(trailers);
                node(Symbol::Power, seq(children, [exp]))
            }

        // atom: '(' [yield_expr|testlist_comp] ')' | '[' [testlist_comp] ']'
        //     | '{' [dictorsetmaker] '}' | NAME | NUMBER | STRING+ | '...'
        //     | 'None' | 'True' | 'False'
        rule atom() -> Element
            = l:op(TokKind::Lpar) inner:(yield_expr() / testlist_comp())? r:op(TokKind::Rpar) {
                node(Symbol::Atom, seq(vec![l], [inner.map(|i| vec![i]), Some(vec![r])]))
            }
            / l:op(TokKind::Lsqb) inner:testlist_comp()? r:op(TokKind::Rsqb) {
                node(Symbol::Atom, seq(vec![l], [inner.map(|i| vec![i]), Some(vec![r])]))
            }
            / l:op(TokKind::Lbrace) inner:dictorsetmaker()? r:op(TokKind::Rbrace) {
                node(Symbol::Atom, seq(vec![l], [inner.map(|i| vec![i]), Some(vec![r])]))
            }
            / strings:op(TokKind::String)+ { node(Symbol::Atom, strings) }
            / t:(op(TokKind::Number) / op(TokKind::Ellipsis)) { node(Symbol::Atom, vec![t]) }
            / [t] {?
                if t.kind == TokKind::Name && (!is_keyword(t.text) || is_constant(t.text)) {
                    Ok(node(Symbol::Atom, vec![leaf(t)]))
                } else {
                    Err("expression")
                }
            }

        // testlist_comp: (namedexpr_test|star_expr)
        //                ( comp_for | (',' (namedexpr_test|star_expr))* [','] )
        rule testlist_comp() -> Element
            = first:namedexpr_or_star() tail:testlist_comp_tail() {
                node(Symbol::TestlistComp, seq(vec![first], [Some(tail)]))
            }

        rule testlist_comp_tail() -> Vec<Element>
            = c:comp_for() { vec![c] }
            / rest:(c:comma() t:namedexpr_or_star() { [c, t] })* trailing:comma()? {
                let mut children: Vec<Element> = rest.into_iter().flatten().collect();
                children.extend(trailing);
                children
            }

        // trailer: '(' [arglist] ')' | '[' subscriptlist ']' | '.' NAME
        rule trailer() -> Element
            = l:op(TokKind::Lpar) a:arglist()? r:op(TokKind::Rpar) {
                node(Symbol::Trailer, seq(vec![l], [a.map(|a| vec![a]), Some(vec![r])]))
            }
            / l:op(TokKind::Lsqb) s:subscriptlist() r:op(TokKind::Rsqb) { node(Symbol::Trailer, vec![l, s, r]) }
            / d:op(TokKind::Dot) n:name() { node(Symbol::Trailer, vec![d, n]) }

        // subscriptlist: subscript (',' subscript)* [',']
        rule subscriptlist() -> Element
            = first:subscript() rest:(c:comma() s:subscript() { [c, s] })* trailing:comma()? {
                node(Symbol::Subscriptlist, list(first, rest, trailing))
            }

        // subscript: test | [test] ':' [test] [sliceop]
        rule subscript() -> Element
            = t:test() slice:slice_tail()? { node(Symbol::Subscript, seq(vec![t], [slice])) }
            / slice:slice_tail() { node(Symbol::Subscript, slice) }

        rule slice_tail() -> Vec<Element>
            = c:op(TokKind::Colon) upper:test()? step:sliceop()? {
                seq(vec![c], [upper.map(|u| vec![u]), step.map(|s| vec![s])])
            }

        // sliceop: ':' [test]
        rule sliceop() -> Element
            = c:op(TokKind::Colon) t:test()? { node(Symbol::Sliceop, seq(vec![c], [t.map(|t| vec![t])])) }

        // dictorsetmaker: ( ((test ':' test | '**' expr)
        //                    (comp_for | (',' (test ':' test | '**' expr))* [','])) |
        //                   ((test | star_expr)
        //                    (comp_for | (',' (test | star_expr))* [','])) )
        rule dictorsetmaker() -> Element
            = d:op(TokKind::DoubleStar) e:expr() tail:dict_tail() {
                node(Symbol::Dictorsetmaker, seq(vec![d, e], [Some(tail)]))
            }
            / s:star_expr() tail:set_tail() { node(Symbol::Dictorsetmaker, seq(vec![s], [Some(tail)])) }
            / t:test() tail:after_first_test() { node(Symbol::Dictorsetmaker, seq(vec![t], [Some(tail)])) }

        rule after_first_test() -> Vec<Element>
            = c:op(TokKind::Colon) v:test() tail:dict_tail() { seq(vec![c, v], [Some(tail)]) }
            / set_tail()

        rule dict_tail() -> Vec<Element>
            = c:comp_for() { vec![c] }
            / rest:(c:comma() i:dict_item() { seq(vec![c], [Some(i)]) })* trailing:comma()? {
                let mut children: Vec<Element> = rest.into_iter().flatten().collect();
                children.extend(trailing);
                children
            }

        rule dict_item() -> Vec<Element>
            = d:op(TokKind::DoubleStar) e:expr() { vec![d, e] }
            / k:test() c:op(TokKind::Colon) v:test() { vec![k, c, v] }

        rule set_tail() -> Vec<Element>
            = c:comp_for() { vec![c] }
            / rest:(c:comma() t:test_or_star() { [c, t] })* trailing:comma()? {
                let mut children: Vec<Element> = rest.into_iter().flatten().collect();
                children.extend(trailing);
                children
            }

        // arglist: argument (',' argument)* [',']
        rule arglist() -> Element
            = first:argument() rest:(c:comma() a:argument() { [c, a] })* trailing:comma()? {
                node(Symbol::Arglist, list(first, rest, trailing))
            }

        // argument: ( test [comp_for] | test ':=' test | test '=' test
        //           | '**' test | '*' test )
        rule argument() -> Element
            = s:ops(UNPACK_OPS) t:test() { node(Symbol::Argument, vec![s, t]) }
            / t:test() tail:argument_tail()? { node(Symbol::Argument, seq(vec![t], [tail])) }

        rule argument_tail() -> Vec<Element>
            = b:ops(BINDING_OPS) v:test() { vec![b, v] }
            / c:comp_for() { vec![c] }

        // comp_iter: comp_for | comp_if
        // comp_if: 'if' or_test [comp_iter]
        rule comp_iter() -> Element
            = c:comp_for() { node(Symbol::CompIter, vec![c]) }
            / i:kw("if") t:or_test() next:comp_iter()? {
                let comp_if = node(Symbol::CompIf, seq(vec![i, t], [next.map(|n| vec![n])]));
                node(Symbol::CompIter, vec![comp_if])
            }

        // comp_for: ['async'] 'for' exprlist 'in' or_test [comp_iter]
        rule comp_for() -> Element
            = a:kw("async")? f:kw("for") t:exprlist() i:kw("in") s:or_test() next:comp_iter()? {
                let head: Vec<Element> = a.into_iter().chain([f, t, i, s]).collect();
                node(Symbol::CompFor, seq(head, [next.map(|n| vec![n])]))
            }

        // yield_expr: 'yield' [yield_arg]
        // yield_arg: 'from' test | testlist
        rule yield_expr() -> Element
            = k:kw("yield") arg:yield_arg()? { node(Symbol::YieldExpr, seq(vec![k], [arg.map(|a| vec![a])])) }

        rule yield_arg() -> Element
            = f:kw("from") t:test() { node(Symbol::YieldArg, vec![f, t]) }
            / t:testlist() { node(Symbol::YieldArg, vec![t]) }
    }
}
