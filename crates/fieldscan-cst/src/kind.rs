// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Grammar symbols and token kinds.
//!
//! Every node of the concrete syntax tree carries a [`Kind`]: interior nodes
//! are labelled with a grammar [`Symbol`] (`classdef`, `expr_stmt`, ...) and
//! leaves with a [`TokKind`] (`NAME`, `LPAR`, ...). Both families are
//! addressable by name from the selector language, using the lowercase
//! grammar names for symbols and the uppercase token names for tokens.

use std::fmt;

// ============================================================================
// Grammar symbols
// ============================================================================

macro_rules! symbols {
    ($($variant:ident => $name:literal,)*) => {
        /// A grammar production of the statement-block grammar.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Symbol {
            $($variant,)*
        }

        impl Symbol {
            /// All symbols, in grammar order.
            pub const ALL: &'static [Symbol] = &[$(Symbol::$variant,)*];

            /// The grammar name of this symbol (`expr_stmt`, `suite`, ...).
            pub fn name(self) -> &'static str {
                match self {
                    $(Symbol::$variant => $name,)*
                }
            }

            /// Look up a symbol by its grammar name.
            pub fn from_name(name: &str) -> Option<Symbol> {
                match name {
                    $($name => Some(Symbol::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

symbols! {
    FileInput => "file_input",
    Decorator => "decorator",
    Decorators => "decorators",
    Decorated => "decorated",
    AsyncStmt => "async_stmt",
    Funcdef => "funcdef",
    Parameters => "parameters",
    Typedargslist => "typedargslist",
    Tfpdef => "tfpdef",
    Varargslist => "varargslist",
    Vfpdef => "vfpdef",
    Stmt => "stmt",
    SimpleStmt => "simple_stmt",
    SmallStmt => "small_stmt",
    ExprStmt => "expr_stmt",
    Annassign => "annassign",
    Augassign => "augassign",
    DelStmt => "del_stmt",
    PassStmt => "pass_stmt",
    FlowStmt => "flow_stmt",
    BreakStmt => "break_stmt",
    ContinueStmt => "continue_stmt",
    ReturnStmt => "return_stmt",
    YieldStmt => "yield_stmt",
    RaiseStmt => "raise_stmt",
    ImportStmt => "import_stmt",
    ImportName => "import_name",
    ImportFrom => "import_from",
    ImportAsName => "import_as_name",
    DottedAsName => "dotted_as_name",
    ImportAsNames => "import_as_names",
    DottedAsNames => "dotted_as_names",
    DottedName => "dotted_name",
    GlobalStmt => "global_stmt",
    NonlocalStmt => "nonlocal_stmt",
    AssertStmt => "assert_stmt",
    CompoundStmt => "compound_stmt",
    IfStmt => "if_stmt",
    WhileStmt => "while_stmt",
    ForStmt => "for_stmt",
    TryStmt => "try_stmt",
    WithStmt => "with_stmt",
    WithItem => "with_item",
    ExceptClause => "except_clause",
    Suite => "suite",
    NamedexprTest => "namedexpr_test",
    Test => "test",
    Lambdef => "lambdef",
    OrTest => "or_test",
    AndTest => "and_test",
    NotTest => "not_test",
    Comparison => "comparison",
    CompOp => "comp_op",
    StarExpr => "star_expr",
    Expr => "expr",
    XorExpr => "xor_expr",
    AndExpr => "and_expr",
    ShiftExpr => "shift_expr",
    ArithExpr => "arith_expr",
    Term => "term",
    Factor => "factor",
    Power => "power",
    Atom => "atom",
    TestlistComp => "testlist_comp",
    Trailer => "trailer",
    Subscriptlist => "subscriptlist",
    Subscript => "subscript",
    Sliceop => "sliceop",
    Exprlist => "exprlist",
    Testlist => "testlist",
    Dictorsetmaker => "dictorsetmaker",
    Classdef => "classdef",
    Arglist => "arglist",
    Argument => "argument",
    CompIter => "comp_iter",
    CompFor => "comp_for",
    CompIf => "comp_if",
    YieldExpr => "yield_expr",
    YieldArg => "yield_arg",
}

// ============================================================================
// Token kinds
// ============================================================================

macro_rules! fixed_text {
    () => {
        None
    };
    ($text:literal) => {
        Some($text)
    };
}

macro_rules! token_kinds {
    ($($variant:ident => $name:literal $(: $text:literal)?,)*) => {
        /// The lexical class of a token.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokKind {
            $($variant,)*
        }

        impl TokKind {
            /// All token kinds.
            pub const ALL: &'static [TokKind] = &[$(TokKind::$variant,)*];

            /// The token module name of this kind (`NAME`, `LPAR`, ...).
            pub fn name(self) -> &'static str {
                match self {
                    $(TokKind::$variant => $name,)*
                }
            }

            /// Look up a token kind by its token module name.
            pub fn from_name(name: &str) -> Option<TokKind> {
                match name {
                    $($name => Some(TokKind::$variant),)*
                    _ => None,
                }
            }

            /// The fixed source text of operator and delimiter kinds.
            ///
            /// `None` for kinds whose text varies (`NAME`, `NUMBER`, `STRING`)
            /// and for layout kinds.
            pub fn fixed_text(self) -> Option<&'static str> {
                match self {
                    $(TokKind::$variant => fixed_text!($($text)?),)*
                }
            }
        }
    };
}

token_kinds! {
    EndMarker => "ENDMARKER",
    Name => "NAME",
    Number => "NUMBER",
    String => "STRING",
    Newline => "NEWLINE",
    Indent => "INDENT",
    Dedent => "DEDENT",
    Lpar => "LPAR": "(",
    Rpar => "RPAR": ")",
    Lsqb => "LSQB": "[",
    Rsqb => "RSQB": "]",
    Colon => "COLON": ":",
    Comma => "COMMA": ",",
    Semi => "SEMI": ";",
    Plus => "PLUS": "+",
    Minus => "MINUS": "-",
    Star => "STAR": "*",
    Slash => "SLASH": "/",
    Vbar => "VBAR": "|",
    Amper => "AMPER": "&",
    Less => "LESS": "<",
    Greater => "GREATER": ">",
    Equal => "EQUAL": "=",
    Dot => "DOT": ".",
    Percent => "PERCENT": "%",
    Lbrace => "LBRACE": "{",
    Rbrace => "RBRACE": "}",
    EqEqual => "EQEQUAL": "==",
    NotEqual => "NOTEQUAL": "!=",
    LessEqual => "LESSEQUAL": "<=",
    GreaterEqual => "GREATEREQUAL": ">=",
    Tilde => "TILDE": "~",
    Circumflex => "CIRCUMFLEX": "^",
    LeftShift => "LEFTSHIFT": "<<",
    RightShift => "RIGHTSHIFT": ">>",
    DoubleStar => "DOUBLESTAR": "**",
    PlusEqual => "PLUSEQUAL": "+=",
    MinEqual => "MINEQUAL": "-=",
    StarEqual => "STAREQUAL": "*=",
    SlashEqual => "SLASHEQUAL": "/=",
    PercentEqual => "PERCENTEQUAL": "%=",
    AmperEqual => "AMPEREQUAL": "&=",
    VbarEqual => "VBAREQUAL": "|=",
    CircumflexEqual => "CIRCUMFLEXEQUAL": "^=",
    LeftShiftEqual => "LEFTSHIFTEQUAL": "<<=",
    RightShiftEqual => "RIGHTSHIFTEQUAL": ">>=",
    DoubleStarEqual => "DOUBLESTAREQUAL": "**=",
    DoubleSlash => "DOUBLESLASH": "//",
    DoubleSlashEqual => "DOUBLESLASHEQUAL": "//=",
    At => "AT": "@",
    AtEqual => "ATEQUAL": "@=",
    RArrow => "RARROW": "->",
    Ellipsis => "ELLIPSIS": "...",
    ColonEqual => "COLONEQUAL": ":=",
}

impl TokKind {
    /// Layout tokens carry structure only and never appear in a flattened stream.
    pub fn is_layout(self) -> bool {
        matches!(
            self,
            TokKind::Newline | TokKind::Indent | TokKind::Dedent | TokKind::EndMarker
        )
    }

    /// Resolve operator text (`"**="`, `"("`, ...) to its kind.
    pub fn from_operator(text: &str) -> Option<TokKind> {
        TokKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.fixed_text() == Some(text))
    }

    /// True for the augmented assignment operators (`+=`, `//=`, ...).
    pub fn is_augassign(self) -> bool {
        matches!(
            self,
            TokKind::PlusEqual
                | TokKind::MinEqual
                | TokKind::StarEqual
                | TokKind::SlashEqual
                | TokKind::PercentEqual
                | TokKind::AmperEqual
                | TokKind::VbarEqual
                | TokKind::CircumflexEqual
                | TokKind::LeftShiftEqual
                | TokKind::RightShiftEqual
                | TokKind::DoubleStarEqual
                | TokKind::DoubleSlashEqual
                | TokKind::AtEqual
        )
    }
}

// ============================================================================
// Keywords
// ============================================================================

/// Reserved words of the grammar.
pub const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Returns true if `word` is a reserved word.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Returns true for the keyword constants `True`, `False` and `None`.
pub fn is_constant(word: &str) -> bool {
    matches!(word, "True" | "False" | "None")
}

// ============================================================================
// Kind
// ============================================================================

/// The label of a tree element: a grammar symbol or a token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Symbol(Symbol),
    Token(TokKind),
}

impl Kind {
    /// The selector-facing name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Symbol(symbol) => symbol.name(),
            Kind::Token(kind) => kind.name(),
        }
    }

    /// Resolve a selector name to a kind. Symbols take precedence.
    pub fn from_name(name: &str) -> Option<Kind> {
        Symbol::from_name(name)
            .map(Kind::Symbol)
            .or_else(|| TokKind::from_name(name).map(Kind::Token))
    }
}

impl From<Symbol> for Kind {
    fn from(symbol: Symbol) -> Self {
        Kind::Symbol(symbol)
    }
}

impl From<TokKind> for Kind {
    fn from(kind: TokKind) -> Self {
        Kind::Token(kind)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_names_round_trip() {
        for symbol in Symbol::ALL {
            assert_eq!(Symbol::from_name(symbol.name()), Some(*symbol));
        }
    }

    #[test]
    fn operator_lookup() {
        assert_eq!(TokKind::from_operator("**="), Some(TokKind::DoubleStarEqual));
        assert_eq!(TokKind::from_operator("("), Some(TokKind::Lpar));
        assert_eq!(TokKind::from_operator("$"), None);
        assert_eq!(TokKind::Name.fixed_text(), None);
    }

    #[test]
    fn kind_from_name_covers_both_families() {
        assert_eq!(Kind::from_name("classdef"), Some(Kind::Symbol(Symbol::Classdef)));
        assert_eq!(Kind::from_name("NAME"), Some(Kind::Token(TokKind::Name)));
        assert_eq!(Kind::from_name("klass"), None);
    }

    #[test]
    fn keyword_classes() {
        assert!(is_keyword("lambda"));
        assert!(is_keyword("None"));
        assert!(is_constant("None"));
        assert!(!is_constant("lambda"));
        assert!(!is_keyword("match"));
    }
}
