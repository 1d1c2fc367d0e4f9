// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Field definitions as handed to the migration writer.

use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

// ============================================================================
// ArgValue
// ============================================================================

/// One argument of a field constructor call.
///
/// All variants render as text. The variant records how the text was
/// obtained so that later passes know what they may still rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    /// Unevaluated source expression, as rendered from the tree.
    Source(String),
    /// Re-parseable representation of an evaluated literal.
    Literal(String),
    /// Dotted path of a callable to be called when the migration runs.
    Symbolic(String),
}

impl ArgValue {
    pub fn as_str(&self) -> &str {
        match self {
            ArgValue::Source(text) | ArgValue::Literal(text) | ArgValue::Symbolic(text) => text,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ArgValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// FieldDefinition
// ============================================================================

/// A field constructor call: `name = constructor_path(*positional, **keyword)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub constructor_path: String,
    pub positional_args: Vec<String>,
    pub keyword_args: IndexMap<String, ArgValue>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, constructor_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructor_path: constructor_path.into(),
            positional_args: Vec::new(),
            keyword_args: IndexMap::new(),
        }
    }

    pub fn with_positional(mut self, arg: impl Into<String>) -> Self {
        self.positional_args.push(arg.into());
        self
    }

    /// Add a keyword argument holding unevaluated source text.
    pub fn with_keyword(mut self, keyword: impl Into<String>, source: impl Into<String>) -> Self {
        self.keyword_args
            .insert(keyword.into(), ArgValue::Source(source.into()));
        self
    }

    /// Build a definition from a descriptor's triple hook.
    pub fn from_triple(name: impl Into<String>, triple: &FieldTriple) -> Self {
        Self {
            name: name.into(),
            constructor_path: triple.constructor_path.clone(),
            positional_args: triple.args.clone(),
            keyword_args: triple
                .kwargs
                .iter()
                .map(|(k, v)| (k.clone(), ArgValue::Source(v.clone())))
                .collect(),
        }
    }

    /// Rendered keyword argument text, if present.
    pub fn keyword(&self, keyword: &str) -> Option<&str> {
        self.keyword_args.get(keyword).map(ArgValue::as_str)
    }
}

/// Serializes as the `(path, args, kwargs)` triple the migration writer expects.
impl Serialize for FieldDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (
            &self.constructor_path,
            &self.positional_args,
            &self.keyword_args,
        )
            .serialize(serializer)
    }
}

/// The value of a field descriptor's triple hook.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldTriple {
    pub constructor_path: String,
    pub args: Vec<String>,
    pub kwargs: IndexMap<String, String>,
}

impl FieldTriple {
    pub fn new(constructor_path: impl Into<String>) -> Self {
        Self {
            constructor_path: constructor_path.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn kwarg(mut self, keyword: impl Into<String>, value: impl Into<String>) -> Self {
        self.kwargs.insert(keyword.into(), value.into());
        self
    }
}

// ============================================================================
// FieldEntry / FieldMap
// ============================================================================

/// A resolved field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Constructor(FieldDefinition),
    /// The text returned by the deprecated single-string definition hook.
    Legacy(String),
}

impl FieldEntry {
    pub fn as_constructor(&self) -> Option<&FieldDefinition> {
        match self {
            FieldEntry::Constructor(def) => Some(def),
            FieldEntry::Legacy(_) => None,
        }
    }
}

impl From<FieldDefinition> for FieldEntry {
    fn from(def: FieldDefinition) -> Self {
        FieldEntry::Constructor(def)
    }
}

/// Field name to resolved entry, in declaration order. `None` marks a field
/// that no source could describe.
pub type FieldMap = IndexMap<String, Option<FieldEntry>>;
