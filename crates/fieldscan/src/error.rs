// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Error types for field scanning.
//!
//! ## Propagation
//!
//! Only two conditions abort a scan: a class source that does not parse and
//! an inheritance chain deeper than configured. Everything else degrades
//! locally:
//!
//! - missing class source: `Ok(None)` from the assembler
//! - statements that are not field declarations: skipped
//! - defaults that do not evaluate: source text kept
//! - registry lookups that fail: empty alias map

use std::path::PathBuf;

use fieldscan_cst::{ParserError, SelectorError};
use thiserror::Error;

/// Errors that abort a field scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The class source was retrieved but is not a valid statement block.
    #[error("source of model '{model}' could not be parsed: {source}")]
    SyntaxUnparseable {
        model: String,
        #[source]
        source: ParserError,
    },

    /// Base class recursion went past `ScanConfig::max_inheritance_depth`.
    #[error("inheritance chain of model '{model}' is deeper than {limit} levels")]
    InheritanceTooDeep { model: String, limit: usize },

    /// A selector used by the scanner failed to compile.
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Errors splitting a field call's argument list.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error(transparent)]
    Syntax(#[from] ParserError),

    /// `*iterable` stands for an unknown number of positional arguments.
    #[error("unpacked argument `{0}`")]
    Unpacked(String),
}

/// Errors reported by a [`ModelRegistry`](crate::registry::ModelRegistry).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no application with label '{0}'")]
    UnknownApp(String),

    #[error("application '{0}' has no models module")]
    NoModelsModule(String),
}

/// Errors loading a [`ScanConfig`](crate::config::ScanConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
