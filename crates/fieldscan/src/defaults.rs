// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Resolution of `default=` keyword arguments.
//!
//! A default that evaluates to a literal is replaced by its `repr`, so the
//! migration carries the value rather than an expression that may not
//! resolve where the migration runs. A default naming a known time-varying
//! callable becomes a symbolic reference that the migration calls when it
//! runs. Everything else keeps its source text.

use std::collections::HashSet;

use tracing::trace;

use crate::eval::{evaluate_source, Scope};
use crate::types::{ArgValue, FieldDefinition};
use crate::value::{python_repr, Value};

/// Callables whose result depends on when they are called.
pub const TIME_VARYING_DEFAULTS: &[&str] = &[
    "datetime.datetime.now",
    "datetime.datetime.utcnow",
    "datetime.datetime.today",
    "datetime.date.today",
    "django.utils.timezone.now",
];

#[derive(Debug, Clone)]
pub struct DefaultResolver {
    time_varying: HashSet<String>,
}

impl Default for DefaultResolver {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl DefaultResolver {
    /// A resolver knowing the built-in time-varying callables plus `extra`.
    pub fn new(extra: &[String]) -> Self {
        let time_varying = TIME_VARYING_DEFAULTS
            .iter()
            .map(|path| path.to_string())
            .chain(extra.iter().cloned())
            .collect();
        Self { time_varying }
    }

    pub fn is_time_varying(&self, path: &str) -> bool {
        self.time_varying.contains(path)
    }

    /// Resolve the `default` keyword of `def` in place.
    ///
    /// Only a default that is still unevaluated source is touched.
    pub fn resolve(&self, def: &mut FieldDefinition, scope: &dyn Scope) {
        let Some(ArgValue::Source(source)) = def.keyword_args.get("default") else {
            return;
        };
        let resolved = self.resolve_source(source, scope);
        if let Some(slot) = def.keyword_args.get_mut("default") {
            *slot = resolved;
        }
    }

    /// Resolve one default expression.
    pub fn resolve_source(&self, source: &str, scope: &dyn Scope) -> ArgValue {
        match evaluate_source(source, scope) {
            Ok(Value::Reference(path)) if self.is_time_varying(&path) => ArgValue::Symbolic(path),
            Ok(value) if value.contains_reference() => ArgValue::Source(source.to_string()),
            Ok(value) => ArgValue::Literal(python_repr(&value)),
            Err(e) => {
                trace!("keeping default `{source}` as written: {e}");
                ArgValue::Source(source.to_string())
            }
        }
    }
}
