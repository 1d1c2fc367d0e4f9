// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Detection of model classes bound under a second name.
//!
//! A models module may write `Bar = Foo` (or `from .other import Foo as Bar`)
//! and then declare `models.ForeignKey(Bar)`. The migration must name the
//! class by its intrinsic name, so such aliases are collected from the
//! module's bindings and rewritten in field arguments.

use indexmap::IndexMap;
use tracing::debug;

use crate::namespace::{load_module_namespace, Namespace};
use crate::registry::ModelRegistry;
use crate::source::SourceProvider;
use crate::types::{ArgValue, FieldDefinition};
use crate::value::Value;

/// Alias name → intrinsic class name.
pub type AliasMap = IndexMap<String, String>;

/// Collect aliases from already-built module bindings.
///
/// A binding is an alias when it refers to a registered model and its name
/// differs from the class's own name.
pub fn aliases_in(ns: &Namespace, registry: &dyn ModelRegistry) -> AliasMap {
    ns.iter()
        .filter_map(|(name, value)| match value {
            Value::Reference(path) if registry.is_model(path) => {
                let intrinsic = last_segment(path);
                (intrinsic != name).then(|| (name.to_string(), intrinsic.to_string()))
            }
            _ => None,
        })
        .collect()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Replace alias names used as whole arguments by intrinsic names.
///
/// Positional arguments are always rewritten; keyword values only when
/// `rewrite_keywords` is set and they are still unevaluated source.
pub fn rewrite_aliases(def: &mut FieldDefinition, aliases: &AliasMap, rewrite_keywords: bool) {
    if aliases.is_empty() {
        return;
    }
    for arg in &mut def.positional_args {
        if let Some(intrinsic) = aliases.get(arg.as_str()) {
            *arg = intrinsic.clone();
        }
    }
    if !rewrite_keywords {
        return;
    }
    for value in def.keyword_args.values_mut() {
        if let ArgValue::Source(text) = value {
            if let Some(intrinsic) = aliases.get(text.as_str()) {
                *text = intrinsic.clone();
            }
        }
    }
}

/// Looks up aliases for an application's models module.
pub struct AliasResolver<'a> {
    sources: &'a dyn SourceProvider,
    registry: &'a dyn ModelRegistry,
}

impl<'a> AliasResolver<'a> {
    pub fn new(sources: &'a dyn SourceProvider, registry: &'a dyn ModelRegistry) -> Self {
        Self { sources, registry }
    }

    /// Aliases declared in the models module of `app_label`.
    ///
    /// Any failure along the way yields an empty map.
    pub fn aliases(&self, app_label: &str) -> AliasMap {
        let module = match self.registry.models_module(app_label) {
            Ok(module) => module,
            Err(e) => {
                debug!("no aliases for {app_label}: {e}");
                return AliasMap::new();
            }
        };
        match load_module_namespace(self.sources, &module) {
            Some(ns) => aliases_in(&ns, self.registry),
            None => AliasMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use crate::source::MemorySources;

    const MODELS: &str = "\
from django.db import models
from catalog.models import Product as Item

class Foo(models.Model):
    pass
";

    fn registry() -> MemoryRegistry {
        let mut registry = MemoryRegistry::new();
        registry.register_app("shop", "shop.models");
        registry.register_model("shop.models.Foo");
        registry.register_model("catalog.models.Product");
        registry
    }

    #[test]
    fn no_renamed_models_means_no_aliases() {
        let sources = MemorySources::new().with_module(
            "shop.models",
            "from django.db import models\n\nclass Foo(models.Model):\n    pass\n",
        );
        let registry = registry();
        assert!(AliasResolver::new(&sources, &registry).aliases("shop").is_empty());
    }

    #[test]
    fn assignment_alias_is_detected() {
        let sources =
            MemorySources::new().with_module("shop.models", format!("{MODELS}\nBar = Foo\n"));
        let registry = registry();
        let aliases = AliasResolver::new(&sources, &registry).aliases("shop");
        assert_eq!(
            aliases,
            AliasMap::from([
                ("Item".to_string(), "Product".to_string()),
                ("Bar".to_string(), "Foo".to_string()),
            ])
        );
    }

    #[test]
    fn lookup_failures_yield_empty_maps() {
        let registry = registry();
        let empty = MemorySources::new();
        assert!(AliasResolver::new(&empty, &registry).aliases("shop").is_empty());
        assert!(AliasResolver::new(&empty, &registry).aliases("unknown").is_empty());

        let broken = MemorySources::new().with_module("shop.models", "class (:\n");
        assert!(AliasResolver::new(&broken, &registry).aliases("shop").is_empty());
    }

    #[test]
    fn rewriting_replaces_whole_arguments_only() {
        let aliases = AliasMap::from([("Bar".to_string(), "Foo".to_string())]);
        let mut def = FieldDefinition::new("link", "models.ForeignKey")
            .with_positional("Bar")
            .with_positional("'Bar'")
            .with_keyword("to", "Bar")
            .with_keyword("related_name", "Bars");
        rewrite_aliases(&mut def, &aliases, true);
        assert_eq!(def.positional_args, vec!["Foo", "'Bar'"]);
        assert_eq!(def.keyword("to"), Some("Foo"));
        assert_eq!(def.keyword("related_name"), Some("Bars"));

        let mut def = FieldDefinition::new("link", "models.ForeignKey").with_keyword("to", "Bar");
        rewrite_aliases(&mut def, &aliases, false);
        assert_eq!(def.keyword("to"), Some("Bar"));
    }
}
