// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Field map assembly for a model class.
//!
//! Each runtime field descriptor is resolved from the first source that
//! describes it:
//!
//! 1. a declaration in the class body
//! 2. the descriptor's `(path, args, kwargs)` hook
//! 3. the descriptor's deprecated single-string hook
//! 4. the field maps of the model's bases
//! 5. the parent-link convention for `*_ptr` relations
//! 6. the implicit primary key convention
//!
//! A descriptor nothing describes is kept in the map as `None`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use indexmap::IndexMap;
use tracing::{debug, warn};

use fieldscan_cst::{NodeRef, Selector, SyntaxTree};

use crate::alias::{rewrite_aliases, AliasMap, AliasResolver};
use crate::config::ScanConfig;
use crate::defaults::DefaultResolver;
use crate::error::{ScanError, ScanResult};
use crate::eval::Overlay;
use crate::extract::extract_field;
use crate::model::{FieldDescriptor, ModelClass};
use crate::namespace::{load_module_namespace, Namespace};
use crate::registry::ModelRegistry;
use crate::source::{classdef_of, locate_class, normalize_source, SourceProvider};
use crate::types::{FieldDefinition, FieldEntry, FieldMap};

/// Statements directly in the body of a located class.
static CLASS_FIELDS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::compile("^ > classdef > suite > stmt > simple_stmt > small_stmt > expr_stmt")
        .expect("class field selector is valid")
});

/// Recovers field definitions of model classes from their source.
///
/// Module namespaces and alias maps are computed once per inspector and
/// reused across classes, so one inspector should serve a whole run.
pub struct FieldInspector<'a> {
    sources: &'a dyn SourceProvider,
    aliases: AliasResolver<'a>,
    config: ScanConfig,
    defaults: DefaultResolver,
    module_namespaces: RefCell<HashMap<String, Rc<Namespace>>>,
    alias_maps: RefCell<HashMap<String, Rc<AliasMap>>>,
}

impl<'a> FieldInspector<'a> {
    pub fn new(sources: &'a dyn SourceProvider, registry: &'a dyn ModelRegistry) -> Self {
        Self::with_config(sources, registry, ScanConfig::default())
    }

    pub fn with_config(
        sources: &'a dyn SourceProvider,
        registry: &'a dyn ModelRegistry,
        config: ScanConfig,
    ) -> Self {
        let defaults = DefaultResolver::new(&config.time_varying_defaults);
        Self {
            sources,
            aliases: AliasResolver::new(sources, registry),
            config,
            defaults,
            module_namespaces: RefCell::new(HashMap::new()),
            alias_maps: RefCell::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Field name → definition for every field descriptor of `model`.
    ///
    /// Returns `Ok(None)` when the class source is unavailable or does not
    /// contain the class.
    pub fn get_model_fields(&self, model: &ModelClass) -> ScanResult<Option<FieldMap>> {
        self.scan(model, 0)
    }

    fn scan(&self, model: &ModelClass, depth: usize) -> ScanResult<Option<FieldMap>> {
        if depth > self.config.max_inheritance_depth {
            return Err(ScanError::InheritanceTooDeep {
                model: model.qualified_name(),
                limit: self.config.max_inheritance_depth,
            });
        }

        let Some(source) = self.sources.class_source(model) else {
            debug!("no source available for {}", model.qualified_name());
            return Ok(None);
        };
        let tree = SyntaxTree::parse(&normalize_source(&source)).map_err(|source| {
            ScanError::SyntaxUnparseable {
                model: model.qualified_name(),
                source,
            }
        })?;
        let Some(class_stmt) = locate_class(&tree, &model.name)? else {
            debug!("class {} not found in its source", model.qualified_name());
            return Ok(None);
        };

        let local = local_fields(class_stmt);
        let inherited = self.inherited_fields(model, depth)?;

        let mut descriptors: Vec<&FieldDescriptor> = model.fields.iter().collect();
        if self.config.include_many_to_many {
            descriptors.extend(&model.many_to_many);
        }

        let mut fields = FieldMap::new();
        for descriptor in descriptors {
            let entry = self.resolve(model, descriptor, &local, &inherited);
            fields.insert(descriptor.name.clone(), entry);
        }
        self.post_process(model, class_stmt, &mut fields);
        Ok(Some(fields))
    }

    /// Base field maps merged in declaration order; later bases win.
    fn inherited_fields(&self, model: &ModelClass, depth: usize) -> ScanResult<FieldMap> {
        let mut inherited = FieldMap::new();
        for base in &model.bases {
            match self.scan(base, depth + 1)? {
                Some(fields) => inherited.extend(fields),
                None => debug!(
                    "base {} of {} contributes no fields",
                    base.qualified_name(),
                    model.qualified_name()
                ),
            }
        }
        Ok(inherited)
    }

    fn resolve(
        &self,
        model: &ModelClass,
        descriptor: &FieldDescriptor,
        local: &IndexMap<String, FieldDefinition>,
        inherited: &FieldMap,
    ) -> Option<FieldEntry> {
        let name = &descriptor.name;
        if let Some(def) = local.get(name) {
            return Some(def.clone().into());
        }
        if let Some(triple) = &descriptor.triple_hook {
            return Some(FieldDefinition::from_triple(name, triple).into());
        }
        if let Some(definition) = &descriptor.definition_hook {
            warn!(
                "field {name} of {} uses the deprecated single-string definition hook; \
                 provide a (path, args, kwargs) triple instead",
                model.qualified_name()
            );
            return Some(FieldEntry::Legacy(definition.clone()));
        }
        if let Some(entry) = inherited.get(name) {
            return entry.clone();
        }
        if let Some(related) = descriptor.related.as_ref().filter(|_| name.ends_with("_ptr")) {
            return Some(
                FieldDefinition::new(name, "models.OneToOneField")
                    .with_positional(related.orm_reference())
                    .into(),
            );
        }
        if *name == self.config.primary_key_name {
            return Some(
                FieldDefinition::new(name, "models.AutoField")
                    .with_keyword("primary_key", "True")
                    .into(),
            );
        }
        warn!(
            "field {name} of {} could not be resolved and needs manual input",
            model.qualified_name()
        );
        None
    }

    /// Rewrite aliases and resolve defaults in every constructor entry.
    fn post_process(&self, model: &ModelClass, class_stmt: NodeRef<'_>, fields: &mut FieldMap) {
        let aliases = self.alias_map(&model.app_label);
        let module_ns = self.module_namespace(&model.module);
        let class_ns = classdef_of(class_stmt)
            .map(|classdef| Namespace::from_class(classdef, &module_ns, &model.qualified_name()))
            .unwrap_or_default();
        let scope = Overlay::new(&class_ns, &*module_ns);

        for entry in fields.values_mut() {
            if let Some(FieldEntry::Constructor(def)) = entry {
                rewrite_aliases(def, &aliases, self.config.rewrite_keyword_aliases);
                self.defaults.resolve(def, &scope);
            }
        }
    }

    fn module_namespace(&self, module: &str) -> Rc<Namespace> {
        if let Some(ns) = self.module_namespaces.borrow().get(module) {
            return Rc::clone(ns);
        }
        let ns = Rc::new(load_module_namespace(self.sources, module).unwrap_or_default());
        self.module_namespaces
            .borrow_mut()
            .insert(module.to_string(), Rc::clone(&ns));
        ns
    }

    fn alias_map(&self, app_label: &str) -> Rc<AliasMap> {
        if let Some(map) = self.alias_maps.borrow().get(app_label) {
            return Rc::clone(map);
        }
        let map = Rc::new(self.aliases.aliases(app_label));
        self.alias_maps
            .borrow_mut()
            .insert(app_label.to_string(), Rc::clone(&map));
        map
    }
}

/// Field declarations directly in the class body; the last one for a name
/// wins.
fn local_fields(class_stmt: NodeRef<'_>) -> IndexMap<String, FieldDefinition> {
    let mut local = IndexMap::new();
    for stmt in class_stmt.select(&CLASS_FIELDS) {
        if let Some(def) = extract_field(stmt) {
            local.insert(def.name.clone(), def);
        }
    }
    local
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use crate::source::MemorySources;
    use crate::types::{ArgValue, FieldTriple};
    use std::sync::Arc;
    use tracing_test::traced_test;

    const SHOP: &str = r#"
import datetime
from django.db import models

DEFAULT_NAME = 'unknown'

class Base(models.Model):
    created = models.DateTimeField(default=datetime.datetime.now)
    status = models.CharField(max_length=8, default='new')

    class Meta:
        abstract = True

class Product(Base):
    SIZES = (('s', 'Small'), ('l', 'Large'))
    name = models.CharField(max_length=32, default=DEFAULT_NAME)
    name = models.CharField(max_length=64, default=DEFAULT_NAME)
    size = models.CharField(max_length=1, choices=SIZES, default=SIZES[0][0])
    status = models.CharField(max_length=8, default='active')

Item = Product
"#;

    fn sources() -> MemorySources {
        MemorySources::new().with_module("shop.models", SHOP)
    }

    fn registry() -> MemoryRegistry {
        let mut registry = MemoryRegistry::new();
        registry.register_app("shop", "shop.models");
        registry.register_model("shop.models.Base");
        registry.register_model("shop.models.Product");
        registry
    }

    fn base() -> Arc<ModelClass> {
        Arc::new(
            ModelClass::new("Base", "shop.models", "shop")
                .with_field(FieldDescriptor::new("created"))
                .with_field(FieldDescriptor::new("status")),
        )
    }

    fn product() -> ModelClass {
        ModelClass::new("Product", "shop.models", "shop")
            .with_base(base())
            .with_field(FieldDescriptor::new("id"))
            .with_field(FieldDescriptor::new("created"))
            .with_field(FieldDescriptor::new("status"))
            .with_field(FieldDescriptor::new("name"))
            .with_field(FieldDescriptor::new("size"))
    }

    fn constructor(fields: &FieldMap, name: &str) -> FieldDefinition {
        fields[name]
            .as_ref()
            .and_then(FieldEntry::as_constructor)
            .cloned()
            .unwrap_or_else(|| panic!("{name} should be a constructor entry"))
    }

    #[test]
    fn resolves_local_inherited_and_conventional_fields() {
        let sources = sources();
        let registry = registry();
        let inspector = FieldInspector::new(&sources, &registry);
        let fields = inspector.get_model_fields(&product()).unwrap().unwrap();

        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["id", "created", "status", "name", "size"]
        );

        let id = constructor(&fields, "id");
        assert_eq!(id.constructor_path, "models.AutoField");
        assert_eq!(id.keyword("primary_key"), Some("True"));

        let created = constructor(&fields, "created");
        assert_eq!(
            created.keyword_args.get("default"),
            Some(&ArgValue::Symbolic("datetime.datetime.now".into()))
        );

        // Local declaration shadows the base's.
        assert_eq!(constructor(&fields, "status").keyword("default"), Some("'active'"));

        // Last declaration wins; module constant is folded.
        let name = constructor(&fields, "name");
        assert_eq!(name.keyword("max_length"), Some("64"));
        assert_eq!(
            name.keyword_args.get("default"),
            Some(&ArgValue::Literal("'unknown'".into()))
        );

        // Subscripts are not evaluated.
        let size = constructor(&fields, "size");
        assert_eq!(size.keyword("choices"), Some("SIZES"));
        assert_eq!(
            size.keyword_args.get("default"),
            Some(&ArgValue::Source("SIZES[0][0]".into()))
        );
    }

    #[test]
    fn hooks_and_pointer_convention() {
        let sources = MemorySources::new().with_module(
            "shop.models",
            "class Special(Product):\n    pass\n",
        );
        let registry = registry();
        let model = ModelClass::new("Special", "shop.models", "shop")
            .with_field(
                FieldDescriptor::new("product_ptr").related_to("shop", "Product"),
            )
            .with_field(
                FieldDescriptor::new("color")
                    .with_triple(FieldTriple::new("colors.ColorField").kwarg("default", "'red'")),
            );
        let fields = FieldInspector::new(&sources, &registry)
            .get_model_fields(&model)
            .unwrap()
            .unwrap();

        let ptr = constructor(&fields, "product_ptr");
        assert_eq!(ptr.constructor_path, "models.OneToOneField");
        assert_eq!(ptr.positional_args, vec!["orm['shop.Product']"]);

        let color = constructor(&fields, "color");
        assert_eq!(color.constructor_path, "colors.ColorField");
        assert_eq!(
            color.keyword_args.get("default"),
            Some(&ArgValue::Literal("'red'".into()))
        );
    }

    #[test]
    #[traced_test]
    fn legacy_hook_is_used_with_a_warning() {
        let sources =
            MemorySources::new().with_module("shop.models", "class Legacy:\n    pass\n");
        let registry = registry();
        let model = ModelClass::new("Legacy", "shop.models", "shop")
            .with_field(FieldDescriptor::new("blob").with_definition("models.TextField()"));
        let fields = FieldInspector::new(&sources, &registry)
            .get_model_fields(&model)
            .unwrap()
            .unwrap();

        assert_eq!(
            fields["blob"],
            Some(FieldEntry::Legacy("models.TextField()".into()))
        );
        assert!(logs_contain("deprecated single-string definition hook"));
    }

    #[test]
    #[traced_test]
    fn unresolvable_fields_are_kept_as_none() {
        let sources =
            MemorySources::new().with_module("shop.models", "class Ghost:\n    pass\n");
        let registry = registry();
        let model = ModelClass::new("Ghost", "shop.models", "shop")
            .with_field(FieldDescriptor::new("mystery"));
        let fields = FieldInspector::new(&sources, &registry)
            .get_model_fields(&model)
            .unwrap()
            .unwrap();

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["mystery"], None);
        assert!(logs_contain("needs manual input"));
    }

    #[test]
    fn inherited_none_is_not_overridden_by_conventions() {
        let sources = MemorySources::new().with_module(
            "shop.models",
            "class Parent:\n    pass\n\nclass Child(Parent):\n    pass\n",
        );
        let registry = registry();
        let parent = Arc::new(
            ModelClass::new("Parent", "shop.models", "shop").with_field(FieldDescriptor::new("id")),
        );
        let child = ModelClass::new("Child", "shop.models", "shop")
            .with_base(parent)
            .with_field(FieldDescriptor::new("id"));
        let config = ScanConfig {
            primary_key_name: "pk".into(),
            ..ScanConfig::default()
        };
        let fields = FieldInspector::with_config(&sources, &registry, config)
            .get_model_fields(&child)
            .unwrap()
            .unwrap();
        assert_eq!(fields["id"], None);
    }

    #[test]
    fn aliases_are_rewritten() {
        let source = format!(
            "{SHOP}\nclass Order(models.Model):\n    item = models.ForeignKey(Item, related_name='orders')\n"
        );
        let sources = MemorySources::new().with_module("shop.models", source);
        let registry = registry();
        let model = ModelClass::new("Order", "shop.models", "shop")
            .with_field(FieldDescriptor::new("item"));
        let fields = FieldInspector::new(&sources, &registry)
            .get_model_fields(&model)
            .unwrap()
            .unwrap();
        assert_eq!(constructor(&fields, "item").positional_args, vec!["Product"]);
    }

    #[test]
    fn missing_source_and_missing_class_yield_none() {
        let registry = registry();
        let empty = MemorySources::new();
        assert!(FieldInspector::new(&empty, &registry)
            .get_model_fields(&product())
            .unwrap()
            .is_none());

        let other = MemorySources::new().with_module("shop.models", "class Other:\n    pass\n");
        assert!(FieldInspector::new(&other, &registry)
            .get_model_fields(&product())
            .unwrap()
            .is_none());
    }

    #[test]
    fn unparseable_source_is_an_error() {
        let registry = registry();
        let broken = MemorySources::new().with_module("shop.models", "class Product(:\n");
        let err = FieldInspector::new(&broken, &registry)
            .get_model_fields(&product())
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::SyntaxUnparseable { ref model, .. } if model == "shop.models.Product"
        ));
    }

    fn child_of_external_base() -> ModelClass {
        let base = Arc::new(
            ModelClass::new("Base", "core.models", "core")
                .with_field(FieldDescriptor::new("created"))
                .with_field(FieldDescriptor::new("status")),
        );
        ModelClass::new("Product", "shop.models", "shop")
            .with_base(base)
            .with_field(FieldDescriptor::new("id"))
            .with_field(FieldDescriptor::new("name"))
            .with_field(FieldDescriptor::new("created"))
            .with_field(
                FieldDescriptor::new("status")
                    .with_triple(FieldTriple::new("models.CharField").kwarg("max_length", "8")),
            )
    }

    const CHILD_ONLY: &str =
        "from core.models import Base\n\nclass Product(Base):\n    name = models.CharField(max_length=32)\n";

    #[test]
    #[traced_test]
    fn base_without_source_falls_through_to_hooks_and_conventions() {
        let sources = MemorySources::new().with_module("shop.models", CHILD_ONLY);
        let registry = registry();
        let fields = FieldInspector::new(&sources, &registry)
            .get_model_fields(&child_of_external_base())
            .unwrap()
            .unwrap();

        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["id", "name", "created", "status"]
        );
        assert_eq!(constructor(&fields, "name").keyword("max_length"), Some("32"));
        assert_eq!(constructor(&fields, "id").constructor_path, "models.AutoField");
        assert_eq!(constructor(&fields, "status").keyword("max_length"), Some("8"));
        assert_eq!(fields["created"], None);
        assert!(logs_contain("base core.models.Base of shop.models.Product contributes no fields"));
    }

    #[test]
    fn unparseable_base_source_is_an_error() {
        let sources = MemorySources::new()
            .with_module("shop.models", CHILD_ONLY)
            .with_module("core.models", "class Base(:\n    pass\n");
        let registry = registry();
        let err = FieldInspector::new(&sources, &registry)
            .get_model_fields(&child_of_external_base())
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::SyntaxUnparseable { ref model, .. } if model == "core.models.Base"
        ));
    }

    #[test]
    fn inheritance_depth_is_bounded() {
        let sources = MemorySources::new().with_module(
            "shop.models",
            "class A:\n    pass\nclass B(A):\n    pass\nclass C(B):\n    pass\n",
        );
        let registry = registry();
        let a = Arc::new(ModelClass::new("A", "shop.models", "shop"));
        let b = Arc::new(ModelClass::new("B", "shop.models", "shop").with_base(a));
        let c = ModelClass::new("C", "shop.models", "shop").with_base(b);

        let config = ScanConfig {
            max_inheritance_depth: 1,
            ..ScanConfig::default()
        };
        let err = FieldInspector::with_config(&sources, &registry, config)
            .get_model_fields(&c)
            .unwrap_err();
        assert!(matches!(err, ScanError::InheritanceTooDeep { limit: 1, .. }));

        let fields = FieldInspector::new(&sources, &registry).get_model_fields(&c).unwrap();
        assert!(fields.is_some_and(|f| f.is_empty()));
    }

    #[test]
    fn many_to_many_fields_are_opt_in() {
        let sources = MemorySources::new().with_module(
            "shop.models",
            "class Tagged:\n    tags = models.ManyToManyField('Tag')\n",
        );
        let registry = registry();
        let model = ModelClass::new("Tagged", "shop.models", "shop")
            .with_many_to_many(FieldDescriptor::new("tags"));

        let without = FieldInspector::new(&sources, &registry)
            .get_model_fields(&model)
            .unwrap()
            .unwrap();
        assert!(without.is_empty());

        let config = ScanConfig {
            include_many_to_many: true,
            ..ScanConfig::default()
        };
        let with = FieldInspector::with_config(&sources, &registry, config)
            .get_model_fields(&model)
            .unwrap()
            .unwrap();
        assert_eq!(constructor(&with, "tags").positional_args, vec!["'Tag'"]);
    }
}
