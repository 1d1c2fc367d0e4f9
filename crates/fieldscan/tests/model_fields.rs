// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! End-to-end field recovery over realistic model modules.

use std::sync::Arc;

use fieldscan::{
    evaluate_source, extract_field, get_model_fields, AliasResolver, ArgValue, EmptyScope,
    FieldDefinition, FieldDescriptor, FieldEntry, FieldInspector, FieldMap, MemoryRegistry,
    MemorySources, ModelClass, ScanConfig, Value,
};
use fieldscan_cst::{render, SyntaxTree};
use serde_json::json;

const CATALOG: &str = r#"
import datetime
from django.db import models
from django.utils import timezone

STATUS_DRAFT = 'draft'
WEEK = 60 * 60 * 24 * 7


class Stamped(models.Model):
    created = models.DateTimeField(default=timezone.now)
    x = models.IntegerField(default=0)

    class Meta:
        abstract = True


class Article(Stamped):
    title = models.CharField(max_length=200)
    status = models.CharField(max_length=8, default=STATUS_DRAFT)
    ttl = models.IntegerField(default=WEEK)
    slug = models.SlugField(
        max_length=50,
        unique=True,
    )

    def __str__(self):
        return self.title


class Note(Stamped):
    pass


Story = Article


class Comment(models.Model):
    article = models.ForeignKey(Story, related_name='comments')
    body = models.TextField(default='unknown')
"#;

fn sources() -> MemorySources {
    MemorySources::new().with_module("news.models", CATALOG)
}

fn registry() -> MemoryRegistry {
    let mut registry = MemoryRegistry::new();
    registry.register_app("news", "news.models");
    for model in ["Stamped", "Article", "Note", "Comment"] {
        registry.register_model(format!("news.models.{model}"));
    }
    registry
}

fn stamped() -> Arc<ModelClass> {
    Arc::new(
        ModelClass::new("Stamped", "news.models", "news")
            .with_field(FieldDescriptor::new("created"))
            .with_field(FieldDescriptor::new("x")),
    )
}

fn model(name: &str, fields: &[&str]) -> ModelClass {
    fields.iter().fold(
        ModelClass::new(name, "news.models", "news").with_base(stamped()),
        |model, field| model.with_field(FieldDescriptor::new(*field)),
    )
}

fn definition<'m>(fields: &'m FieldMap, name: &str) -> &'m FieldDefinition {
    fields[name]
        .as_ref()
        .and_then(FieldEntry::as_constructor)
        .unwrap_or_else(|| panic!("{name} should resolve to a constructor"))
}

#[test]
fn direct_statement_is_extracted() {
    let tree = SyntaxTree::parse("class M:\n    field = Ctor(a, b, kw=val)\n").unwrap();
    let stmt = tree.find("expr_stmt").unwrap()[0];
    let def = extract_field(stmt).unwrap();

    assert_eq!(def.name, "field");
    assert_eq!(def.constructor_path, "Ctor");
    assert_eq!(def.positional_args, vec!["a", "b"]);
    assert_eq!(def.keyword("kw"), Some("val"));
}

#[test]
fn rendered_expression_reparses_and_evaluates() {
    let tree = SyntaxTree::parse("1+2\n").unwrap();
    let rendered = render(tree.root().flatten());
    assert_eq!(evaluate_source(&rendered, &EmptyScope).unwrap(), Value::Int(3));
}

#[test]
fn aliases_follow_module_bindings() {
    let registry = registry();
    let plain = MemorySources::new().with_module(
        "news.models",
        "from django.db import models\n\nclass Foo(models.Model):\n    pass\n",
    );
    assert!(AliasResolver::new(&plain, &registry).aliases("news").is_empty());

    let mut registry = registry;
    registry.register_model("news.models.Foo");
    let aliased = MemorySources::new().with_module(
        "news.models",
        "from django.db import models\n\nclass Foo(models.Model):\n    pass\n\nBar = Foo\n",
    );
    let aliases = AliasResolver::new(&aliased, &registry).aliases("news");
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases.get("Bar").map(String::as_str), Some("Foo"));
}

#[test]
fn inherited_field_and_primary_key() {
    let sources = sources();
    let registry = registry();
    let note = model("Note", &["id", "x"]);
    let fields = get_model_fields(&note, &sources, &registry).unwrap().unwrap();

    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["id", "x"]);
    assert_eq!(definition(&fields, "id").constructor_path, "models.AutoField");
    assert_eq!(definition(&fields, "id").keyword("primary_key"), Some("True"));
    assert_eq!(definition(&fields, "x").constructor_path, "models.IntegerField");
    assert_eq!(
        definition(&fields, "x").keyword_args.get("default"),
        Some(&ArgValue::Literal("0".into()))
    );
}

#[test]
fn every_descriptor_appears_in_the_map() {
    let sources = sources();
    let registry = registry();
    let article = model("Article", &["id", "title", "undocumented", "slug"]);
    let fields = get_model_fields(&article, &sources, &registry).unwrap().unwrap();

    assert_eq!(fields.len(), 4);
    assert_eq!(fields["undocumented"], None);
    let slug = definition(&fields, "slug");
    assert_eq!(slug.keyword("max_length"), Some("50"));
    assert_eq!(slug.keyword("unique"), Some("True"));
}

#[test]
fn defaults_are_folded_or_kept_symbolic() {
    let sources = sources();
    let registry = registry();
    let article = model("Article", &["created", "status", "ttl"]);
    let fields = get_model_fields(&article, &sources, &registry).unwrap().unwrap();

    assert_eq!(
        definition(&fields, "created").keyword_args.get("default"),
        Some(&ArgValue::Symbolic("django.utils.timezone.now".into()))
    );
    assert_eq!(
        definition(&fields, "status").keyword_args.get("default"),
        Some(&ArgValue::Literal("'draft'".into()))
    );
    assert_eq!(
        definition(&fields, "ttl").keyword_args.get("default"),
        Some(&ArgValue::Literal("604800".into()))
    );
}

#[test]
fn literal_default_is_preserved() {
    let sources = sources();
    let registry = registry();
    let comment = ModelClass::new("Comment", "news.models", "news")
        .with_field(FieldDescriptor::new("article"))
        .with_field(FieldDescriptor::new("body"));
    let fields = get_model_fields(&comment, &sources, &registry).unwrap().unwrap();

    let body = definition(&fields, "body");
    assert_eq!(body.constructor_path, "models.TextField");
    assert_eq!(
        body.keyword_args.get("default"),
        Some(&ArgValue::Literal("'unknown'".into()))
    );

    // `Story` names `Article`.
    let article = definition(&fields, "article");
    assert_eq!(article.positional_args, vec!["Article"]);
    assert_eq!(article.keyword("related_name"), Some("'comments'"));
}

#[test]
fn one_inspector_serves_many_models() {
    let sources = sources();
    let registry = registry();
    let inspector = FieldInspector::with_config(
        &sources,
        &registry,
        ScanConfig {
            primary_key_name: "pk".into(),
            ..ScanConfig::default()
        },
    );

    let note = inspector.get_model_fields(&model("Note", &["pk"])).unwrap().unwrap();
    let article = inspector
        .get_model_fields(&model("Article", &["pk", "title"]))
        .unwrap()
        .unwrap();

    assert_eq!(definition(&note, "pk").constructor_path, "models.AutoField");
    assert_eq!(definition(&article, "title").keyword("max_length"), Some("200"));
}

#[test]
fn field_map_serializes_for_the_migration_writer() {
    let sources = sources();
    let registry = registry();
    let note = model("Note", &["id", "x", "mystery"]);
    let fields = get_model_fields(&note, &sources, &registry).unwrap().unwrap();

    assert_eq!(
        serde_json::to_value(&fields).unwrap(),
        json!({
            "id": ["models.AutoField", [], {"primary_key": "True"}],
            "x": ["models.IntegerField", [], {"default": "0"}],
            "mystery": null,
        })
    );
}
