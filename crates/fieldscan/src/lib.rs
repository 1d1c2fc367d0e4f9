// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Recovers ORM field declarations from model class source.
//!
//! A schema-migration generator needs, for every field of a model, the
//! constructor that declared it and the arguments it was given, as source
//! text it can write back out. This crate reads the class source, finds the
//! `name = path(args)` statements in the class body, and fills in what the
//! body does not say from descriptor hooks, base classes and naming
//! conventions.
//!
//! # Overview
//!
//! - **Extraction**: [`extract_field`] and [`parse_arguments`] decompose one
//!   class-body statement.
//! - **Assembly**: [`FieldInspector`] builds the [`FieldMap`] for a
//!   [`ModelClass`], walking its bases.
//! - **Evaluation**: [`evaluate_source`] folds literal expressions against a
//!   [`Namespace`] so defaults can be written as values.
//! - **Aliases**: [`AliasResolver`] finds models bound under a second name.
//!
//! # Quick Start
//!
//! ```
//! use fieldscan::{get_model_fields, FieldDescriptor, MemoryRegistry, MemorySources, ModelClass};
//!
//! let sources = MemorySources::new().with_module(
//!     "shop.models",
//!     "class Product(models.Model):\n    name = models.CharField(max_length=32, default='unknown')\n",
//! );
//! let mut registry = MemoryRegistry::new();
//! registry.register_app("shop", "shop.models");
//!
//! let model = ModelClass::new("Product", "shop.models", "shop")
//!     .with_field(FieldDescriptor::new("id"))
//!     .with_field(FieldDescriptor::new("name"));
//! let fields = get_model_fields(&model, &sources, &registry)
//!     .expect("scan error")
//!     .expect("class source available");
//!
//! let name = fields["name"].as_ref().and_then(|f| f.as_constructor()).unwrap();
//! assert_eq!(name.constructor_path, "models.CharField");
//! assert_eq!(name.keyword("default"), Some("'unknown'"));
//! ```

/// Alias detection and rewriting.
pub mod alias;
pub use alias::{aliases_in, rewrite_aliases, AliasMap, AliasResolver};

/// Argument list splitting.
pub mod arguments;
pub use arguments::{parse_arguments, ParsedArguments};

/// Field map assembly.
pub mod assembler;
pub use assembler::FieldInspector;

/// Scanner configuration.
pub mod config;
pub use config::{Config, ScanConfig};

/// Default value resolution.
pub mod defaults;
pub use defaults::{DefaultResolver, TIME_VARYING_DEFAULTS};

/// Error types.
pub mod error;
pub use error::{ArgumentError, ConfigError, RegistryError, ScanError, ScanResult};

/// Literal expression evaluation.
pub mod eval;
pub use eval::{evaluate, evaluate_source, EmptyScope, EvalError, EvalResult, Overlay, Scope};

/// Single-statement field extraction.
pub mod extract;
pub use extract::extract_field;

/// Runtime model metadata.
pub mod model;
pub use model::{FieldDescriptor, ModelClass, RelatedModel};

/// Module and class bindings.
pub mod namespace;
pub use namespace::{load_module_namespace, Namespace};

/// Application and model registry.
pub mod registry;
pub use registry::{MemoryRegistry, ModelRegistry};

/// Source retrieval and class location.
pub mod source;
pub use source::{locate_class, normalize_source, MemorySources, SourceProvider};

/// Field definition types.
pub mod types;
pub use types::{ArgValue, FieldDefinition, FieldEntry, FieldMap, FieldTriple};

/// Evaluated values.
pub mod value;
pub use value::{python_repr, Value};

/// Field map for `model` using default settings.
///
/// Builds a one-off [`FieldInspector`]; keep an inspector around instead
/// when scanning many models so module bindings are parsed once.
pub fn get_model_fields(
    model: &ModelClass,
    sources: &dyn SourceProvider,
    registry: &dyn ModelRegistry,
) -> ScanResult<Option<FieldMap>> {
    FieldInspector::new(sources, registry).get_model_fields(model)
}
