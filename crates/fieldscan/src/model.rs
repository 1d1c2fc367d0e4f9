// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Description of a live model class as the ORM exposes it.
//!
//! The scanner never imports code; the caller describes each class with
//! these types, and the scanner reads the class source to fill in what the
//! descriptors alone cannot say.

use std::sync::Arc;

use crate::types::FieldTriple;

/// The model a relation field points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedModel {
    pub app_label: String,
    pub object_name: String,
}

impl RelatedModel {
    pub fn new(app_label: impl Into<String>, object_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            object_name: object_name.into(),
        }
    }

    /// `orm['app.Object']`, the frozen-ORM reference used in migrations.
    pub fn orm_reference(&self) -> String {
        format!("orm['{}.{}']", self.app_label, self.object_name)
    }
}

/// A runtime field of a model class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub related: Option<RelatedModel>,
    /// Value of the field's `(path, args, kwargs)` hook, if it has one.
    pub triple_hook: Option<FieldTriple>,
    /// Value of the deprecated single-string hook, if it has one.
    pub definition_hook: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            related: None,
            triple_hook: None,
            definition_hook: None,
        }
    }

    pub fn related_to(mut self, app_label: impl Into<String>, object_name: impl Into<String>) -> Self {
        self.related = Some(RelatedModel::new(app_label, object_name));
        self
    }

    pub fn with_triple(mut self, triple: FieldTriple) -> Self {
        self.triple_hook = Some(triple);
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition_hook = Some(definition.into());
        self
    }
}

/// A model class: identity, direct model bases and local field descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelClass {
    /// Intrinsic class name.
    pub name: String,
    /// Dotted path of the defining module.
    pub module: String,
    pub app_label: String,
    /// Direct bases that are themselves models, in declaration order.
    pub bases: Vec<Arc<ModelClass>>,
    pub fields: Vec<FieldDescriptor>,
    pub many_to_many: Vec<FieldDescriptor>,
}

impl ModelClass {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        app_label: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            app_label: app_label.into(),
            bases: Vec::new(),
            fields: Vec::new(),
            many_to_many: Vec::new(),
        }
    }

    pub fn with_base(mut self, base: Arc<ModelClass>) -> Self {
        self.bases.push(base);
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_many_to_many(mut self, field: FieldDescriptor) -> Self {
        self.many_to_many.push(field);
        self
    }

    /// `module.Name`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }
}
