// Copyright (c) Ken Kocienda and other contributors.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! Application and model registry lookups.

use std::collections::{HashMap, HashSet};

use crate::error::RegistryError;

/// What the scanner needs to know about installed applications.
pub trait ModelRegistry {
    /// Dotted path of the models module of the application `app_label`.
    fn models_module(&self, app_label: &str) -> Result<String, RegistryError>;

    /// True if `qualified_path` (`module.ClassName`) is a registered model.
    fn is_model(&self, qualified_path: &str) -> bool;
}

/// In-memory registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    apps: HashMap<String, Option<String>>,
    models: HashSet<String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application and its models module.
    pub fn register_app(&mut self, app_label: impl Into<String>, models_module: impl Into<String>) {
        self.apps.insert(app_label.into(), Some(models_module.into()));
    }

    /// Register an application that has no models module.
    pub fn register_app_without_models(&mut self, app_label: impl Into<String>) {
        self.apps.insert(app_label.into(), None);
    }

    /// Register a model by `module.ClassName`.
    pub fn register_model(&mut self, qualified_path: impl Into<String>) {
        self.models.insert(qualified_path.into());
    }
}

impl ModelRegistry for MemoryRegistry {
    fn models_module(&self, app_label: &str) -> Result<String, RegistryError> {
        match self.apps.get(app_label) {
            Some(Some(module)) => Ok(module.clone()),
            Some(None) => Err(RegistryError::NoModelsModule(app_label.to_string())),
            None => Err(RegistryError::UnknownApp(app_label.to_string())),
        }
    }

    fn is_model(&self, qualified_path: &str) -> bool {
        self.models.contains(qualified_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups() {
        let mut registry = MemoryRegistry::new();
        registry.register_app("shop", "shop.models");
        registry.register_app_without_models("static");
        registry.register_model("shop.models.Product");

        assert_eq!(registry.models_module("shop").unwrap(), "shop.models");
        assert_eq!(
            registry.models_module("static"),
            Err(RegistryError::NoModelsModule("static".into()))
        );
        assert_eq!(
            registry.models_module("blog"),
            Err(RegistryError::UnknownApp("blog".into()))
        );
        assert!(registry.is_model("shop.models.Product"));
        assert!(!registry.is_model("shop.models.Cart"));
    }
}
