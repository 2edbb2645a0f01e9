use std::collections::HashMap;

use crate::{
    errors::RegistryError,
    types::{Injectable, Instance},
};

/// Externally supplied plugins, addressable by identifier
///
/// Plugins are not Definitions - they exist before the container is built and never
/// take part in dependency ordering.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Instance>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plugin - fails if the identifier is already taken
    pub fn add<T: Injectable>(
        &mut self,
        identifier: impl Into<String>,
        plugin: T,
    ) -> Result<&mut Self, RegistryError> {
        self.add_instance(identifier, Instance::new(plugin))
    }

    pub fn add_instance(
        &mut self,
        identifier: impl Into<String>,
        plugin: Instance,
    ) -> Result<&mut Self, RegistryError> {
        let identifier = identifier.into();
        if self.plugins.contains_key(&identifier) {
            return Err(RegistryError::DuplicateIdentifier(identifier));
        }

        self.plugins.insert(identifier, plugin);
        Ok(self)
    }

    pub fn get(&self, identifier: &str) -> Option<&Instance> {
        self.plugins.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
