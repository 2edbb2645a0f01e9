use std::collections::{HashMap, HashSet};

use crate::{
    definition::{Definition, DefinitionKind, InjectionTarget},
    errors::RegistryError,
    factories::Provider,
};

/// Holds all Definitions before instantiation
///
/// Next to the metadata, every entry keeps the [`Provider`] which knows how to
/// construct the module. The metadata is all the resolver looks at; the
/// providers are consumed by the initiator.
#[derive(Default)]
pub struct DefinitionRegistry {
    /// In registration order - used for deterministic tie breaking
    entries: Vec<RegistryEntry>,
    index: HashMap<String, usize>,
}

struct RegistryEntry {
    definition: Definition,
    provider: Provider,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition
    ///
    /// Fails if the identifier is already taken - the first registration is kept.
    /// Fails as well if the metadata does not fit the provider, see [`validate`].
    pub fn register(
        &mut self,
        definition: Definition,
        provider: Provider,
    ) -> Result<(), RegistryError> {
        if self.index.contains_key(&definition.identifier) {
            return Err(RegistryError::DuplicateIdentifier(definition.identifier));
        }

        validate(&definition, &provider).map_err(|reason| RegistryError::InvalidDefinition {
            identifier: definition.identifier.clone(),
            reason,
        })?;

        tracing::debug!(
            "Registered '{}' ({:?}, {} dependencies)",
            definition.identifier,
            definition.kind,
            definition.dependencies.len()
        );

        self.index
            .insert(definition.identifier.clone(), self.entries.len());
        self.entries.push(RegistryEntry {
            definition,
            provider,
        });
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Result<&Definition, RegistryError> {
        self.entry(identifier).map(|entry| &entry.definition)
    }

    pub fn provider(&self, identifier: &str) -> Result<&Provider, RegistryError> {
        self.entry(identifier).map(|entry| &entry.provider)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.index.contains_key(identifier)
    }

    /// All definitions in registration order
    pub fn all(&self) -> impl Iterator<Item = &Definition> {
        self.entries.iter().map(|entry| &entry.definition)
    }

    /// Position in registration order
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.index.get(identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, identifier: &str) -> Result<&RegistryEntry, RegistryError> {
        self.index
            .get(identifier)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| RegistryError::UnknownIdentifier(identifier.to_string()))
    }
}

/// Checks that every injection point can be placed by the provider
///
/// - the declared kind is the provider's kind
/// - value providers take no injections and only class-like modules have an init hook
/// - class-like modules take constructor parameters and properties, plain functions only function parameters
/// - no target is bound twice and parameter positions are `0..n` for `n` parameters
fn validate(definition: &Definition, provider: &Provider) -> Result<(), String> {
    let kind = definition.kind;
    if kind != provider.kind() {
        return Err(format!(
            "declared as {kind:?} but constructed by a {:?} provider",
            provider.kind()
        ));
    }
    if definition.is_async_init && kind != DefinitionKind::ClassLike {
        return Err(format!("{kind:?} modules have no init hook"));
    }
    if kind == DefinitionKind::ValueProvider && !definition.dependencies.is_empty() {
        return Err("values can not receive injections".to_string());
    }

    let parameters = definition
        .dependencies
        .iter()
        .filter(|point| !matches!(point.target, InjectionTarget::NamedProperty(_)))
        .count();

    let mut seen: HashSet<&InjectionTarget> = HashSet::new();
    for point in &definition.dependencies {
        match (&point.target, kind) {
            (InjectionTarget::ConstructorParameter(position), DefinitionKind::ClassLike)
            | (InjectionTarget::FunctionParameter(position), DefinitionKind::PlainFunction) => {
                if *position >= parameters {
                    return Err(format!(
                        "parameter position {position} is out of range for {parameters} parameters"
                    ));
                }
            }
            (InjectionTarget::NamedProperty(_), DefinitionKind::ClassLike) => {}
            (target, kind) => return Err(format!("{kind:?} modules can not bind {target:?}")),
        }

        if !seen.insert(&point.target) {
            return Err(format!("{:?} is bound twice", point.target));
        }
    }

    Ok(())
}
