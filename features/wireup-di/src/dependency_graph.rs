use std::collections::HashMap;

use serde::Serialize;

use crate::{
    definition::{Definition, Scope},
    errors::ResolveError,
    registry::DefinitionRegistry,
};

/// Definitions in construction order
///
/// Every Definition appears after all Definitions it references.
/// Only definition references are edges - configuration values and plugins
/// are resolved at construction time and never create a dependency.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedGraph {
    order: Vec<Definition>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

impl ResolvedGraph {
    /// Orders the registry with a depth first topological sort
    ///
    /// Roots are visited in registration order and dependencies in declaration
    /// order, so the same registry always yields the same order.
    pub fn resolve(registry: &DefinitionRegistry) -> Result<Self, ResolveError> {
        let mut states: HashMap<&str, VisitState> = HashMap::new();
        let mut chain: Vec<&str> = Vec::new();
        let mut order: Vec<Definition> = Vec::with_capacity(registry.len());

        for definition in registry.all() {
            visit(registry, definition, &mut states, &mut chain, &mut order)?;
        }

        let index = order
            .iter()
            .enumerate()
            .map(|(position, definition)| (definition.identifier.clone(), position))
            .collect();

        tracing::info!("Dependency graph resolved - {} definitions", order.len());
        return Ok(Self { order, index });

        fn visit<'a>(
            registry: &'a DefinitionRegistry,
            definition: &'a Definition,
            states: &mut HashMap<&'a str, VisitState>,
            chain: &mut Vec<&'a str>,
            order: &mut Vec<Definition>,
        ) -> Result<(), ResolveError> {
            let identifier = definition.identifier.as_str();
            match states.get(identifier) {
                Some(VisitState::Done) => return Ok(()),
                Some(VisitState::InProgress) => {
                    // Chain from the first visit of this node back to itself
                    let start = chain
                        .iter()
                        .position(|entry| *entry == identifier)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        chain[start..].iter().map(|entry| entry.to_string()).collect();
                    cycle.push(identifier.to_string());

                    return Err(ResolveError::CircularDependency { cycle });
                }
                None => {}
            }

            states.insert(identifier, VisitState::InProgress);
            chain.push(identifier);

            for reference in definition.definition_references() {
                let dependency = registry.get(reference).map_err(|_| {
                    ResolveError::UnresolvedReference {
                        identifier: reference.to_string(),
                        required_by: identifier.to_string(),
                    }
                })?;

                if definition.scope == Scope::Singleton && dependency.scope == Scope::PerRequest {
                    return Err(ResolveError::ScopeMismatch {
                        identifier: reference.to_string(),
                        required_by: identifier.to_string(),
                    });
                }

                visit(registry, dependency, states, chain, order)?;
            }

            chain.pop();
            states.insert(identifier, VisitState::Done);
            order.push(definition.clone());
            Ok(())
        }
    }

    /// All Definitions, dependencies first
    pub fn order(&self) -> &[Definition] {
        &self.order
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|definition| definition.identifier.as_str())
    }

    pub fn get(&self, identifier: &str) -> Option<&Definition> {
        self.index
            .get(identifier)
            .map(|&position| &self.order[position])
    }

    /// Position in construction order
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.index.get(identifier).copied()
    }

    /// Identifiers the given Definition references
    pub fn dependencies_of(&self, identifier: &str) -> Vec<&str> {
        self.get(identifier)
            .map(Definition::definition_references)
            .unwrap_or_default()
    }

    /// Identifiers which reference the given Definition
    pub fn dependents_of(&self, identifier: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|definition| definition.definition_references().contains(&identifier))
            .map(|definition| definition.identifier.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
