use serde::Serialize;
use serde_json::Value;

/// The declared shape of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefinitionKind {
    /// Constructed from positional arguments, then receives named properties
    ClassLike,
    /// Invoked exactly once with its parameters, the result is the instance
    PlainFunction,
    /// An already existing value
    ValueProvider,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// One instance per container
    #[default]
    Singleton,
    /// Declared only - construction is left to the consumer
    PerRequest,
}

/// Where a resolved value is placed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionTarget {
    ConstructorParameter(usize),
    NamedProperty(String),
    FunctionParameter(usize),
}

/// Where a resolved value comes from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectionSource {
    /// Another Definition, by identifier - the only source which is a graph edge
    DefinitionReference(String),
    /// A value of the configuration store, by path
    ConfigurationValue(String),
    /// An entry of the plugin registry, by identifier
    PluginReference(String),
    Literal(Value),
}

/// One dependency edge of a Definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InjectionPoint {
    pub target: InjectionTarget,
    pub source: InjectionSource,
}

impl InjectionPoint {
    pub fn new(target: InjectionTarget, source: InjectionSource) -> Self {
        Self { target, source }
    }

    /// Identifier of the referenced Definition, if the source is one
    pub fn definition_reference(&self) -> Option<&str> {
        match &self.source {
            InjectionSource::DefinitionReference(identifier) => Some(identifier),
            _ => None,
        }
    }
}

/// Metadata describing how to construct one module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub identifier: String,
    pub kind: DefinitionKind,
    /// In declaration order
    pub dependencies: Vec<InjectionPoint>,
    /// The module has an init hook which must complete before it is usable
    pub is_async_init: bool,
    pub scope: Scope,
}

impl Definition {
    pub fn new(identifier: impl Into<String>, kind: DefinitionKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            dependencies: Vec::new(),
            is_async_init: false,
            scope: Scope::Singleton,
        }
    }

    pub fn with_dependency(mut self, target: InjectionTarget, source: InjectionSource) -> Self {
        self.dependencies.push(InjectionPoint::new(target, source));
        self
    }

    pub fn with_async_init(mut self, is_async_init: bool) -> Self {
        self.is_async_init = is_async_init;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Identifiers of all referenced Definitions, in declaration order and without duplicates
    pub fn definition_references(&self) -> Vec<&str> {
        let mut references: Vec<&str> = Vec::new();
        for identifier in self
            .dependencies
            .iter()
            .filter_map(InjectionPoint::definition_reference)
        {
            if !references.contains(&identifier) {
                references.push(identifier);
            }
        }
        references
    }
}
