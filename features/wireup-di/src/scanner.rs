use std::collections::BTreeSet;

use serde_json::Value;

use crate::{
    definition::{Definition, DefinitionKind, InjectionPoint, InjectionSource, InjectionTarget, Scope},
    errors::ScanError,
    factories::Provider,
    registry::DefinitionRegistry,
};

/// Name of the lifecycle method marking an async initialization hook
pub const INIT_HOOK: &str = "init";

/// A declarative binding directive attached to a parameter or property
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// Inject another module - `None` derives the identifier by convention
    Inject(Option<String>),
    /// Inject a configuration value by path
    Config(String),
    /// Inject a plugin by identifier
    Plugin(String),
    /// Inject a fixed value
    Literal(Value),
    /// A directive of a shape the scanner does not know
    Other(String),
}

/// A parameter or property together with its directives
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub type_hint: Option<String>,
    pub directives: Vec<Directive>,
}

impl Binding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            directives: Vec::new(),
        }
    }

    pub fn typed(mut self, type_hint: impl Into<String>) -> Self {
        self.type_hint = Some(type_hint.into());
        self
    }

    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn inject(self, identifier: impl Into<String>) -> Self {
        self.directive(Directive::Inject(Some(identifier.into())))
    }

    pub fn inject_by_convention(self) -> Self {
        self.directive(Directive::Inject(None))
    }

    pub fn config(self, path: impl Into<String>) -> Self {
        self.directive(Directive::Config(path.into()))
    }

    pub fn plugin(self, identifier: impl Into<String>) -> Self {
        self.directive(Directive::Plugin(identifier.into()))
    }

    pub fn literal(self, value: impl Into<Value>) -> Self {
        self.directive(Directive::Literal(value.into()))
    }
}

/// A candidate source artifact, as handed over by the discovery layer
///
/// The exported construct decides the kind of the resulting Definition.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: String,
    /// Explicit binding name - takes precedence over the path derived identifier
    pub name: Option<String>,
    pub export: Provider,
    /// Constructor or function parameters, in declaration order
    pub parameters: Vec<Binding>,
    /// Properties bound independently of the constructor
    pub properties: Vec<Binding>,
    /// Declared method names - used to detect lifecycle hooks
    pub methods: Vec<String>,
    pub scope: Scope,
}

impl Artifact {
    pub fn new(path: impl Into<String>, export: Provider) -> Self {
        Self {
            path: path.into(),
            name: None,
            export,
            parameters: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            scope: Scope::Singleton,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn parameter(mut self, binding: Binding) -> Self {
        self.parameters.push(binding);
        self
    }

    pub fn property(mut self, binding: Binding) -> Self {
        self.properties.push(binding);
        self
    }

    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.push(name.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Explicit name, or the path's file stem in lower camel case
    pub fn identifier(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => identifier_from_path(&self.path),
        }
    }
}

/// Outcome of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Identifiers registered by the scan, in artifact order
    pub registered: Vec<String>,
    /// Artifacts skipped because of an unsupported binding
    pub skipped: Vec<ScanError>,
}

/// Turns artifacts into Definitions
#[derive(Debug, Clone)]
pub struct Scanner {
    init_hook: String,
}
impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            init_hook: INIT_HOOK.to_string(),
        }
    }

    /// Uses a different method name as async init hook
    pub fn with_init_hook(mut self, name: impl Into<String>) -> Self {
        self.init_hook = name.into();
        self
    }

    /// Scans all artifacts and registers the resulting Definitions
    ///
    /// Artifacts with unsupported bindings are skipped and listed in the report.
    /// Ambiguous bindings and duplicate identifiers abort the scan.
    pub fn scan(
        &self,
        artifacts: Vec<Artifact>,
        registry: &mut DefinitionRegistry,
    ) -> Result<ScanReport, ScanError> {
        // Everything a convention match may point to
        let mut known: BTreeSet<String> = registry.all().map(|d| d.identifier.clone()).collect();
        known.extend(artifacts.iter().map(Artifact::identifier));

        let mut report = ScanReport::default();
        for artifact in artifacts {
            let definition = match self.scan_artifact(&artifact, &known) {
                Ok(definition) => definition,
                Err(error @ ScanError::UnsupportedBinding { .. }) => {
                    tracing::warn!("Skipping artifact: {error}");
                    report.skipped.push(error);
                    continue;
                }
                Err(error) => return Err(error),
            };

            let identifier = definition.identifier.clone();
            registry.register(definition, artifact.export)?;
            report.registered.push(identifier);
        }

        tracing::info!(
            "Scan complete - {} registered, {} skipped",
            report.registered.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Extracts the Definition of a single artifact
    pub fn scan_artifact(
        &self,
        artifact: &Artifact,
        known: &BTreeSet<String>,
    ) -> Result<Definition, ScanError> {
        let identifier = artifact.identifier();
        let kind = artifact.export.kind();
        let unsupported = |reason: &str| ScanError::UnsupportedBinding {
            artifact: artifact.path.clone(),
            reason: reason.to_string(),
        };

        let parameter_target: fn(usize) -> InjectionTarget = match kind {
            DefinitionKind::ClassLike => InjectionTarget::ConstructorParameter,
            DefinitionKind::PlainFunction => InjectionTarget::FunctionParameter,
            DefinitionKind::ValueProvider => {
                if !artifact.parameters.is_empty() || !artifact.properties.is_empty() {
                    return Err(unsupported("exported values can not have bindings"));
                }
                InjectionTarget::ConstructorParameter
            }
        };
        if kind == DefinitionKind::PlainFunction && !artifact.properties.is_empty() {
            return Err(unsupported("plain functions can not have property bindings"));
        }

        let mut definition = Definition::new(identifier, kind).with_scope(artifact.scope);

        for (position, binding) in artifact.parameters.iter().enumerate() {
            let source = self.classify(artifact, &definition.identifier, binding, known)?;
            definition
                .dependencies
                .push(InjectionPoint::new(parameter_target(position), source));
        }

        let mut properties: Vec<(&str, InjectionSource)> = Vec::new();
        for binding in &artifact.properties {
            let source = self.classify(artifact, &definition.identifier, binding, known)?;

            // The same property may be declared twice, but only with the same source
            let existing = properties.iter().position(|(name, _)| *name == binding.name);
            match existing {
                Some(index) if properties[index].1 == source => continue,
                Some(_) => {
                    return Err(ScanError::AmbiguousBinding {
                        artifact: artifact.path.clone(),
                        binding: binding.name.clone(),
                        reason: "property is bound to different sources".to_string(),
                    })
                }
                None => properties.push((binding.name.as_str(), source.clone())),
            }

            definition.dependencies.push(InjectionPoint::new(
                InjectionTarget::NamedProperty(binding.name.clone()),
                source,
            ));
        }

        definition.is_async_init = kind == DefinitionKind::ClassLike
            && artifact.methods.iter().any(|method| *method == self.init_hook);

        tracing::debug!(
            "Scanned '{}' from '{}' ({:?})",
            definition.identifier,
            artifact.path,
            kind
        );
        Ok(definition)
    }

    /// Decides where the value of a binding comes from
    ///
    /// Explicit directives are used first, convention matching only if there are none.
    fn classify(
        &self,
        artifact: &Artifact,
        identifier: &str,
        binding: &Binding,
        known: &BTreeSet<String>,
    ) -> Result<InjectionSource, ScanError> {
        let mut directives: Vec<&Directive> = Vec::new();
        for directive in &binding.directives {
            if let Directive::Other(shape) = directive {
                return Err(ScanError::UnsupportedBinding {
                    artifact: artifact.path.clone(),
                    reason: format!("unknown directive '{shape}' on '{}'", binding.name),
                });
            }
            if !directives.contains(&directive) {
                directives.push(directive);
            }
        }

        let ambiguous = |reason: String| ScanError::AmbiguousBinding {
            artifact: artifact.path.clone(),
            binding: binding.name.clone(),
            reason,
        };

        let directive = match directives.as_slice() {
            [] => None,
            [directive] => Some(*directive),
            _ => return Err(ambiguous(format!("{} conflicting directives", directives.len()))),
        };

        let convention = || -> Result<Option<String>, ScanError> {
            let candidates = convention_candidates(identifier, binding, known);
            match candidates.len() {
                0 | 1 => Ok(candidates.into_iter().next()),
                _ => Err(ambiguous(format!(
                    "matches several definitions by convention: {}",
                    candidates.into_iter().collect::<Vec<_>>().join(", ")
                ))),
            }
        };

        let source = match directive {
            Some(Directive::Inject(Some(target))) => InjectionSource::DefinitionReference(target.clone()),
            // No name given - fall back to convention, then to the binding's own name
            Some(Directive::Inject(None)) => InjectionSource::DefinitionReference(
                convention()?.unwrap_or_else(|| lower_camel_case(&binding.name)),
            ),
            Some(Directive::Config(path)) => InjectionSource::ConfigurationValue(path.clone()),
            Some(Directive::Plugin(plugin)) => InjectionSource::PluginReference(plugin.clone()),
            Some(Directive::Literal(value)) => InjectionSource::Literal(value.clone()),
            Some(Directive::Other(_)) | None => match convention()? {
                Some(target) => InjectionSource::DefinitionReference(target),
                None => {
                    return Err(ScanError::UnsupportedBinding {
                        artifact: artifact.path.clone(),
                        reason: format!(
                            "'{}' has no directive and matches no known definition",
                            binding.name
                        ),
                    })
                }
            },
        };

        Ok(source)
    }
}

/// Identifiers matching the binding's type hint or name - never the artifact itself
fn convention_candidates(
    identifier: &str,
    binding: &Binding,
    known: &BTreeSet<String>,
) -> BTreeSet<String> {
    let hints: Vec<String> = binding
        .type_hint
        .iter()
        .chain(std::iter::once(&binding.name))
        .map(|hint| normalize(hint))
        .collect();

    known
        .iter()
        .filter(|candidate| candidate.as_str() != identifier)
        .filter(|candidate| hints.contains(&normalize(candidate)))
        .cloned()
        .collect()
}

/// Comparison key for convention matching - case and separators are ignored
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | '.'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// `"src/service/user_service.rs"` -> `"userService"`
pub fn identifier_from_path(path: &str) -> String {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _extension)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    lower_camel_case(stem)
}

fn lower_camel_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for (index, word) in name
        .split(['_', '-', '.', ' '])
        .filter(|word| !word.is_empty())
        .enumerate()
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            if index == 0 {
                result.extend(first.to_lowercase());
            } else {
                result.extend(first.to_uppercase());
            }
            result.push_str(chars.as_str());
        }
    }
    result
}
