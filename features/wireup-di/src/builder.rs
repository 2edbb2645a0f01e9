use wireup_config::{ConfigError, ConfigProvider};

use crate::{
    container::Container,
    definition::{Definition, DefinitionKind},
    errors::{RegistryError, ScanError},
    factories::Provider,
    options::ContainerOptions,
    plugins::PluginRegistry,
    registry::DefinitionRegistry,
    scanner::{Artifact, Scanner},
    types::{Injectable, Instance},
};

//////////////////////////////////////////////////////////////////////
///
/// Wiring consists of three parts:
/// 1. The ContainerBuilder where one hands over artifacts, definitions, config and plugins
/// 2. `build` which scans the artifacts into the definition registry
/// 3. `Container::ready` which orders the definitions and initializes the instances
pub struct ContainerBuilder {
    /// Definitions registered by hand, before any artifact is scanned
    definitions: Vec<(Definition, Provider)>,
    artifacts: Vec<Artifact>,
    config: ConfigProvider,
    plugins: PluginRegistry,
    options: ContainerOptions,
    scanner: Scanner,
}
impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        ContainerBuilder {
            definitions: Vec::new(),
            artifacts: Vec::new(),
            config: ConfigProvider::new(),
            plugins: PluginRegistry::new(),
            options: ContainerOptions::default(),
            scanner: Scanner::new(),
        }
    }
}
impl ContainerBuilder {
    pub fn add_artifact(mut self, artifact: Artifact) -> Self {
        self.artifacts.push(artifact);
        self
    }

    pub fn add_artifacts(mut self, artifacts: impl IntoIterator<Item = Artifact>) -> Self {
        self.artifacts.extend(artifacts);
        self
    }

    /// Registers hand written metadata, bypassing the scanner
    pub fn add_definition(mut self, definition: Definition, provider: Provider) -> Self {
        self.definitions.push((definition, provider));
        self
    }

    /// Registers an existing value as a value provider without dependencies
    pub fn add_value<T: Injectable>(self, identifier: impl Into<String>, value: T) -> Self {
        self.add_definition(
            Definition::new(identifier, DefinitionKind::ValueProvider),
            Provider::Value(Instance::new(value)),
        )
    }

    pub fn with_config(mut self, config: ConfigProvider) -> Self {
        self.config = config;
        self
    }

    pub fn add_plugin<T: Injectable>(
        mut self,
        identifier: impl Into<String>,
        plugin: T,
    ) -> Result<Self, RegistryError> {
        self.plugins.add(identifier, plugin)?;
        Ok(self)
    }

    pub fn with_plugins(mut self, plugins: PluginRegistry) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn with_options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads the options from the `container` section of the current config
    pub fn options_from_config(mut self) -> Result<Self, ConfigError> {
        self.options = ContainerOptions::from_config(&self.config)?;
        Ok(self)
    }

    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Registers all definitions and scans all artifacts
    ///
    /// Nothing is instantiated yet - see [`Container::ready`].
    pub fn build(self) -> Result<Container, ScanError> {
        let ContainerBuilder {
            definitions,
            artifacts,
            config,
            plugins,
            options,
            scanner,
        } = self;

        tracing::debug!(
            "Building container with {} definitions and {} artifacts",
            definitions.len(),
            artifacts.len()
        );

        let mut registry = DefinitionRegistry::new();
        for (definition, provider) in definitions {
            registry.register(definition, provider)?;
        }

        let scan_report = scanner.scan(artifacts, &mut registry)?;

        Ok(Container::new(
            registry,
            config,
            plugins,
            options,
            scan_report,
        ))
    }
}
