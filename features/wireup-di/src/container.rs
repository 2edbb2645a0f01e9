use std::{any::type_name, collections::HashMap, fmt::Debug, sync::Arc};

use wireup_config::ConfigProvider;

use crate::{
    definition::Scope,
    dependency_graph::ResolvedGraph,
    errors::{ContainerError, InitError},
    initiator::{DiInitiator, Initiated},
    options::ContainerOptions,
    plugins::PluginRegistry,
    registry::DefinitionRegistry,
    scanner::ScanReport,
    types::{Injectable, Instance},
};

/// Container owning all Definitions and, once ready, all Instances
///
/// Created by [`ContainerBuilder`](crate::builder::ContainerBuilder).
/// Nothing is instantiated before [`Container::ready`] is awaited.
pub struct Container {
    registry: DefinitionRegistry,
    config: ConfigProvider,
    plugins: PluginRegistry,
    options: ContainerOptions,
    scan_report: ScanReport,
    state: State,
}

enum State {
    Pending,
    Ready {
        graph: ResolvedGraph,
        instances: HashMap<String, Instance>,
        completion_order: Vec<String>,
    },
    /// Completed instances are only retained for teardown
    Failed {
        error: InitError,
        retained: HashMap<String, Instance>,
        completion_order: Vec<String>,
    },
    Closed,
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Pending => "pending",
            State::Ready { .. } => "ready",
            State::Failed { .. } => "failed",
            State::Closed => "closed",
        };

        let mut map = f.debug_struct("Container");
        map.field("state", &state);
        for definition in self.registry.all() {
            let val = match self.get(&definition.identifier) {
                Ok(instance) => instance.type_name,
                Err(_) => "unavailable",
            };
            map.field(&definition.identifier, &val);
        }
        map.finish()
    }
}

impl Container {
    pub(crate) fn new(
        registry: DefinitionRegistry,
        config: ConfigProvider,
        plugins: PluginRegistry,
        options: ContainerOptions,
        scan_report: ScanReport,
    ) -> Self {
        Self {
            registry,
            config,
            plugins,
            options,
            scan_report,
            state: State::Pending,
        }
    }

    /// Resolves the graph and builds every singleton
    ///
    /// Completes once all instances are constructed and initialized. Fails with the
    /// first error encountered - calling it again returns the same error and never
    /// retries.
    pub async fn ready(&mut self) -> Result<(), ContainerError> {
        match &self.state {
            State::Pending => {}
            State::Ready { .. } => return Ok(()),
            State::Failed { error, .. } => return Err(error.clone().into()),
            State::Closed => return Err(ContainerError::Closed),
        }

        let graph = match ResolvedGraph::resolve(&self.registry) {
            Ok(graph) => graph,
            Err(e) => {
                let error = InitError::from(e);
                tracing::error!("Dependency graph could not be resolved: {error}");
                self.state = State::Failed {
                    error: error.clone(),
                    retained: HashMap::new(),
                    completion_order: Vec::new(),
                };
                return Err(error.into());
            }
        };

        let Initiated {
            instances,
            completion_order,
            result,
        } = DiInitiator::new(
            &self.registry,
            &self.config,
            &self.plugins,
            self.options.concurrent_init,
        )
        .initiate(&graph, self.options.init_timeout())
        .await;

        match result {
            Ok(()) => {
                tracing::info!("Container ready with {} instances", instances.len());
                self.state = State::Ready {
                    graph,
                    instances,
                    completion_order,
                };
                Ok(())
            }
            Err(error) => {
                self.state = State::Failed {
                    error: error.clone(),
                    retained: instances,
                    completion_order,
                };
                Err(error.into())
            }
        }
    }

    /// Returns true once [`Container::ready`] completed successfully
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    /// Attempts to get the completed instance
    pub fn get(&self, identifier: &str) -> Result<Instance, ContainerError> {
        let instances = match &self.state {
            State::Ready { instances, .. } => instances,
            State::Pending | State::Failed { .. } => return Err(ContainerError::NotReadyYet),
            State::Closed => return Err(ContainerError::Closed),
        };

        if let Some(instance) = instances.get(identifier) {
            return Ok(instance.clone());
        }

        match self.registry.get(identifier) {
            Ok(definition) if definition.scope == Scope::PerRequest => {
                Err(ContainerError::RequestScoped(identifier.to_string()))
            }
            _ => Err(ContainerError::UnknownIdentifier(identifier.to_string())),
        }
    }

    /// Attempts to get the completed instance as `T`
    pub fn get_as<T: Injectable>(&self, identifier: &str) -> Result<Arc<T>, ContainerError> {
        self.get(identifier)?
            .downcast()
            .map_err(|actual_type| ContainerError::DowncastFailed {
                identifier: identifier.to_string(),
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// Tears the container down
    ///
    /// Teardown hooks run in reverse completion order. Every hook is invoked, even if
    /// an earlier one failed - the failures are reported together. Instances retained
    /// after a failed [`Container::ready`] are torn down as well.
    pub async fn close(&mut self) -> Result<(), ContainerError> {
        let (mut instances, completion_order) =
            match std::mem::replace(&mut self.state, State::Closed) {
                State::Ready {
                    instances,
                    completion_order,
                    ..
                } => (instances, completion_order),
                State::Failed {
                    retained,
                    completion_order,
                    ..
                } => (retained, completion_order),
                State::Pending | State::Closed => return Ok(()),
            };

        let mut failures = Vec::new();
        for identifier in completion_order.into_iter().rev() {
            let Some(instance) = instances.remove(&identifier) else {
                continue;
            };
            let Some(teardown) = instance.teardown else {
                continue;
            };

            tracing::debug!("Destroying '{identifier}'");
            if let Err(e) = teardown.destroy().await {
                tracing::warn!("Teardown of '{identifier}' failed: {e}");
                failures.push((identifier, Arc::new(e)));
            }
        }

        tracing::info!("Container closed");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::TeardownFailed(failures))
        }
    }

    /// The construction order - available once ready
    pub fn graph(&self) -> Option<&ResolvedGraph> {
        match &self.state {
            State::Ready { graph, .. } => Some(graph),
            _ => None,
        }
    }

    /// Identifiers in the order their instances completed initialization
    pub fn completion_order(&self) -> &[String] {
        match &self.state {
            State::Ready {
                completion_order, ..
            }
            | State::Failed {
                completion_order, ..
            } => completion_order,
            State::Pending | State::Closed => &[],
        }
    }

    pub fn registry(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ConfigProvider {
        &self.config
    }

    pub fn scan_report(&self) -> &ScanReport {
        &self.scan_report
    }
}
