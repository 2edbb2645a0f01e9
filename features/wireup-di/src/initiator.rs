use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
    thread::{self, sleep},
    time::Duration,
};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use futures_channel::oneshot;
use wireup_config::ConfigProvider;

use crate::{
    definition::{Definition, InjectionSource, InjectionTarget, Scope},
    dependency_graph::ResolvedGraph,
    errors::{InitError, InjectError},
    factories::{Arguments, Provider},
    plugins::PluginRegistry,
    registry::DefinitionRegistry,
    types::{DynError, Injected, Instance},
};

/// Everything the initiator produced - also on failure, so completed instances can be torn down
pub(crate) struct Initiated {
    /// Completed instances
    pub instances: HashMap<String, Instance>,
    /// Identifiers in the order their instances completed
    pub completion_order: Vec<String>,
    pub result: Result<(), InitError>,
}

/// Values resolved for one Definition, ready to be placed
#[derive(Default)]
struct Injections {
    arguments: Arguments,
    properties: Vec<(String, Injected)>,
}

/// Builds the instances of a [`ResolvedGraph`]
///
/// A Definition is started as soon as every Definition it references has been
/// constructed and initialized. Independent branches run concurrently unless
/// `concurrent` is disabled, in which case one Definition is built at a time.
pub(crate) struct DiInitiator<'a> {
    registry: &'a DefinitionRegistry,
    config: &'a ConfigProvider,
    plugins: &'a PluginRegistry,
    concurrent: bool,

    instances: HashMap<String, Instance>,
    completion_order: Vec<String>,
}

type BuildFuture = BoxFuture<'static, (String, Result<Instance, DynError>)>;

impl<'a> DiInitiator<'a> {
    pub(crate) fn new(
        registry: &'a DefinitionRegistry,
        config: &'a ConfigProvider,
        plugins: &'a PluginRegistry,
        concurrent: bool,
    ) -> Self {
        Self {
            registry,
            config,
            plugins,
            concurrent,
            instances: HashMap::new(),
            completion_order: Vec::new(),
        }
    }

    pub(crate) async fn initiate(
        mut self,
        graph: &ResolvedGraph,
        timeout: Option<Duration>,
    ) -> Initiated {
        // If we have a timeout - spawn a thread to signal once it's done
        let (timeout_tx, timeout_rx) = oneshot::channel::<()>();
        // Without a timeout the sender is kept alive, so the receiver never completes
        let _keep_alive = match timeout {
            Some(timeout) => {
                // We don't join the thread - it will just die after the timeout
                thread::spawn(move || {
                    sleep(timeout);
                    let _ = timeout_tx.send(());
                });
                None
            }
            None => Some(timeout_tx),
        };

        let result = self.try_initiate(graph, timeout_rx).await;
        match &result {
            Ok(()) => tracing::info!("All {} instances initialized", self.instances.len()),
            Err(e) => tracing::error!("Initialization aborted: {e}"),
        }

        Initiated {
            instances: self.instances,
            completion_order: self.completion_order,
            result,
        }
    }

    /// Starts every Definition once its dependencies completed and waits for all of them
    async fn try_initiate(
        &mut self,
        graph: &ResolvedGraph,
        mut timeout: oneshot::Receiver<()>,
    ) -> Result<(), InitError> {
        // Per-request definitions are declared only
        let singletons: Vec<&Definition> = graph
            .order()
            .iter()
            .filter(|definition| definition.scope == Scope::Singleton)
            .collect();

        let mut waiting_on: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<usize>> = HashMap::new();
        // Graph positions of Definitions whose dependencies are complete
        let mut ready: BTreeSet<usize> = BTreeSet::new();

        for (position, definition) in singletons.iter().enumerate() {
            let references = definition.definition_references();
            for reference in &references {
                dependents.entry(*reference).or_default().push(position);
            }
            waiting_on.insert(definition.identifier.as_str(), references.len());
            if references.is_empty() {
                ready.insert(position);
            }
        }

        let total = singletons.len();
        tracing::debug!("Initializing {total} definitions");

        let mut running: FuturesUnordered<BuildFuture> = FuturesUnordered::new();
        loop {
            // Start everything that is ready - lowest graph position first
            while let Some(position) = ready.pop_first() {
                if !self.concurrent && !running.is_empty() {
                    ready.insert(position);
                    break;
                }
                running.push(self.start(singletons[position])?);
            }

            if running.is_empty() {
                break;
            }

            tracing::debug!(
                "Waiting for instances to finish [{} of {total} complete]",
                self.completion_order.len()
            );

            futures::select! {
                result = running.next() => {
                    let Some((identifier, result)) = result else {
                        break;
                    };

                    let instance = result.map_err(|cause| InitError::InitializationFailed {
                        identifier: identifier.clone(),
                        cause: Arc::new(cause),
                    })?;

                    for &dependent in dependents.get(identifier.as_str()).into_iter().flatten() {
                        let remaining = waiting_on
                            .get_mut(singletons[dependent].identifier.as_str())
                            .map(|remaining| {
                                *remaining -= 1;
                                *remaining
                            });
                        if remaining == Some(0) {
                            ready.insert(dependent);
                        }
                    }

                    self.complete(identifier, instance);
                }
                _ = timeout => {
                    return Err(InitError::Timeout)
                }
            }
        }

        debug_assert_eq!(self.completion_order.len(), total, "Not all definitions completed");
        Ok(())
    }

    /// Resolves the injections of a Definition and returns the future building it
    fn start(&self, definition: &Definition) -> Result<BuildFuture, InitError> {
        let identifier = definition.identifier.clone();
        let failed = |cause: DynError| InitError::InitializationFailed {
            identifier: identifier.clone(),
            cause: Arc::new(cause),
        };

        let provider = self
            .registry
            .provider(&definition.identifier)
            .map_err(|e| failed(e.into()))?
            .clone();
        let injections = self.resolve_injections(definition).map_err(failed)?;
        let is_async_init = definition.is_async_init;

        tracing::debug!("Constructing '{identifier}'");
        Ok(async move {
            let result = build(&identifier, provider, injections, is_async_init).await;
            (identifier, result)
        }
        .boxed())
    }

    /// Looks up the concrete value of every injection point
    fn resolve_injections(&self, definition: &Definition) -> Result<Injections, DynError> {
        let mut injections = Injections::default();

        for point in &definition.dependencies {
            let value = match &point.source {
                InjectionSource::DefinitionReference(reference) => self
                    .instances
                    .get(reference)
                    .cloned()
                    .map(Injected::Instance)
                    .ok_or_else(|| InjectError::Unavailable(reference.clone()))?,
                InjectionSource::ConfigurationValue(path) => {
                    Injected::Value(self.config.get(path)?.clone())
                }
                InjectionSource::PluginReference(plugin) => self
                    .plugins
                    .get(plugin)
                    .cloned()
                    .map(Injected::Instance)
                    .ok_or_else(|| InjectError::PluginMissing(plugin.clone()))?,
                InjectionSource::Literal(value) => Injected::Value(value.clone()),
            };

            match &point.target {
                InjectionTarget::ConstructorParameter(position)
                | InjectionTarget::FunctionParameter(position) => {
                    injections.arguments.set(*position, value)
                }
                InjectionTarget::NamedProperty(name) => {
                    injections.properties.push((name.clone(), value))
                }
            }
        }

        Ok(injections)
    }

    fn complete(&mut self, identifier: String, instance: Instance) {
        tracing::debug!("'{identifier}' is ready ({})", instance.type_name);
        self.instances.insert(identifier.clone(), instance);
        self.completion_order.push(identifier);
    }
}

/// Constructs the instance, places its properties and awaits its init hook
async fn build(
    identifier: &str,
    provider: Provider,
    injections: Injections,
    is_async_init: bool,
) -> Result<Instance, DynError> {
    let Injections {
        arguments,
        properties,
    } = injections;

    match provider {
        Provider::Class(constructor) => {
            let mut module = constructor.construct(arguments)?;
            for (name, value) in properties {
                module.set_property(&name, value)?;
            }

            if is_async_init {
                tracing::debug!("Awaiting init hook of '{identifier}'");
                module.init().await?;
            }

            Ok(module.into_instance())
        }
        Provider::Function(function) => function.invoke(arguments).await,
        Provider::Value(instance) => Ok(instance),
    }
}
