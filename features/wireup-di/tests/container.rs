use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use serde_json::json;
use wireup_di::{
    Arguments, Artifact, Binding, ConfigProvider, ContainerBuilder, ContainerError,
    ContainerOptions, Definition, DefinitionKind, Directive, DynError, InitError, InjectError,
    Injected, InjectionSource, InjectionTarget, Module, Provider, RegistryError, ResolveError,
    ScanError, Scope,
};

type Log = Arc<Mutex<Vec<String>>>;

fn push(log: &Log, event: String) {
    log.lock().unwrap().push(event);
}

fn events(log: &Log, suffix: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|event| event.ends_with(suffix))
        .cloned()
        .collect()
}

fn position(log: &Log, event: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .position(|entry| entry == event)
        .unwrap_or_else(|| panic!("'{event}' was never logged"))
}

#[derive(Clone, Copy, Default)]
struct Behaviour {
    init_delay_ms: u64,
    fail_init: bool,
    fail_destroy: bool,
}

/// Module logging every lifecycle step
struct Recorder {
    name: String,
    log: Log,
    behaviour: Behaviour,
    dependencies: Vec<Arc<Recorder>>,
}

impl Module for Recorder {
    async fn init(&mut self) -> Result<(), DynError> {
        push(&self.log, format!("{}:init:start", self.name));
        tokio::time::sleep(Duration::from_millis(self.behaviour.init_delay_ms)).await;
        if self.behaviour.fail_init {
            return Err(format!("{} refused to start", self.name).into());
        }
        push(&self.log, format!("{}:init:end", self.name));
        Ok(())
    }

    async fn destroy(&self) -> Result<(), DynError> {
        push(&self.log, format!("{}:destroy", self.name));
        if self.behaviour.fail_destroy {
            return Err(format!("{} refused to stop", self.name).into());
        }
        Ok(())
    }
}

fn recorder(name: &str, log: &Log, dependencies: &[&str], behaviour: Behaviour) -> Artifact {
    let owned = name.to_string();
    let captured = log.clone();
    let count = dependencies.len();

    let mut artifact = Artifact::new(
        format!("src/{name}.rs"),
        Provider::class(move |arguments: Arguments| {
            let dependencies = (0..count)
                .map(|position| arguments.instance::<Recorder>(position))
                .collect::<Result<Vec<_>, _>>()?;
            push(&captured, format!("{owned}:construct"));
            Ok(Recorder {
                name: owned.clone(),
                log: captured.clone(),
                behaviour,
                dependencies,
            })
        }),
    )
    .named(name)
    .method("init");

    for dependency in dependencies {
        artifact = artifact.parameter(Binding::new(*dependency).inject(*dependency));
    }
    artifact
}

fn simple(name: &str, log: &Log, dependencies: &[&str]) -> Artifact {
    recorder(name, log, dependencies, Behaviour::default())
}

#[tokio::test]
async fn every_definition_of_an_acyclic_graph_is_retrievable() {
    let log = Log::default();
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("C", &log, &["A", "B"]))
        .add_artifact(simple("B", &log, &["A"]))
        .add_artifact(simple("A", &log, &[]))
        .build()
        .unwrap();

    container.ready().await.unwrap();

    for identifier in ["A", "B", "C"] {
        assert!(container.get(identifier).is_ok(), "{identifier} missing");
    }
    assert_eq!(container.completion_order(), ["A", "B", "C"]);

    let c = container.get_as::<Recorder>("C").unwrap();
    let b = container.get_as::<Recorder>("B").unwrap();
    assert!(Arc::ptr_eq(&c.dependencies[1], &b));
    assert!(Arc::ptr_eq(&c.dependencies[0], &b.dependencies[0]));

    let graph = container.graph().unwrap();
    assert!(graph.position("A") < graph.position("B"));
    assert!(graph.position("B") < graph.position("C"));
}

#[tokio::test]
async fn mutual_references_are_a_cycle() {
    let log = Log::default();
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("A", &log, &["B"]))
        .add_artifact(simple("B", &log, &["A"]))
        .build()
        .unwrap();

    let error = container.ready().await.unwrap_err();
    match error {
        ContainerError::Init(InitError::Resolve(ResolveError::CircularDependency { cycle })) => {
            assert_eq!(cycle, ["A", "B", "A"]);
        }
        other => panic!("expected a circular dependency, got {other}"),
    }

    // Nothing was constructed
    assert!(log.lock().unwrap().is_empty());
    assert!(matches!(container.get("A"), Err(ContainerError::NotReadyYet)));
}

#[tokio::test]
async fn dependent_is_constructed_after_dependency_finished_init() {
    let log = Log::default();
    let slow = Behaviour {
        init_delay_ms: 30,
        ..Behaviour::default()
    };
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("B", &log, &["A"]))
        .add_artifact(recorder("A", &log, &[], slow))
        .build()
        .unwrap();

    container.ready().await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        [
            "A:construct",
            "A:init:start",
            "A:init:end",
            "B:construct",
            "B:init:start",
            "B:init:end"
        ]
    );
}

#[tokio::test]
async fn independent_definitions_initialize_concurrently() {
    let log = Log::default();
    let slow = Behaviour {
        init_delay_ms: 20,
        ..Behaviour::default()
    };

    let names: Vec<String> = (0..8).map(|n| format!("m{n}")).collect();
    let mut builder = ContainerBuilder::new();
    for name in &names {
        builder = builder.add_artifact(recorder(name, &log, &[], slow));
    }
    let mut container = builder.build().unwrap();

    container.ready().await.unwrap();

    for name in &names {
        assert!(container.get(name).is_ok());
    }
    assert_eq!(container.completion_order().len(), names.len());

    // Every init started before the first one finished
    let first_end = log
        .lock()
        .unwrap()
        .iter()
        .position(|event| event.ends_with(":init:end"))
        .unwrap();
    for name in &names {
        assert!(position(&log, &format!("{name}:init:start")) < first_end);
    }
}

#[tokio::test]
async fn sequential_mode_builds_one_definition_at_a_time() {
    let log = Log::default();
    let slow = Behaviour {
        init_delay_ms: 20,
        ..Behaviour::default()
    };
    let mut container = ContainerBuilder::new()
        .add_artifact(recorder("a", &log, &[], slow))
        .add_artifact(recorder("b", &log, &[], slow))
        .with_options(ContainerOptions {
            concurrent_init: false,
            ..ContainerOptions::default()
        })
        .build()
        .unwrap();

    container.ready().await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        [
            "a:construct",
            "a:init:start",
            "a:init:end",
            "b:construct",
            "b:init:start",
            "b:init:end"
        ]
    );
}

struct Settings;
impl Module for Settings {}

struct Consumer {
    settings: Arc<Settings>,
    y: u64,
}
impl Module for Consumer {}

#[tokio::test]
async fn configuration_values_and_references_are_injected() {
    let config = ConfigProvider::from_value(json!({ "x": { "y": 42 } }));
    let mut container = ContainerBuilder::new()
        .with_config(config)
        .add_artifact(Artifact::new("src/a.rs", Provider::class(|_| Ok(Settings))).named("A"))
        .add_artifact(
            Artifact::new(
                "src/b.rs",
                Provider::class(|arguments: Arguments| {
                    Ok(Consumer {
                        settings: arguments.instance(0)?,
                        y: arguments.value(1)?,
                    })
                }),
            )
            .named("B")
            .parameter(Binding::new("a").inject("A"))
            .parameter(Binding::new("y").config("x.y")),
        )
        .build()
        .unwrap();

    container.ready().await.unwrap();

    let consumer = container.get_as::<Consumer>("B").unwrap();
    let settings = container.get_as::<Settings>("A").unwrap();
    assert_eq!(consumer.y, 42);
    assert!(Arc::ptr_eq(&consumer.settings, &settings));
    assert!(container
        .get("A")
        .unwrap()
        .ptr_eq(&container.get("A").unwrap()));

    assert!(matches!(
        container.get_as::<Settings>("B"),
        Err(ContainerError::DowncastFailed { .. })
    ));
}

struct Configured {
    y: u64,
}
impl Module for Configured {}

struct Holder {
    configured: Arc<Configured>,
}
impl Module for Holder {}

#[tokio::test]
async fn dependency_receives_configuration_value() {
    let config = ConfigProvider::from_value(json!({ "x": { "y": 42 } }));
    let mut container = ContainerBuilder::new()
        .with_config(config)
        .add_artifact(
            Artifact::new(
                "src/a.rs",
                Provider::class(|arguments: Arguments| {
                    Ok(Holder {
                        configured: arguments.instance(0)?,
                    })
                }),
            )
            .named("A")
            .parameter(Binding::new("b").inject("B")),
        )
        .add_artifact(
            Artifact::new(
                "src/b.rs",
                Provider::class(|arguments: Arguments| {
                    Ok(Configured {
                        y: arguments.value(0)?,
                    })
                }),
            )
            .named("B")
            .parameter(Binding::new("y").config("x.y")),
        )
        .build()
        .unwrap();

    container.ready().await.unwrap();

    let a = container.get_as::<Holder>("A").unwrap();
    let b = container.get_as::<Configured>("B").unwrap();
    assert!(Arc::ptr_eq(&a.configured, &b));
    assert_eq!(a.configured.y, 42);
    assert_eq!(container.completion_order(), ["B", "A"]);
}

/// Receives everything through properties
#[derive(Default)]
struct Service {
    settings: Option<Arc<Settings>>,
    retries: Option<u32>,
}
impl Module for Service {
    fn set_property(&mut self, name: &str, value: Injected) -> Result<(), DynError> {
        match name {
            "settings" => self.settings = Some(value.instance()?),
            "retries" => self.retries = Some(value.value()?),
            _ => return Err(InjectError::UnknownProperty(name.to_string()).into()),
        }
        Ok(())
    }
}

#[tokio::test]
async fn named_properties_are_injected() {
    let config = ConfigProvider::from_value(json!({ "service": { "retries": 3 } }));
    let mut container = ContainerBuilder::new()
        .with_config(config)
        .add_artifact(Artifact::new("src/a.rs", Provider::class(|_| Ok(Settings))).named("A"))
        .add_artifact(
            Artifact::new("src/service.rs", Provider::class(|_| Ok(Service::default())))
                .property(Binding::new("settings").inject("A"))
                .property(Binding::new("retries").config("service.retries")),
        )
        .build()
        .unwrap();

    container.ready().await.unwrap();

    let service = container.get_as::<Service>("service").unwrap();
    let settings = container.get_as::<Settings>("A").unwrap();
    assert!(Arc::ptr_eq(service.settings.as_ref().unwrap(), &settings));
    assert_eq!(service.retries, Some(3));
}

#[tokio::test]
async fn unknown_property_fails_initialization() {
    let mut container = ContainerBuilder::new()
        .add_artifact(
            Artifact::new("src/a.rs", Provider::class(|_| Ok(Settings)))
                .named("A")
                .property(Binding::new("colour").literal("blue")),
        )
        .build()
        .unwrap();

    let error = container.ready().await.unwrap_err();
    assert!(matches!(
        &error,
        ContainerError::Init(InitError::InitializationFailed { identifier, .. }) if identifier == "A"
    ));
    assert!(error.to_string().contains("colour"));
}

#[tokio::test]
async fn definitions_not_fitting_their_provider_are_rejected() {
    let error = ContainerBuilder::new()
        .add_definition(
            Definition::new("f", DefinitionKind::ValueProvider)
                .with_dependency(
                    InjectionTarget::NamedProperty("p".into()),
                    InjectionSource::Literal(json!(1)),
                )
                .with_async_init(true),
            Provider::function(|_| async { Ok(0_u8) }),
        )
        .build()
        .unwrap_err();
    assert!(matches!(
        error,
        ScanError::Registry(RegistryError::InvalidDefinition { identifier, .. }) if identifier == "f"
    ));

    // Properties are dropped by functions, so they are refused up front
    let error = ContainerBuilder::new()
        .add_definition(
            Definition::new("f", DefinitionKind::PlainFunction).with_dependency(
                InjectionTarget::NamedProperty("p".into()),
                InjectionSource::Literal(json!(1)),
            ),
            Provider::function(|_| async { Ok(0_u8) }),
        )
        .build()
        .unwrap_err();
    assert!(matches!(
        error,
        ScanError::Registry(RegistryError::InvalidDefinition { .. })
    ));
}

#[tokio::test]
async fn conflicting_property_bindings_abort_the_build() {
    let error = ContainerBuilder::new()
        .add_artifact(
            Artifact::new("src/service.rs", Provider::class(|_| Ok(Service::default())))
                .property(Binding::new("retries").literal(1))
                .property(Binding::new("retries").literal(2)),
        )
        .build()
        .unwrap_err();
    assert!(matches!(
        error,
        ScanError::AmbiguousBinding { binding, .. } if binding == "retries"
    ));
}

#[tokio::test]
async fn failed_init_aborts_and_keeps_container_unready() {
    let log = Log::default();
    let failing = Behaviour {
        fail_init: true,
        ..Behaviour::default()
    };
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("A", &log, &[]))
        .add_artifact(simple("B", &log, &["A"]))
        .add_artifact(recorder("C", &log, &["B"], failing))
        .build()
        .unwrap();

    let error = container.ready().await.unwrap_err();
    assert!(matches!(
        &error,
        ContainerError::Init(InitError::InitializationFailed { identifier, .. }) if identifier == "C"
    ));
    assert!(error.to_string().contains("C refused to start"));

    assert!(matches!(container.get("C"), Err(ContainerError::NotReadyYet)));
    assert!(matches!(container.get("A"), Err(ContainerError::NotReadyYet)));
    assert!(!container.is_ready());

    // A second call reports the same failure without retrying
    assert!(matches!(
        container.ready().await,
        Err(ContainerError::Init(InitError::InitializationFailed { .. }))
    ));
    assert_eq!(events(&log, "C:construct").len(), 1);

    // Completed instances are still torn down
    assert_eq!(container.completion_order(), ["A", "B"]);
    container.close().await.unwrap();
    assert_eq!(events(&log, ":destroy"), ["B:destroy", "A:destroy"]);
}

struct Mailer {
    sender: String,
}

#[tokio::test]
async fn plain_function_receives_plugin_and_literal() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut container = ContainerBuilder::new()
        .add_plugin(
            "mailer",
            Mailer {
                sender: "noreply".to_string(),
            },
        )
        .unwrap()
        .add_artifact(
            Artifact::new(
                "src/notify.rs",
                Provider::function(move |arguments: Arguments| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let mailer = arguments.instance::<Mailer>(0)?;
                        let subject: String = arguments.value(1)?;
                        Ok::<_, DynError>(format!("{}: {subject}", mailer.sender))
                    }
                }),
            )
            .parameter(Binding::new("mailer").plugin("mailer"))
            .parameter(Binding::new("subject").literal("welcome")),
        )
        .build()
        .unwrap();

    assert_eq!(
        container.registry().get("notify").unwrap().kind,
        DefinitionKind::PlainFunction
    );

    container.ready().await.unwrap();

    assert_eq!(
        *container.get_as::<String>("notify").unwrap(),
        "noreply: welcome"
    );
    container.get("notify").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_plugin_fails_initialization() {
    let mut container = ContainerBuilder::new()
        .add_artifact(
            Artifact::new(
                "src/notify.rs",
                Provider::function(|arguments: Arguments| async move {
                    Ok::<_, DynError>(arguments.len())
                }),
            )
            .parameter(Binding::new("mailer").plugin("mailer")),
        )
        .build()
        .unwrap();

    assert!(matches!(
        container.ready().await,
        Err(ContainerError::Init(InitError::InitializationFailed { identifier, .. })) if identifier == "notify"
    ));
}

#[tokio::test]
async fn missing_configuration_value_fails_initialization() {
    let mut container = ContainerBuilder::new()
        .add_artifact(
            Artifact::new(
                "src/b.rs",
                Provider::class(|arguments: Arguments| {
                    Ok(Consumer {
                        settings: Arc::new(Settings),
                        y: arguments.value(0)?,
                    })
                }),
            )
            .named("B")
            .parameter(Binding::new("y").config("x.y")),
        )
        .build()
        .unwrap();

    let error = container.ready().await.unwrap_err();
    assert!(matches!(
        &error,
        ContainerError::Init(InitError::InitializationFailed { identifier, .. }) if identifier == "B"
    ));
    assert!(error.to_string().contains("x.y"));
}

#[tokio::test]
async fn slow_init_times_out() {
    let log = Log::default();
    let stuck = Behaviour {
        init_delay_ms: 10_000,
        ..Behaviour::default()
    };
    let mut container = ContainerBuilder::new()
        .add_artifact(recorder("stuck", &log, &[], stuck))
        .with_options(ContainerOptions {
            init_timeout_ms: Some(50),
            ..ContainerOptions::default()
        })
        .build()
        .unwrap();

    assert!(matches!(
        container.ready().await,
        Err(ContainerError::Init(InitError::Timeout))
    ));
}

#[tokio::test]
async fn options_are_read_from_configuration() {
    let log = Log::default();
    let config = ConfigProvider::from_value(json!({
        "container": { "concurrent_init": false, "init_timeout_ms": 1000 }
    }));
    let mut container = ContainerBuilder::new()
        .with_config(config)
        .options_from_config()
        .unwrap()
        .add_artifact(simple("a", &log, &[]))
        .build()
        .unwrap();

    container.ready().await.unwrap();
    assert!(container.get("a").is_ok());
}

#[tokio::test]
async fn close_tears_down_in_reverse_order_and_collects_failures() {
    let log = Log::default();
    let failing = Behaviour {
        fail_destroy: true,
        ..Behaviour::default()
    };
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("A", &log, &[]))
        .add_artifact(recorder("B", &log, &["A"], failing))
        .add_artifact(simple("C", &log, &["B"]))
        .build()
        .unwrap();

    container.ready().await.unwrap();

    match container.close().await {
        Err(ContainerError::TeardownFailed(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].0, "B");
        }
        other => panic!("expected a teardown failure, got {other:?}"),
    }

    // Every hook ran despite the failure
    assert_eq!(
        events(&log, ":destroy"),
        ["C:destroy", "B:destroy", "A:destroy"]
    );
    assert!(matches!(container.get("A"), Err(ContainerError::Closed)));
    assert!(matches!(container.ready().await, Err(ContainerError::Closed)));
    container.close().await.unwrap();
}

#[tokio::test]
async fn request_scoped_definitions_are_not_instantiated() {
    let log = Log::default();
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("A", &log, &[]))
        .add_artifact(simple("handler", &log, &["A"]).scope(Scope::PerRequest))
        .build()
        .unwrap();

    container.ready().await.unwrap();

    assert!(matches!(
        container.get("handler"),
        Err(ContainerError::RequestScoped(identifier)) if identifier == "handler"
    ));
    assert!(events(&log, "handler:construct").is_empty());
}

#[tokio::test]
async fn singleton_can_not_depend_on_request_scope() {
    let log = Log::default();
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("A", &log, &["handler"]))
        .add_artifact(simple("handler", &log, &[]).scope(Scope::PerRequest))
        .build()
        .unwrap();

    assert!(matches!(
        container.ready().await,
        Err(ContainerError::Init(InitError::Resolve(
            ResolveError::ScopeMismatch { .. }
        )))
    ));
}

#[tokio::test]
async fn values_and_explicit_definitions_join_the_graph() {
    let log = Log::default();
    let mut container = ContainerBuilder::new()
        .add_value("greeting", "hello".to_string())
        .add_artifact(
            Artifact::new(
                "src/shout.rs",
                Provider::function(|arguments: Arguments| async move {
                    let greeting = arguments.instance::<String>(0)?;
                    Ok::<_, DynError>(greeting.to_uppercase())
                }),
            )
            .parameter(Binding::new("greeting").inject_by_convention()),
        )
        .add_artifact(simple("A", &log, &[]))
        .build()
        .unwrap();

    container.ready().await.unwrap();

    assert_eq!(*container.get_as::<String>("shout").unwrap(), "HELLO");
    assert_eq!(*container.get_as::<String>("greeting").unwrap(), "hello");
}

#[tokio::test]
async fn unsupported_artifacts_are_skipped() {
    let log = Log::default();
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("A", &log, &[]))
        .add_artifact(
            simple("odd", &log, &[])
                .property(Binding::new("thing").directive(Directive::Other("autowired".into()))),
        )
        .build()
        .unwrap();

    assert_eq!(container.scan_report().registered, ["A"]);
    assert_eq!(container.scan_report().skipped.len(), 1);

    container.ready().await.unwrap();
    assert!(matches!(
        container.get("odd"),
        Err(ContainerError::UnknownIdentifier(_))
    ));
}

#[tokio::test]
async fn instances_are_unavailable_before_ready() {
    let log = Log::default();
    let mut container = ContainerBuilder::new()
        .add_artifact(simple("A", &log, &[]))
        .build()
        .unwrap();

    assert!(matches!(container.get("A"), Err(ContainerError::NotReadyYet)));
    assert!(container.graph().is_none());

    container.ready().await.unwrap();
    assert!(matches!(
        container.get("nope"),
        Err(ContainerError::UnknownIdentifier(_))
    ));

    // Ready is idempotent
    container.ready().await.unwrap();
    assert_eq!(events(&log, "A:construct").len(), 1);
}
