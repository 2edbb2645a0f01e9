//! Dependency injection for async Rust
//!
//! Modules are described as [`Artifact`]s carrying their bindings. The [`Scanner`]
//! turns them into [`Definition`]s, the [`ResolvedGraph`] orders them and the
//! [`Container`] constructs and initializes every singleton, dependencies first.
//!
//! ```
//! use wireup_di::{Arguments, Artifact, Binding, ContainerBuilder, Module, Provider};
//!
//! struct Database {
//!     url: String,
//! }
//! impl Module for Database {}
//!
//! let mut container = ContainerBuilder::new()
//!     .add_artifact(
//!         Artifact::new(
//!             "src/database.rs",
//!             Provider::class(|arguments: Arguments| {
//!                 Ok(Database {
//!                     url: arguments.value(0)?,
//!                 })
//!             }),
//!         )
//!         .parameter(Binding::new("url").literal("postgres://localhost")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! futures::executor::block_on(container.ready()).unwrap();
//! let database = container.get_as::<Database>("database").unwrap();
//! assert_eq!(database.url, "postgres://localhost");
//! ```

pub mod builder;
pub mod container;
pub mod definition;
pub mod dependency_graph;
pub mod errors;
pub mod factories;
mod initiator;
pub mod options;
pub mod plugins;
pub mod registry;
pub mod scanner;
pub mod types;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use definition::{
    Definition, DefinitionKind, InjectionPoint, InjectionSource, InjectionTarget, Scope,
};
pub use dependency_graph::ResolvedGraph;
pub use errors::{
    ContainerError, InitError, InjectError, RegistryError, ResolveError, ScanError,
};
pub use factories::{Arguments, Module, Provider};
pub use options::ContainerOptions;
pub use plugins::PluginRegistry;
pub use registry::DefinitionRegistry;
pub use scanner::{Artifact, Binding, Directive, ScanReport, Scanner};
pub use types::{DynError, Injectable, Injected, Instance};

pub use wireup_config::{Config, ConfigError, ConfigProvider};
