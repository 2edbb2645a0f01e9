use std::{fmt::Debug, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use serde::de::DeserializeOwned;

use crate::{
    definition::DefinitionKind,
    errors::InjectError,
    types::{DynError, Injectable, Injected, Instance},
};

/// A class-like module
///
/// Constructed from its positional arguments, then receives its named properties.
/// If its Definition is marked as async init, [`Module::init`] runs before any
/// dependent module is constructed.
pub trait Module: Injectable + Sized {
    /// Places a resolved value into the named property
    fn set_property(&mut self, name: &str, value: Injected) -> Result<(), DynError> {
        let _ = value;
        Err(InjectError::UnknownProperty(name.to_string()).into())
    }

    /// Async initialization hook
    fn init(&mut self) -> impl Future<Output = Result<(), DynError>> + Send + '_ {
        async { Ok(()) }
    }

    /// Teardown hook, invoked when the container is closed
    fn destroy(&self) -> impl Future<Output = Result<(), DynError>> + Send + '_ {
        async { Ok(()) }
    }
}

/// Wrapper Trait for modules, erasing the concrete type while it is being built
pub(crate) trait DynModule: Send {
    fn set_property(&mut self, name: &str, value: Injected) -> Result<(), DynError>;

    fn init(&mut self) -> BoxFuture<'_, Result<(), DynError>>;

    fn into_instance(self: Box<Self>) -> Instance;
}
// Impl DynModule for any Module
impl<M: Module> DynModule for M {
    fn set_property(&mut self, name: &str, value: Injected) -> Result<(), DynError> {
        Module::set_property(self, name, value)
    }

    fn init(&mut self) -> BoxFuture<'_, Result<(), DynError>> {
        Module::init(self).boxed()
    }

    fn into_instance(self: Box<Self>) -> Instance {
        Instance::with_teardown(Arc::<M>::from(self))
    }
}

/// Teardown hook of a finished module
pub(crate) trait Teardown: Send + Sync {
    fn destroy(&self) -> BoxFuture<'_, Result<(), DynError>>;
}
impl<M: Module> Teardown for M {
    fn destroy(&self) -> BoxFuture<'_, Result<(), DynError>> {
        Module::destroy(self).boxed()
    }
}

type ConstructFn = dyn Fn(Arguments) -> Result<Box<dyn DynModule>, DynError> + Send + Sync;
type InvokeFn = dyn Fn(Arguments) -> BoxFuture<'static, Result<Instance, DynError>> + Send + Sync;

/// Constructor of a class-like module
#[derive(Clone)]
pub struct ClassConstructor(Arc<ConstructFn>);

/// Body of a plain function module
#[derive(Clone)]
pub struct FunctionBody(Arc<InvokeFn>);

/// Knows how to produce the Instance of one Definition
///
/// The variant is the declared shape of the module, it decides the Definition's kind.
#[derive(Clone)]
pub enum Provider {
    Class(ClassConstructor),
    Function(FunctionBody),
    Value(Instance),
}
impl Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Class(_) => f.write_str("Provider::Class"),
            Provider::Function(_) => f.write_str("Provider::Function"),
            Provider::Value(instance) => f.debug_tuple("Provider::Value").field(instance).finish(),
        }
    }
}

impl Provider {
    /// A class-like module, built by the given constructor
    pub fn class<M, F>(constructor: F) -> Self
    where
        M: Module,
        F: Fn(Arguments) -> Result<M, DynError> + Send + Sync + 'static,
    {
        Provider::Class(ClassConstructor(Arc::new(move |arguments| {
            constructor(arguments).map(|module| Box::new(module) as Box<dyn DynModule>)
        })))
    }

    /// A plain function - its output becomes the instance
    pub fn function<T, F, Fut>(function: F) -> Self
    where
        T: Injectable,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, DynError>> + Send + 'static,
    {
        Provider::Function(FunctionBody(Arc::new(move |arguments| {
            function(arguments).map(|result| result.map(Instance::new)).boxed()
        })))
    }

    /// An already existing value
    pub fn value<T: Injectable>(value: T) -> Self {
        Provider::Value(Instance::new(value))
    }

    pub fn kind(&self) -> DefinitionKind {
        match self {
            Provider::Class(_) => DefinitionKind::ClassLike,
            Provider::Function(_) => DefinitionKind::PlainFunction,
            Provider::Value(_) => DefinitionKind::ValueProvider,
        }
    }
}

impl ClassConstructor {
    pub(crate) fn construct(&self, arguments: Arguments) -> Result<Box<dyn DynModule>, DynError> {
        (self.0)(arguments)
    }
}

impl FunctionBody {
    pub(crate) fn invoke(&self, arguments: Arguments) -> BoxFuture<'static, Result<Instance, DynError>> {
        (self.0)(arguments)
    }
}

/// Positional values passed to a constructor or function
#[derive(Debug, Default)]
pub struct Arguments {
    positional: Vec<Option<Injected>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places a value at the given position, growing the argument list as needed
    pub fn set(&mut self, position: usize, value: Injected) {
        if self.positional.len() <= position {
            self.positional.resize(position + 1, None);
        }
        self.positional[position] = Some(value);
    }

    pub fn get(&self, position: usize) -> Result<&Injected, InjectError> {
        self.positional
            .get(position)
            .and_then(Option::as_ref)
            .ok_or(InjectError::MissingArgument(position))
    }

    /// The instance at the given position
    pub fn instance<T: Injectable>(&self, position: usize) -> Result<Arc<T>, InjectError> {
        self.get(position)?.instance()
    }

    /// The value at the given position, deserialized into `T`
    pub fn value<T: DeserializeOwned>(&self, position: usize) -> Result<T, InjectError> {
        self.get(position)?.value()
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }
}
