use std::{
    any::{type_name, Any},
    fmt::Debug,
    sync::Arc,
};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{errors::InjectError, factories::Teardown};

/// All errors must be Send + Sync so they can cross await points
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume that we are using a multithreaded async runtime
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Live object produced for a Definition
///
/// Cloning only clones the handle, the object itself is shared.
#[derive(Clone)]
pub struct Instance {
    pub type_name: &'static str,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
    /// Teardown hook of class-like modules
    pub(crate) teardown: Option<Arc<dyn Teardown>>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl Instance {
    pub fn new<ExistingInstance: Injectable>(instance: ExistingInstance) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub fn from_arc<ExistingInstance: Injectable>(instance: Arc<ExistingInstance>) -> Self {
        Instance {
            type_name: type_name::<ExistingInstance>(),
            instance,
            teardown: None,
        }
    }

    pub(crate) fn with_teardown<M: Teardown + Injectable>(module: Arc<M>) -> Self {
        Instance {
            type_name: type_name::<M>(),
            instance: module.clone(),
            teardown: Some(module),
        }
    }

    /// Downcasts to the concrete type - returns the actual type name on failure
    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.type_name),
        }
    }

    /// True if both handles point to the same object
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

/// A resolved value, ready to be placed into a constructor, property or function parameter
#[derive(Debug, Clone)]
pub enum Injected {
    /// Another Instance or a plugin
    Instance(Instance),
    /// A configuration value or a literal
    Value(Value),
}

impl Injected {
    /// Returns the injected instance as `T`
    pub fn instance<T: Injectable>(&self) -> Result<Arc<T>, InjectError> {
        match self {
            Injected::Instance(instance) => {
                instance
                    .downcast()
                    .map_err(|actual_type| InjectError::DowncastFailed {
                        required_type: type_name::<T>(),
                        actual_type,
                    })
            }
            Injected::Value(_) => Err(InjectError::NotAnInstance),
        }
    }

    /// Deserializes the injected value into `T`
    pub fn value<T: DeserializeOwned>(&self) -> Result<T, InjectError> {
        match self {
            Injected::Value(value) => serde_json::from_value(value.clone()).map_err(|error| {
                InjectError::Deserialize {
                    required_type: type_name::<T>(),
                    message: error.to_string(),
                }
            }),
            Injected::Instance(_) => Err(InjectError::NotAValue),
        }
    }

    /// Raw json value, if this is a value
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Injected::Value(value) => Some(value),
            Injected::Instance(_) => None,
        }
    }
}
