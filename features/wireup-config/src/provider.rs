use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{config::Config, errors::ConfigError};

/// A provider holding all configuration values of the hosting application.
///
/// Values are addressed by dot separated paths (`"database.pool.size"`).
/// Array elements are addressed by their index (`"servers.0.host"`).
///
/// The provider does not interpret values. It only hands them out to
/// whoever asks for a path.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvider {
    root: Value,
    /// Options the hosting application recognizes - empty means everything
    recognized: BTreeSet<String>,
}

impl ConfigProvider {
    /// Initializes an empty Config Provider
    pub fn new() -> Self {
        Self {
            root: Value::Object(Map::new()),
            recognized: BTreeSet::new(),
        }
    }

    /// Wraps an existing value tree
    pub fn from_value(root: Value) -> Self {
        Self {
            root,
            recognized: BTreeSet::new(),
        }
    }

    /// Enumerates an option the hosting application recognizes.
    ///
    /// Once at least one option is recognized, lookups of paths which are neither
    /// a recognized option nor nested below one fail with [`ConfigError::Unrecognized`].
    pub fn recognize(&mut self, path: impl Into<String>) -> Result<&mut Self, ConfigError> {
        let path = path.into();
        split(&path)?;
        self.recognized.insert(path);
        Ok(self)
    }

    /// Returns true if the path is allowed to be looked up
    pub fn is_recognized(&self, path: &str) -> bool {
        if self.recognized.is_empty() {
            return true;
        }

        self.recognized.iter().any(|option| {
            path == option
                || path
                    .strip_prefix(option.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// Retrieve the value stored at the given path.
    pub fn get(&self, path: &str) -> Result<&Value, ConfigError> {
        let segments = split(path)?;

        if !self.is_recognized(path) {
            return Err(ConfigError::Unrecognized(path.to_string()));
        }

        let mut current = &self.root;
        for segment in segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };

            current = next.ok_or_else(|| ConfigError::Missing(path.to_string()))?;
        }

        Ok(current)
    }

    /// Retrieve a typed view of the value stored at the given path.
    pub fn section<T: DeserializeOwned>(&self, path: &str) -> Result<Config<T>, ConfigError> {
        let value = self.get(path)?;
        let inner =
            serde_json::from_value(value.clone()).map_err(|error| ConfigError::Deserialize {
                path: path.to_string(),
                message: error.to_string(),
            })?;

        Ok(Config::new(inner))
    }

    /// Stores a value at the given path, creating intermediate objects on the way.
    ///
    /// Existing non-object values along the path are replaced.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<&mut Self, ConfigError> {
        let segments = split(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| ConfigError::InvalidPath(path.to_string()))?;

        let mut current = &mut self.root;
        for segment in parents {
            current = object_mut(current)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        object_mut(current).insert(last.to_string(), value.into());
        tracing::trace!("Config value set at '{path}'");
        Ok(self)
    }

    /// The whole value tree
    pub fn root(&self) -> &Value {
        &self.root
    }
}

fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }

    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by an object"),
    }
}

fn split(path: &str) -> Result<Vec<&str>, ConfigError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ConfigError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}
