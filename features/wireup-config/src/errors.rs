/// Errors when trying to acquire or store a config value
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Nothing is stored at the path
    #[error("No config value is stored at '{0}'")]
    Missing(String),
    /// The hosting application does not recognize the path as an option
    #[error("'{0}' is not a recognized config option")]
    Unrecognized(String),
    /// The path is malformed - e.g. contains empty segments
    #[error("'{0}' is not a valid config path")]
    InvalidPath(String),
    /// The value exists but does not have the requested shape
    #[error("Config value at '{path}' could not be deserialized: {message}")]
    Deserialize { path: String, message: String },
}
