//! Wireup Config provides the configuration value store consumed while wiring
//! modules together.
//!
//! Wireup Config is split into two major parts:
//! 1. ConfigProvider: the value tree, addressed by dot separated paths
//! 2. Config<T>: a typed, deserialized view onto a section of the tree
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use wireup_config::provider::ConfigProvider;
//!
//! let mut provider = ConfigProvider::from_value(json!({ "x": { "y": 42 } }));
//! provider.set("app.name", "My Awesome App").unwrap();
//!
//! assert_eq!(provider.get("x.y").unwrap(), &json!(42));
//! assert_eq!(provider.get("app.name").unwrap(), &json!("My Awesome App"));
//! ```
//!
//! The provider never interprets values, it only passes them through.
//! The hosting application may enumerate the options it recognizes with
//! [`ConfigProvider::recognize`](provider::ConfigProvider::recognize).

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use errors::ConfigError;
pub use provider::ConfigProvider;
