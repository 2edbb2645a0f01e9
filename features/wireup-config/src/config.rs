use std::{ops::Deref, sync::Arc};

/// A typed view onto a config section
///
/// Obtained from [`ConfigProvider::section`](crate::provider::ConfigProvider::section).
/// Cloning is cheap, the section is shared.
///
/// # Example
/// ```rust
/// use serde::Deserialize;
/// use wireup_config::provider::ConfigProvider;
///
/// #[derive(Deserialize)]
/// struct Server {
///     port: u16,
/// }
///
/// let provider = ConfigProvider::from_value(serde_json::json!({ "server": { "port": 8080 } }));
/// let server = provider.section::<Server>("server").unwrap();
/// assert_eq!(server.port, 8080);
/// ```
#[derive(Debug)]
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Clone for Config<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}
