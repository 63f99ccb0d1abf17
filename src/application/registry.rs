//! Registry of listeners, keyed by name.
//!
//! The dispatcher takes whatever listener list it is given. The registry is the
//! usual way to assemble that list: it keeps listeners in registration order,
//! lets them be replaced or removed by name, and filters out the ones that are
//! currently disabled.

use crate::domain::listener::LimitListener;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Ordered, name-keyed set of listeners.
///
/// Clones share the same underlying registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Arc<RwLock<Vec<Arc<dyn LimitListener>>>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under its name.
    ///
    /// A listener with the same name is replaced in place, keeping its
    /// position, and returned.
    pub fn register(&self, listener: Arc<dyn LimitListener>) -> Option<Arc<dyn LimitListener>> {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        match listeners.iter().position(|l| l.name() == listener.name()) {
            Some(index) => Some(std::mem::replace(&mut listeners[index], listener)),
            None => {
                listeners.push(listener);
                None
            }
        }
    }

    /// Remove the listener registered under `name`.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn LimitListener>> {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let index = listeners.iter().position(|l| l.name() == name)?;
        Some(listeners.remove(index))
    }

    /// Look up a listener by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn LimitListener>> {
        self.read(|listeners| listeners.iter().find(|l| l.name() == name).cloned())
    }

    /// Names of all registered listeners, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.read(|listeners| listeners.iter().map(|l| l.name().to_string()).collect())
    }

    /// Snapshot of the listeners whose `enabled()` is currently true, in
    /// registration order.
    ///
    /// This is the list to pass to the dispatcher.
    pub fn enabled_listeners(&self) -> Vec<Arc<dyn LimitListener>> {
        self.read(|listeners| listeners.iter().filter(|l| l.enabled()).cloned().collect())
    }

    /// Number of registered listeners, enabled or not.
    pub fn len(&self) -> usize {
        self.read(Vec::len)
    }

    /// Check if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.read(Vec::is_empty)
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn read<R>(&self, f: impl FnOnce(&Vec<Arc<dyn LimitListener>>) -> R) -> R {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f(&listeners)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::RecordingListener;

    fn listener(name: &str) -> Arc<dyn LimitListener> {
        Arc::new(RecordingListener::new(name))
    }

    #[test]
    fn test_register_keeps_order() {
        let registry = ListenerRegistry::new();
        registry.register(listener("tracing"));
        registry.register(listener("metrics"));
        registry.register(listener("audit"));

        assert_eq!(registry.names(), vec!["tracing", "metrics", "audit"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_register_same_name_replaces_in_place() {
        let registry = ListenerRegistry::new();
        let original = listener("tracing");
        registry.register(Arc::clone(&original));
        registry.register(listener("metrics"));

        let replacement = listener("tracing");
        let previous = registry.register(Arc::clone(&replacement)).unwrap();

        assert!(Arc::ptr_eq(&previous, &original));
        assert_eq!(registry.names(), vec!["tracing", "metrics"]);
        assert!(Arc::ptr_eq(&registry.get("tracing").unwrap(), &replacement));
    }

    #[test]
    fn test_unregister() {
        let registry = ListenerRegistry::new();
        registry.register(listener("tracing"));
        registry.register(listener("metrics"));

        assert!(registry.unregister("tracing").is_some());
        assert!(registry.unregister("tracing").is_none());
        assert_eq!(registry.names(), vec!["metrics"]);
    }

    #[test]
    fn test_enabled_listeners_filters_disabled() {
        let registry = ListenerRegistry::new();
        let toggled = Arc::new(RecordingListener::new("toggled"));
        registry.register(listener("first"));
        registry.register(toggled.clone());
        registry.register(Arc::new(RecordingListener::new("off").disabled()));
        registry.register(listener("last"));

        let names = |list: Vec<Arc<dyn LimitListener>>| {
            list.iter().map(|l| l.name().to_string()).collect::<Vec<_>>()
        };

        assert_eq!(
            names(registry.enabled_listeners()),
            vec!["first", "toggled", "last"]
        );

        toggled.set_enabled(false);
        assert_eq!(names(registry.enabled_listeners()), vec!["first", "last"]);
    }

    #[test]
    fn test_clones_share_state() {
        let registry = ListenerRegistry::new();
        let clone = registry.clone();
        clone.register(listener("tracing"));

        assert!(!registry.is_empty());
        registry.clear();
        assert!(clone.is_empty());
    }
}
