//! Action name to handler table.

use crate::{
    CommandHandler, FnHandler, HandlerResult, Params, RegistryError, RegistryResult, Target,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Collects handlers at startup. Call [`build`](Self::build) to freeze it.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `action`, reporting duplicates as an error.
    pub fn try_register<H>(&mut self, action: &str, handler: H) -> RegistryResult<()>
    where
        H: CommandHandler + 'static,
    {
        if action.trim().is_empty() {
            return Err(RegistryError::InvalidActionName(action.to_string()));
        }
        if self.handlers.contains_key(action) {
            return Err(RegistryError::DuplicateAction(action.to_string()));
        }
        self.handlers.insert(action.to_string(), Arc::new(handler));
        Ok(())
    }

    /// Register `handler` for `action`.
    ///
    /// # Panics
    ///
    /// Panics if `action` is blank or already registered. Both are wiring
    /// mistakes in the startup code, not runtime conditions.
    pub fn register<H>(mut self, action: &str, handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        if let Err(err) = self.try_register(action, handler) {
            panic!("handler registration failed: {}", err);
        }
        self
    }

    /// Register a closure for `action`. Same panics as [`register`](Self::register).
    pub fn register_fn<F>(self, action: &str, handler: F) -> Self
    where
        F: Fn(&Params, &Target) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(action, FnHandler(handler))
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

/// Immutable action name to handler table.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    /// Look up the handler for `action`.
    pub fn resolve(&self, action: &str) -> RegistryResult<Arc<dyn CommandHandler>> {
        self.handlers
            .get(action)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownAction(action.to_string()))
    }

    pub fn contains(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("actions", &self.actions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HandlerError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok(_: &Params, _: &Target) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn resolve_returns_registered_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let registry = HandlerRegistry::builder()
            .register_fn("count", move |params: &Params, _target: &Target| {
                assert_eq!(params["n"], json!(1));
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build();

        let mut params = Params::new();
        params.insert("n".into(), json!(1));
        registry
            .resolve("count")
            .unwrap()
            .handle(&params, &Target::new())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolve_unknown_action_is_an_error() {
        let registry = HandlerRegistry::builder().register_fn("noop", ok).build();

        let err = registry.resolve("spawn_object").err().unwrap();
        assert_eq!(err, RegistryError::UnknownAction("spawn_object".into()));
        assert!(registry.resolve("NOOP").is_err());
    }

    #[test]
    fn try_register_rejects_duplicates_and_blank_names() {
        let mut builder = HandlerRegistryBuilder::new();
        builder.try_register("noop", FnHandler(ok)).unwrap();

        assert_eq!(
            builder.try_register("noop", FnHandler(ok)),
            Err(RegistryError::DuplicateAction("noop".into()))
        );
        assert_eq!(
            builder.try_register("  ", FnHandler(ok)),
            Err(RegistryError::InvalidActionName("  ".into()))
        );
        assert_eq!(builder.build().len(), 1);
    }

    #[test]
    #[should_panic(expected = "Action already registered: noop")]
    fn register_panics_on_duplicate() {
        let _ = HandlerRegistry::builder()
            .register_fn("noop", ok)
            .register_fn("noop", ok);
    }

    #[test]
    fn actions_are_sorted_and_debug_lists_them() {
        let registry = HandlerRegistry::builder()
            .register_fn("zeta", ok)
            .register_fn("alpha", |_: &Params, _: &Target| {
                Err(HandlerError::Failed("nope".into()))
            })
            .build();

        assert_eq!(registry.actions(), vec!["alpha", "zeta"]);
        assert!(registry.contains("alpha"));
        assert!(!registry.is_empty());
        assert_eq!(
            format!("{:?}", registry),
            r#"HandlerRegistry { actions: ["alpha", "zeta"] }"#
        );
    }
}
