//! Action Binding and Registry
//!
//! Actions are the business-logic leaves of a workflow. Each one is a
//! run-guard plus an execute operation, bound against the run context type
//! `C`. Layouts reference actions by stable string ids; the registry maps
//! each id to a factory and is consulted once, at layout-build time, so an
//! unresolved reference is a definition error long before any run starts.

use std::collections::HashMap;

/// A unit of work executed by an action node.
///
/// `should_run` is evaluated once per run with the shared context; when it
/// returns false the node is skipped and treated as immediately complete.
/// `execute` runs synchronously on whichever worker thread reaches the node
/// and is expected to contain its own failures; anything that escapes is
/// caught at the node boundary and recorded without stopping the run.
///
/// The context is shared, unsynchronized, mutable state: concurrent
/// mutation discipline belongs to action implementations (interior
/// mutability as they see fit), not to the engine.
pub trait Action<C>: Send + Sync {
    /// Decides whether the action should run for this context.
    fn should_run(&self, _context: &C) -> bool {
        true
    }

    /// Performs the action's work.
    fn execute(&self, context: &C);
}

/// Any `Fn(&C)` closure is an action with the default always-run guard.
impl<C, F> Action<C> for F
where
    F: Fn(&C) + Send + Sync,
{
    fn execute(&self, context: &C) {
        self(context)
    }
}

/// Factory producing a fresh action binding for one action node.
pub type ActionFactory<C> = Box<dyn Fn() -> Box<dyn Action<C>> + Send + Sync>;

/// Maps stable action ids to factories.
///
/// Every action id a layout references must be registered before the
/// workflow is initialized.
pub struct ActionRegistry<C> {
    factories: HashMap<String, ActionFactory<C>>,
}

impl<C> ActionRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registers a factory under an action id.
    ///
    /// Re-registering an id replaces the previous factory.
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Action<C>> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
    }

    /// Registers a bare execute closure under an action id.
    pub fn register_fn<F>(&mut self, id: impl Into<String>, action: F)
    where
        F: Fn(&C) + Send + Sync + Clone + 'static,
        C: 'static,
    {
        self.register(id, move || Box::new(action.clone()));
    }

    /// Produces an action binding for the given id, if registered.
    pub fn resolve(&self, id: &str) -> Option<Box<dyn Action<C>>> {
        self.factories.get(id).map(|factory| factory())
    }

    /// Returns true if the id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Returns the registered action ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered actions.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no actions are registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<C> Default for ActionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Guarded {
        allow: bool,
        ran: Arc<AtomicBool>,
    }

    impl Action<()> for Guarded {
        fn should_run(&self, _context: &()) -> bool {
            self.allow
        }

        fn execute(&self, _context: &()) {
            self.ran.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry: ActionRegistry<()> = ActionRegistry::new();
        registry.register_fn("noop", |_ctx: &()| {});

        assert!(registry.contains("noop"));
        assert!(registry.resolve("noop").is_some());
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_closure_is_action_with_default_guard() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let action = move |_ctx: &()| {
            counter.fetch_add(1, Ordering::SeqCst);
        };

        assert!(action.should_run(&()));
        action.execute(&());
        action.execute(&());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_custom_guard() {
        let ran = Arc::new(AtomicBool::new(false));
        let action = Guarded {
            allow: false,
            ran: Arc::clone(&ran),
        };

        assert!(!action.should_run(&()));
        // The scheduler would skip execute entirely; exercise the pair.
        if action.should_run(&()) {
            action.execute(&());
        }
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_factory_produces_fresh_binding_per_call() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut registry: ActionRegistry<()> = ActionRegistry::new();
        let counter = Arc::clone(&built);
        registry.register("counted", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(|_ctx: &()| {})
        });

        let _a = registry.resolve("counted").unwrap();
        let _b = registry.resolve("counted").unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ids_sorted() {
        let mut registry: ActionRegistry<()> = ActionRegistry::new();
        registry.register_fn("b", |_ctx: &()| {});
        registry.register_fn("a", |_ctx: &()| {});

        assert_eq!(registry.ids(), vec!["a", "b"]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }
}
