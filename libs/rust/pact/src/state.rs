//! Provider state hooks.
//!
//! Before an interaction is replayed against the provider, the hook
//! registered for its provider state prepares fixtures on the provider side.
//! Hooks are passed to the verifier explicitly; there is no global registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Prepares the provider for one provider state.
#[async_trait]
pub trait StateHook: Send + Sync {
    /// Bring the provider into `state`.
    ///
    /// # Errors
    ///
    /// Any error fails the interaction that required the state.
    async fn set_up(&self, state: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl<F> StateHook for F
where
    F: Fn(&str) -> anyhow::Result<()> + Send + Sync,
{
    async fn set_up(&self, state: &str) -> anyhow::Result<()> {
        self(state)
    }
}

/// State hooks keyed by provider state name.
#[derive(Clone, Default)]
pub struct StateHooks {
    hooks: HashMap<String, Arc<dyn StateHook>>,
}

impl StateHooks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` for `state`, replacing any previous hook.
    #[must_use]
    pub fn with(mut self, state: impl Into<String>, hook: impl StateHook + 'static) -> Self {
        self.register(state, hook);
        self
    }

    /// Register `hook` for `state`, replacing any previous hook.
    pub fn register(&mut self, state: impl Into<String>, hook: impl StateHook + 'static) {
        self.hooks.insert(state.into(), Arc::new(hook));
    }

    /// Register an already shared hook.
    pub fn register_shared(&mut self, state: impl Into<String>, hook: Arc<dyn StateHook>) {
        self.hooks.insert(state.into(), hook);
    }

    /// Hook for `state`.
    #[must_use]
    pub fn get(&self, state: &str) -> Option<Arc<dyn StateHook>> {
        self.hooks.get(state).cloned()
    }

    /// Whether a hook is registered for `state`.
    #[must_use]
    pub fn contains(&self, state: &str) -> bool {
        self.hooks.contains_key(state)
    }

    /// Registered state names, sorted.
    #[must_use]
    pub fn states(&self) -> Vec<&str> {
        let mut states: Vec<_> = self.hooks.keys().map(String::as_str).collect();
        states.sort_unstable();
        states
    }
}

impl fmt::Debug for StateHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHooks")
            .field("states", &self.states())
            .finish()
    }
}
