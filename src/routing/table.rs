//! Declarative route lists and the compiled route table.
//!
//! # Design Decisions
//! - `RouteSet` keeps registration order; it is the only input to compilation
//! - The compiled table is immutable and shared via `Arc` by the dispatcher
//! - Path templates keep the position of their first registration

use std::collections::HashMap;
use std::future::Future;

use axum::body::Body;
use axum::http::{Method, Request};
use thiserror::Error;

use crate::routing::handler::{Handler, HandlerContext, HandlerResult};
use crate::routing::matcher::{Params, PathPattern, PatternError};
use crate::routing::method::{MethodSlot, RouteKey, RouteMethod};

/// Errors raised while compiling a route set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route `{key}`: {source}")]
    Pattern {
        key: String,
        #[source]
        source: PatternError,
    },
}

/// An ordered list of `(route key, handler)` pairs.
pub struct RouteSet<S> {
    entries: Vec<(String, Handler<S>)>,
}

impl<S> Default for RouteSet<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: Send + 'static> RouteSet<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async closure under a route key such as `GET@/users/:id`.
    pub fn route<F, Fut>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(Request<Body>, HandlerContext<S>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handler(key, Handler::new(f))
    }

    /// Register an already constructed handler.
    pub fn handler(mut self, key: impl Into<String>, handler: Handler<S>) -> Self {
        self.entries.push((key.into(), handler));
        self
    }

    /// Append every entry of `other` after the entries of `self`.
    pub fn merge(mut self, other: RouteSet<S>) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

/// One path template and the handlers registered for it.
pub struct RouteEntry<S> {
    pattern: PathPattern,
    methods: Vec<(MethodSlot, Handler<S>)>,
}

impl<S> RouteEntry<S> {
    pub fn template(&self) -> &str {
        self.pattern.template()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The explicit handler for `method`, falling back to the "any" handler.
    pub fn handler_for(&self, method: &Method) -> Option<&Handler<S>> {
        self.slot(|slot| matches!(slot, MethodSlot::Method(m) if m.matches(method)))
            .or_else(|| self.slot(|slot| *slot == MethodSlot::Any))
    }

    /// Explicitly registered methods, in registration order.
    pub fn known_methods(&self) -> Vec<RouteMethod> {
        self.methods
            .iter()
            .filter_map(|(slot, _)| slot.method())
            .collect()
    }

    fn slot(&self, pred: impl Fn(&MethodSlot) -> bool) -> Option<&Handler<S>> {
        self.methods
            .iter()
            .find(|(slot, _)| pred(slot))
            .map(|(_, handler)| handler)
    }

    fn insert(&mut self, slot: MethodSlot, handler: Handler<S>) {
        match self.methods.iter_mut().find(|(s, _)| *s == slot) {
            Some(existing) => existing.1 = handler,
            None => self.methods.push((slot, handler)),
        }
    }
}

/// The compiled, immutable route table.
pub struct RouteTable<S> {
    entries: Vec<RouteEntry<S>>,
}

impl<S> RouteTable<S> {
    /// Compile a route set. Keys are split and templates parsed exactly once.
    pub fn compile(routes: RouteSet<S>) -> Result<Self, RouteError> {
        let mut entries: Vec<RouteEntry<S>> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (key, handler) in routes.entries {
            let RouteKey { slot, path } = RouteKey::parse(&key);

            let position = match index.get(&path) {
                Some(&i) => i,
                None => {
                    let pattern = PathPattern::parse(&path).map_err(|source| RouteError::Pattern {
                        key: key.clone(),
                        source,
                    })?;
                    entries.push(RouteEntry {
                        pattern,
                        methods: Vec::new(),
                    });
                    index.insert(path, entries.len() - 1);
                    entries.len() - 1
                }
            };

            tracing::debug!(route = %key, method = %slot, "Route registered");
            entries[position].insert(slot, handler);
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RouteEntry<S>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
