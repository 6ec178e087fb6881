//! Ordered handler chains, one per request stage.
//!
//! A service client composes its behaviour by pushing named handlers onto
//! the stage lists of its [`Handlers`]. Each request gets its own copy of the
//! client's chain, so request-init hooks can alter a single request without
//! touching the client.

use crate::request::Request;
use std::fmt;
use std::sync::Arc;

/// Callback signature shared by every stage.
pub type HandlerFn = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// A handler with a stable name, so it can be located and removed later.
#[derive(Clone)]
pub struct NamedHandler {
    pub name: &'static str,
    pub func: HandlerFn,
}

impl NamedHandler {
    pub fn new<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        Self {
            name,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for NamedHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedHandler").field(&self.name).finish()
    }
}

/// Handlers run in list order. The first handler to put an error on a
/// clean request stops the list; lists that start out with an error (the
/// unmarshal-error and retry stages) always run to the end.
#[derive(Debug, Clone, Default)]
pub struct HandlerList {
    list: Vec<NamedHandler>,
}

impl HandlerList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back_named(&mut self, handler: NamedHandler) {
        self.list.push(handler);
    }

    pub fn push_front_named(&mut self, handler: NamedHandler) {
        self.list.insert(0, handler);
    }

    /// Append an unnamed handler.
    pub fn push_back<F>(&mut self, func: F)
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.push_back_named(NamedHandler::new("", func));
    }

    pub fn push_front<F>(&mut self, func: F)
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.push_front_named(NamedHandler::new("", func));
    }

    /// Remove every handler called `name`. Returns how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.list.len();
        self.list.retain(|h| h.name != name);
        before - self.list.len()
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.list.iter().map(|h| h.name).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.list.iter().any(|h| h.name == name)
    }

    pub fn run(&self, request: &mut Request) {
        let had_error = request.error.is_some();
        for handler in &self.list {
            (handler.func)(request);
            if !had_error && request.error.is_some() {
                log::trace!("handler '{}' stopped the chain", handler.name);
                break;
            }
        }
    }
}

/// The stage lists of a request pipeline, in execution order.
#[derive(Debug, Clone, Default)]
pub struct Handlers {
    pub validate: HandlerList,
    pub build: HandlerList,
    pub sign: HandlerList,
    pub validate_response: HandlerList,
    pub unmarshal: HandlerList,
    pub unmarshal_meta: HandlerList,
    pub unmarshal_error: HandlerList,
    pub retry: HandlerList,
    pub after_retry: HandlerList,
    pub complete: HandlerList,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.validate.clear();
        self.build.clear();
        self.sign.clear();
        self.validate_response.clear();
        self.unmarshal.clear();
        self.unmarshal_meta.clear();
        self.unmarshal_error.clear();
        self.retry.clear();
        self.after_retry.clear();
        self.complete.clear();
    }
}
