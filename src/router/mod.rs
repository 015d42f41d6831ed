//! The routing tree and middleware chain.
//!
//! A router is an ordered list of rules `(method, pattern, handler)`. A
//! handler is either an async callback or a nested sub-router evaluated
//! against the wildcard remainder at its match point. Dispatch walks the
//! rules in registration order, awaiting each matching callback in turn;
//! a callback returning `false` short-circuits the whole chain.

use std::fmt;

use futures_core::future::BoxFuture;

use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::Result;

pub mod pattern;

pub use self::pattern::{PathMatch, Pattern};

use self::pattern::clean;

/// A boxed route callback.
///
/// The return value steers the chain: `true` continues with the next
/// matching rule, `false` stops dispatch for this request. Errors abort
/// the chain through a separate channel entirely.
pub type Callback = Box<
    dyn for<'a> Fn(&'a PathMatch, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<bool>>
        + Send
        + Sync,
>;

/// What a route rule runs when it matches.
pub enum Handler {
    /// An async callback.
    Callback(Callback),
    /// A nested router, dispatched on the wildcard remainder (or the full
    /// path when the rule pattern has no wildcard).
    Router(Router),
}

impl Handler {
    /// Wraps a callback closure as a handler.
    pub fn from_fn<F>(callback: F) -> Handler
    where
        F: for<'a> Fn(&'a PathMatch, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<bool>>
            + Send
            + Sync
            + 'static,
    {
        Handler::Callback(Box::new(callback))
    }
}

impl From<Router> for Handler {
    fn from(router: Router) -> Handler {
        Handler::Router(router)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Callback(_) => f.write_str("Handler::Callback"),
            Handler::Router(router) => f.debug_tuple("Handler::Router").field(router).finish(),
        }
    }
}

struct Rule {
    method: Option<Method>,
    pattern: Pattern,
    handler: Handler,
}

impl Rule {
    fn accepts(&self, method: Method) -> bool {
        match self.method {
            None => true,
            Some(m) if m == method => true,
            // HEAD aliases GET; the writer suppresses the body.
            Some(Method::Get) if method == Method::Head => true,
            Some(_) => false,
        }
    }
}

/// An ordered routing tree.
#[derive(Default)]
pub struct Router {
    rules: Vec<Rule>,
}

macro_rules! verb_methods {
    (
        $(
            ($name:ident, $method:ident, $doc:expr);
        )+
    ) => {
        $(
            #[doc = $doc]
            pub fn $name<F>(&mut self, pattern: &str, callback: F) -> Result<&mut Router>
            where
                F: for<'a> Fn(
                        &'a PathMatch,
                        &'a mut Request,
                        &'a mut Response,
                    ) -> BoxFuture<'a, Result<bool>>
                    + Send
                    + Sync
                    + 'static,
            {
                self.register(Some(Method::$method), pattern, Handler::from_fn(callback))
            }
        )+
    }
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Router {
        Router::default()
    }

    /// Appends a rule. `None` for the method matches every verb.
    ///
    /// Pattern compilation failures (bad parameter names, misplaced
    /// wildcards) surface here, before the route ever runs.
    pub fn register(
        &mut self,
        method: Option<Method>,
        pattern: &str,
        handler: impl Into<Handler>,
    ) -> Result<&mut Router> {
        let pattern = Pattern::compile(pattern)?;
        self.rules.push(Rule {
            method,
            pattern,
            handler: handler.into(),
        });
        Ok(self)
    }

    verb_methods! {
        (get, Get, "Registers a `GET` callback (also matched by `HEAD`).");
        (put, Put, "Registers a `PUT` callback.");
        (post, Post, "Registers a `POST` callback.");
        (head, Head, "Registers a `HEAD` callback.");
        (delete, Delete, "Registers a `DELETE` callback.");
        (connect, Connect, "Registers a `CONNECT` callback.");
        (options, Options, "Registers an `OPTIONS` callback.");
        (trace, Trace, "Registers a `TRACE` callback.");
        (patch, Patch, "Registers a `PATCH` callback.");
    }

    /// Registers a callback for every method on a pattern.
    pub fn any<F>(&mut self, pattern: &str, callback: F) -> Result<&mut Router>
    where
        F: for<'a> Fn(&'a PathMatch, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<bool>>
            + Send
            + Sync
            + 'static,
    {
        self.register(None, pattern, Handler::from_fn(callback))
    }

    /// Registers a middleware: every method, pattern `*`.
    pub fn middleware<F>(&mut self, callback: F) -> Result<&mut Router>
    where
        F: for<'a> Fn(&'a PathMatch, &'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<bool>>
            + Send
            + Sync
            + 'static,
    {
        self.register(None, "*", Handler::from_fn(callback))
    }

    /// Mounts a sub-router under a pattern (any method). With a trailing
    /// wildcard the sub-router dispatches on the remainder.
    pub fn mount(&mut self, pattern: &str, router: Router) -> Result<&mut Router> {
        self.register(None, pattern, router)
    }

    /// The number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Dispatches the middleware chain for a request against its URI path.
    ///
    /// Returns `false` when some callback short-circuited the chain.
    pub async fn handle(&self, req: &mut Request, res: &mut Response) -> Result<bool> {
        let path = req.uri().path().to_owned();
        self.dispatch(&path, req, res).await
    }

    /// Dispatches against an explicit path, overriding the request URI.
    /// Virtual-host middleware uses this to reroute without rewriting the
    /// request.
    pub async fn handle_path(
        &self,
        path: &str,
        req: &mut Request,
        res: &mut Response,
    ) -> Result<bool> {
        self.dispatch(path, req, res).await
    }

    fn dispatch<'a>(
        &'a self,
        path: &'a str,
        req: &'a mut Request,
        res: &'a mut Response,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let cleaned = clean(path);
            for rule in &self.rules {
                if !rule.accepts(req.method()) {
                    continue;
                }
                let matched = match rule.pattern.matches(&cleaned) {
                    Some(m) => m,
                    None => continue,
                };
                match &rule.handler {
                    Handler::Callback(callback) => {
                        log::trace!("route {} matched {}", rule.pattern, cleaned);
                        if !callback(&matched, &mut *req, &mut *res).await? {
                            return Ok(false);
                        }
                    }
                    Handler::Router(sub) => {
                        let sub_path = matched.remainder().unwrap_or(cleaned.as_str());
                        if !sub.dispatch(sub_path, &mut *req, &mut *res).await? {
                            return Ok(false);
                        }
                    }
                }
            }
            Ok(true)
        })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("rules", &self.rules.len())
            .finish()
    }
}
