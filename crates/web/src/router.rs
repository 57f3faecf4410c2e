//! Path routing for HTTP handlers.
//!
//! Paths are matched with `matchit` (`/users/{id}`, `/static/{*path}`), then the first
//! item registered for the path whose method filter accepts the request wins.

use std::collections::HashMap;

use http::Method;
use matchit::InsertError;
use thiserror::Error;
use tracing::trace;

use crate::handler::RequestHandler;
use crate::request::PathParams;

type InnerRouter<T> = matchit::Router<T>;

pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

/// A handler with the method it answers, `None` answers every method.
pub struct RouterItem {
    method: Option<Method>,
    handler: Box<dyn RequestHandler>,
}

impl std::fmt::Debug for RouterItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItem").field("method", &self.method).finish_non_exhaustive()
    }
}

pub struct RouteResult<'router> {
    handler: Option<&'router dyn RequestHandler>,
    params: PathParams,
}

impl std::fmt::Debug for RouteResult<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteResult").field("params", &self.params).finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route {path}: {source}")]
    InvalidRoute { path: String, source: InsertError },
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn at(&self, path: &str, method: &Method) -> RouteResult<'_> {
        let Ok(matched) = self.inner_router.at(path) else {
            trace!(path, "no route matched");
            return RouteResult { handler: None, params: PathParams::default() };
        };

        let handler = matched.value.iter().find(|item| item.accepts(method)).map(|item| item.handler.as_ref());
        RouteResult { handler, params: matched.params.into() }
    }
}

impl RouterItem {
    fn accepts(&self, method: &Method) -> bool {
        self.method.as_ref().is_none_or(|expected| expected == method)
    }
}

impl<'router> RouteResult<'router> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handler.is_none()
    }

    pub fn handler(&self) -> Option<&'router dyn RequestHandler> {
        self.handler
    }

    pub fn into_params(self) -> PathParams {
        self.params
    }
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    data: HashMap<String, Vec<RouterItem>>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: impl Into<String>, item: RouterItem) -> Self {
        self.data.entry(route.into()).or_default().push(item);
        self
    }

    pub fn build(self) -> Result<Router, RouterError> {
        let mut inner_router = InnerRouter::new();
        for (path, items) in self.data {
            inner_router.insert(path.clone(), items).map_err(|source| RouterError::InvalidRoute { path, source })?;
        }
        Ok(Router { inner_router })
    }
}

macro_rules! method_router_item {
    ($method:ident, $method_const:ident) => {
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> RouterItem {
            RouterItem { method: Some(Method::$method_const), handler: Box::new(handler) }
        }
    };
}

method_router_item!(get, GET);
method_router_item!(post, POST);
method_router_item!(put, PUT);
method_router_item!(delete, DELETE);
method_router_item!(patch, PATCH);

/// Answers every method.
pub fn any<H: RequestHandler + 'static>(handler: H) -> RouterItem {
    RouterItem { method: None, handler: Box::new(handler) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_fn;
    use crate::Request;

    async fn hello(_req: Request) -> &'static str {
        "hello"
    }

    fn router() -> Router {
        Router::builder()
            .route("/", get(handler_fn(hello)))
            .route("/", post(handler_fn(hello)))
            .route("/users/{id}", any(handler_fn(hello)))
            .build()
            .unwrap()
    }

    #[test]
    fn match_method() {
        let router = router();
        assert!(!router.at("/", &Method::GET).is_empty());
        assert!(!router.at("/", &Method::POST).is_empty());
        assert!(router.at("/", &Method::DELETE).is_empty());
        assert!(router.at("/missing", &Method::GET).is_empty());
    }

    #[test]
    fn capture_params() {
        let router = router();
        let result = router.at("/users/42", &Method::PUT);
        assert!(result.handler().is_some());
        assert_eq!(result.into_params().get("id"), Some("42"));
    }

    #[test]
    fn conflicting_routes_fail() {
        let result = Router::builder().route("/{a}", get(handler_fn(hello))).route("/{b}", get(handler_fn(hello))).build();
        assert!(matches!(result, Err(RouterError::InvalidRoute { .. })));
    }
}
