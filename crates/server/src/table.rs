//! Per-extension route tables.
//!
//! A route maps an endpoint (path without the leading slash) to an async
//! handler plus the HTTP method it accepts and the operation's default
//! `<OP>_FAILED` error code. The router holds the table by reference; no
//! handler-class factories or shared mutable state.

use agentworld_core::{HandlerResult, RequestData};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;

/// HTTP method a route accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
}

impl RouteMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
        }
    }
}

/// Async route handler: decoded request data in, envelope-or-error out.
pub type RouteHandler =
    Arc<dyn Fn(RequestData) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// One registered route.
#[derive(Clone)]
pub struct Route {
    pub method: RouteMethod,
    /// Default `<OP>_FAILED` code for unexpected handler failures.
    pub default_error_code: String,
    pub handler: RouteHandler,
}

/// Endpoint → route mapping for one extension.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a GET route.
    pub fn get<F>(mut self, endpoint: &str, default_error_code: &str, handler: F) -> Self
    where
        F: Fn(RequestData) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static,
    {
        self.insert(endpoint, RouteMethod::Get, default_error_code, handler);
        self
    }

    /// Register a POST route.
    pub fn post<F>(mut self, endpoint: &str, default_error_code: &str, handler: F) -> Self
    where
        F: Fn(RequestData) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static,
    {
        self.insert(endpoint, RouteMethod::Post, default_error_code, handler);
        self
    }

    fn insert<F>(&mut self, endpoint: &str, method: RouteMethod, default_error_code: &str, handler: F)
    where
        F: Fn(RequestData) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static,
    {
        self.routes.insert(
            endpoint.trim_matches('/').to_string(),
            Route {
                method,
                default_error_code: default_error_code.to_string(),
                handler: Arc::new(handler),
            },
        );
    }

    pub fn lookup(&self, endpoint: &str) -> Option<&Route> {
        self.routes.get(endpoint)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn registration_and_lookup() {
        let table = RouteTable::new()
            .get("camera/status", "CAMERA_STATUS_FAILED", |_data| {
                Box::pin(async { Ok(json!({"success": true})) })
            })
            .post("camera/set_position", "SET_CAMERA_POSITION_FAILED", |_data| {
                Box::pin(async { Ok(json!({"success": true})) })
            });

        assert_eq!(table.len(), 2);
        let route = table.lookup("camera/status").unwrap();
        assert_eq!(route.method, RouteMethod::Get);
        assert_eq!(route.default_error_code, "CAMERA_STATUS_FAILED");
        assert!(table.lookup("camera/unknown").is_none());
    }

    #[test]
    fn endpoints_are_stored_without_slashes() {
        let table = RouteTable::new().get("/health/extra/", "X_FAILED", |_| {
            Box::pin(async { Ok(json!({})) })
        });
        assert!(table.lookup("health/extra").is_some());
    }
}
