//! Description of a single request, independent of how it is authenticated.
//!
//! An [`AuthenticatedRequest`] is plain data so that it can be sent again after logging in.

use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use serde_json::Value;

#[derive(Clone, Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Transport options passed through to the underlying client untouched.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    pub timeout: Option<Duration>,
    /// When `false`, redirects are returned to the caller instead of being followed.
    pub follow_redirects: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: HeaderMap::new(),
            timeout: None,
            follow_redirects: true,
        }
    }
}

impl RequestOptions {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, follow_redirects: bool) -> Self {
        self.follow_redirects = follow_redirects;
        self
    }
}

#[derive(Clone, Debug)]
pub struct AuthenticatedRequest {
    pub method: Method,
    /// Relative to the base path, e.g. `/rest_v2/resources`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
    pub options: RequestOptions,
}

impl AuthenticatedRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
            options: RequestOptions::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}
