//! Facilities for establishing and ending a cookie-based session.
//!
//! Logging in posts the credentials to the security check and expects to be redirected to a
//! landing page. The server redirects to the same kind of page whether or not the credentials
//! were accepted, so success is only reported when the session cookie was set and the redirect
//! points at one of the known landing pages.

use std::fmt::Formatter;

use log::{debug, info};
use regex::{Captures, Regex};
use reqwest::{header::LOCATION, Method, StatusCode};

use crate::{
    config::Credentials,
    error::{Error, Result, StatusError},
    request::{AuthenticatedRequest, Body, RequestOptions},
    Client,
};

const LOGIN_PATH: &str = "/j_spring_security_check";
const LOGOUT_PATH: &str = "/logout.html";
const SESSION_COOKIE: &str = "JSESSIONID";

/// Paths, relative to the base path, that the server redirects to after a successful login.
///
/// The path differs between major versions; newer versions go last.
const LANDING_PATHS: &[&str] = &[
    r"^/scripts/auth/loginSuccess\.json",
    r"^/scripts/bower_components/js-sdk/src/common/auth/loginSuccess\.json",
    r"^/scripts/runtime_dependencies/js-sdk/src/common/auth/loginSuccess\.json",
];

pub fn landing_path_patterns() -> Vec<Regex> {
    LANDING_PATHS
        .iter()
        .map(|p| Regex::new(p).expect("Literal is valid regex"))
        .collect()
}

/// The value of the session cookie issued on a successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The first pattern that matched a path, and what it captured.
#[derive(Debug)]
pub struct PathMatch<'p, 'h> {
    pub pattern: &'p Regex,
    pub captures: Captures<'h>,
}

impl Client {
    /// Match `path` against each of `patterns` after removing the base path.
    ///
    /// Returns `None` if `path` is not under the base path or if no pattern matches.
    pub fn match_path<'p, 'h>(
        &self,
        path: &'h str,
        patterns: &'p [Regex],
    ) -> Option<PathMatch<'p, 'h>> {
        let path = match self.base_path() {
            Some(base_path) => {
                let rest = path.strip_prefix('/')?.strip_prefix(base_path)?;
                if !rest.is_empty() && !rest.starts_with('/') {
                    return None;
                }
                rest
            }
            None => path,
        };
        patterns.iter().find_map(|pattern| {
            pattern
                .captures(path)
                .map(|captures| PathMatch { pattern, captures })
        })
    }

    /// Log in using the credentials the client was configured with.
    ///
    /// It is seldom necessary to call this directly since [`Client::request`] logs in as needed.
    pub async fn login(&self) -> Result<SessionId> {
        let credentials = self.credentials().clone();
        self.login_with(&credentials).await
    }

    /// Log in, replacing any existing session.
    pub async fn login_with(&self, credentials: &Credentials) -> Result<SessionId> {
        let session = self.session_for("login")?;
        session.clear();

        let Credentials { username, password } = credentials;
        let request = AuthenticatedRequest::new(Method::POST, LOGIN_PATH)
            .body(Body::Form(vec![
                ("j_username".to_string(), username.clone()),
                ("j_password".to_string(), password.clone()),
            ]))
            .options(RequestOptions::default().follow_redirects(false));

        debug!("Logging in as {username}");
        let response = match self.send(&request).await {
            Ok(response) => response,
            Err(Error::Status(e)) => {
                debug!("Login was answered with {}", e.status);
                session.clear();
                return Err(Error::LoginFailed);
            }
            Err(e) => return Err(e),
        };

        if response.status() != StatusCode::FOUND {
            debug!("Login was answered with {}", response.status());
            session.clear();
            return Err(Error::LoginFailed);
        }

        let cookie = session.get(SESSION_COOKIE).filter(|v| !v.is_empty());
        let landing = response
            .headers()
            .get(LOCATION)
            .and_then(|l| l.to_str().ok())
            .and_then(|l| self.base_url().join(l).ok());
        let patterns = landing_path_patterns();
        let landed = landing
            .as_ref()
            .and_then(|url| self.match_path(url.path(), &patterns))
            .is_some();

        match cookie {
            Some(value) if landed => {
                info!("Logged in as {username}");
                Ok(SessionId(value))
            }
            _ => {
                session.clear();
                Err(Error::LoginFailed)
            }
        }
    }

    /// End the current session.
    pub async fn logout(&self) -> Result<reqwest::Response> {
        let session = self.session_for("logout")?;
        let response = self.send(&AuthenticatedRequest::get(LOGOUT_PATH)).await?;
        if response.status() == StatusCode::OK {
            session.clear();
            info!("Logged out");
            Ok(response)
        } else {
            Err(Error::Status(StatusError::from_response(response).await))
        }
    }
}
