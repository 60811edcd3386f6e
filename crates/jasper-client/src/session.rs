//! Cookie storage for cookie-based sessions.
//!
//! The store is installed as the cookie provider of the underlying transport, so cookies set by
//! the server are captured and sent back without the caller doing anything. Cookies are keyed by
//! name and path, and only accepted from, and sent to, URLs under the base URL of the client.
//! Cookies past their `Max-Age` or `Expires` do not count towards the session.

use std::{
    sync::{PoisonError, RwLock},
    time::{Duration, SystemTime},
};

use log::trace;
use reqwest::{cookie::CookieStore, header::HeaderValue};
use url::Url;

#[derive(Clone, Debug)]
struct Cookie {
    name: String,
    value: String,
    path: String,
    expires: Option<SystemTime>,
}

impl Cookie {
    fn is_expired(&self, now: SystemTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Whether the cookie should be sent to `path`, per RFC 6265 section 5.1.4.
    fn path_matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.path.as_str()) {
            Some(rest) => rest.is_empty() || self.path.ends_with('/') || rest.starts_with('/'),
            None => false,
        }
    }
}

/// The directory of `url`, used when a cookie does not specify a path.
fn default_path(url: &Url) -> String {
    match url.path().rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => url.path()[..i].to_string(),
    }
}

/// Parse a `Set-Cookie` header received from `url`.
///
/// `Max-Age` takes precedence over `Expires`; a cookie whose lifetime has already ended is
/// returned with an expiry in the past.
fn parse_set_cookie(header: &str, url: &Url, now: SystemTime) -> Option<Cookie> {
    let parsed = cookie::Cookie::parse(header).ok()?;
    let path = parsed
        .path()
        .filter(|p| p.starts_with('/'))
        .map(str::to_string)
        .unwrap_or_else(|| default_path(url));
    let expires = match (parsed.max_age(), parsed.expires_datetime()) {
        (Some(max_age), _) => match u64::try_from(max_age.whole_seconds()) {
            Ok(seconds) if seconds > 0 => now.checked_add(Duration::from_secs(seconds)),
            _ => Some(SystemTime::UNIX_EPOCH),
        },
        (None, Some(expires)) => Some(SystemTime::from(expires)),
        (None, None) => None,
    };
    Some(Cookie {
        name: parsed.name().to_string(),
        value: parsed.value_trimmed().to_string(),
        path,
        expires,
    })
}

pub struct SessionStore {
    scope: Url,
    cookies: RwLock<Vec<Cookie>>,
}

impl SessionStore {
    pub fn new(scope: Url) -> Self {
        Self {
            scope,
            cookies: RwLock::new(Vec::new()),
        }
    }

    fn in_scope(&self, url: &Url) -> bool {
        url.origin() == self.scope.origin() && url.path().starts_with(self.scope.path())
    }

    /// Forget every cookie.
    pub fn clear(&self) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Store the cookies from `Set-Cookie` headers received from `url`.
    ///
    /// Headers from URLs outside the scope of the store are ignored. A cookie replaces any cookie
    /// with the same name and path; an expired one, or one with an empty value, removes it.
    pub fn add_from_response<'a>(
        &self,
        headers: impl Iterator<Item = &'a HeaderValue>,
        url: &Url,
    ) {
        if !self.in_scope(url) {
            trace!("Ignoring cookies from {url} since it is outside {}", self.scope);
            return;
        }
        let now = SystemTime::now();
        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        for header in headers {
            let Some(cookie) = header
                .to_str()
                .ok()
                .and_then(|h| parse_set_cookie(h, url, now))
            else {
                continue;
            };
            let removed = cookie.value.is_empty() || cookie.is_expired(now);
            let existing = cookies
                .iter()
                .position(|c| c.name == cookie.name && c.path == cookie.path);
            match (existing, removed) {
                (Some(i), true) => {
                    trace!("Removing cookie {}", cookie.name);
                    cookies.remove(i);
                }
                (Some(i), false) => cookies[i] = cookie,
                (None, true) => {}
                (None, false) => cookies.push(cookie),
            }
        }
        cookies.retain(|c| !c.is_expired(now));
    }

    /// The value of the first unexpired cookie named `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        let now = SystemTime::now();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.name == name && !c.is_expired(now))
            .map(|c| c.value.clone())
    }

    /// The number of unexpired cookies.
    pub fn len(&self) -> usize {
        let now = SystemTime::now();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| !c.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CookieStore for SessionStore {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.add_from_response(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        if !self.in_scope(url) {
            return None;
        }
        let now = SystemTime::now();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let header = cookies
            .iter()
            .filter(|c| !c.is_expired(now) && c.path_matches(url.path()))
            .map(|Cookie { name, value, .. }| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("scope", &self.scope.as_str())
            .field("len", &self.len())
            .finish()
    }
}
