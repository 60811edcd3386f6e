use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

fn default_protocol() -> String {
    "http".to_string()
}

/// Everything needed to reach and authenticate with a server.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Either `http` or `https`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    /// Deployment prefix preceding all routes, e.g. `jasperserver`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Send credentials on every request instead of establishing a session.
    #[serde(default)]
    pub basic_auth: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            host: String::new(),
            port: None,
            path: None,
            username: String::new(),
            password: String::new(),
            basic_auth: false,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::Configuration(e.to_string()))
    }

    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.username = username.to_string();
        self.password = password.to_string();
        self
    }

    pub fn basic_auth(mut self, basic_auth: bool) -> Self {
        self.basic_auth = basic_auth;
        self
    }

    /// The base path without surrounding slashes, or `None` if there is none.
    pub fn base_path(&self) -> Option<&str> {
        self.path
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
    }

    /// Validate the configuration and compose `{protocol}://{host}[:{port}]/[{path}/]`.
    pub fn base_url(&self) -> Result<Url> {
        let Self {
            protocol,
            host,
            port,
            ..
        } = self;
        if !matches!(protocol.as_str(), "http" | "https") {
            return Err(Error::Configuration(format!(
                "Expected protocol http or https but got {protocol:?}"
            )));
        }
        if host.is_empty() {
            return Err(Error::Configuration("Host is required".to_string()));
        }
        let mut url = match port {
            Some(port) => format!("{protocol}://{host}:{port}/"),
            None => format!("{protocol}://{host}/"),
        };
        if let Some(path) = self.base_path() {
            url.push_str(path);
            url.push('/');
        }
        Url::parse(&url)
            .map_err(|e| Error::Configuration(format!("{url:?} is not a valid URL: {e}")))
    }

    pub fn to_credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("path", &self.path)
            .field("username", &self.username)
            .field("basic_auth", &self.basic_auth)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
