use std::sync::Arc;

use base64::Engine;
use log::{debug, trace};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    redirect, StatusCode,
};
use url::Url;

use crate::{
    config::{ClientConfig, Credentials},
    error::{Error, Result, StatusError},
    request::{AuthenticatedRequest, Body},
    session::SessionStore,
};

fn authorization_header(username: &str, password: &str) -> Result<HeaderValue> {
    let credentials = format!("{username}:{password}");
    let auth_header = format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    );
    let mut header = HeaderValue::try_from(auth_header)
        .map_err(|e| Error::Configuration(format!("Invalid authorization header: {e}")))?;
    header.set_sensitive(true);
    Ok(header)
}

type Customization = Box<dyn Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder>;

pub struct ClientBuilder {
    config: ClientConfig,
    customizations: Vec<Customization>,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            customizations: Vec::new(),
        }
    }

    /// Customize the underlying transport, e.g. to accept self-signed certificates.
    ///
    /// Two transports are built, one that follows redirects and one that does not, so `f` may be
    /// called more than once.
    pub fn with_inner(
        mut self,
        f: impl Fn(reqwest::ClientBuilder) -> reqwest::ClientBuilder + 'static,
    ) -> Self {
        self.customizations.push(Box::new(f));
        self
    }

    fn inner(
        &self,
        session: Option<&Arc<SessionStore>>,
        policy: redirect::Policy,
    ) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut inner = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(policy);
        if let Some(session) = session {
            inner = inner.cookie_provider(Arc::clone(session));
        }
        for f in &self.customizations {
            inner = f(inner);
        }
        Ok(inner.build()?)
    }

    pub fn build(self) -> Result<Client> {
        let base_url = self.config.base_url()?;
        let authentication = if self.config.basic_auth {
            let ClientConfig {
                username, password, ..
            } = &self.config;
            Authentication::Basic(authorization_header(username, password)?)
        } else {
            Authentication::Session(Arc::new(SessionStore::new(base_url.clone())))
        };
        let session = match &authentication {
            Authentication::Basic(_) => None,
            Authentication::Session(session) => Some(session),
        };
        let client = self.inner(session, redirect::Policy::default())?;
        let no_redirect = self.inner(session, redirect::Policy::none())?;
        debug!(
            "Built client for {base_url} using {} authentication",
            match &authentication {
                Authentication::Basic(_) => "basic",
                Authentication::Session(_) => "session",
            }
        );
        Ok(Client {
            base_url,
            base_path: self.config.base_path().map(str::to_string),
            credentials: self.config.to_credentials(),
            authentication,
            client,
            no_redirect,
        })
    }
}

#[derive(Clone)]
enum Authentication {
    /// The precomputed `Authorization` header.
    Basic(HeaderValue),
    Session(Arc<SessionStore>),
}

/// The main client through which all endpoints are used.
///
/// Cloning is cheap and clones share the session.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    base_path: Option<String>,
    credentials: Credentials,
    authentication: Authentication,
    client: reqwest::Client,
    no_redirect: reqwest::Client,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The cookies of the current session, or `None` when using basic authentication.
    pub fn session(&self) -> Option<&SessionStore> {
        match &self.authentication {
            Authentication::Basic(_) => None,
            Authentication::Session(session) => Some(session),
        }
    }

    pub(crate) fn session_for(&self, operation: &'static str) -> Result<&SessionStore> {
        self.session().ok_or(Error::Mode(operation))
    }

    fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        Ok(self.base_url.join(&format!("./{path}"))?)
    }

    /// Send `request` once, without establishing a session first.
    ///
    /// Responses with a success status or `302 Found` resolve; any other status is an
    /// [`Error::Status`] carrying the response.
    pub(crate) async fn send(&self, request: &AuthenticatedRequest) -> Result<reqwest::Response> {
        let AuthenticatedRequest {
            method,
            path,
            query,
            body,
            options,
        } = request;
        let url = self.url(path)?;
        let client = if options.follow_redirects {
            &self.client
        } else {
            &self.no_redirect
        };

        let mut headers = options.headers.clone();
        if let Authentication::Basic(authorization) = &self.authentication {
            if !headers.contains_key(AUTHORIZATION) {
                headers.insert(AUTHORIZATION, authorization.clone());
            }
        }

        let mut builder = client.request(method.clone(), url.clone()).headers(headers);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        builder = match body {
            Body::Empty => builder,
            Body::Json(data) => builder.json(data),
            Body::Form(fields) => builder.form(fields),
        };
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        debug!("Sending {method} {url}");
        let response = builder.send().await?;
        let status = response.status();
        trace!("Received {status} from {url}");

        if status.is_success() || status == StatusCode::FOUND {
            Ok(response)
        } else {
            Err(Error::Status(StatusError::from_response(response).await))
        }
    }

    /// Send `request`, logging in first if needed.
    ///
    /// With basic authentication the request is sent exactly once. Otherwise an existing session
    /// is tried first; if there is none, or the server answers `401 Unauthorized`, the client
    /// logs in once and sends the request once more. Whatever the second attempt yields is
    /// returned as is, including another `401`.
    pub async fn request(&self, request: AuthenticatedRequest) -> Result<reqwest::Response> {
        let session = match &self.authentication {
            Authentication::Basic(_) => return self.send(&request).await,
            Authentication::Session(session) => session,
        };

        if !session.is_empty() {
            match self.send(&request).await {
                Err(Error::Status(e)) if e.status == StatusCode::UNAUTHORIZED => {
                    debug!("Session was rejected, logging in again");
                }
                outcome => return outcome,
            }
        }

        self.login().await?;
        self.send(&request).await
    }
}
