//! Errors surfaced by the client.

use std::fmt::{Display, Formatter};

use log::debug;
use reqwest::{header::HeaderMap, StatusCode};

/// A response that was received but carried a status the client does not treat as success.
///
/// The body is read eagerly so that the error can outlive the connection. A body that cannot be
/// read is left empty so that the status is never lost.
#[derive(Debug)]
pub struct StatusError {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl StatusError {
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Could not read body of {status} response: {e}");
                String::new()
            }
        };
        Self {
            status,
            headers,
            body,
        }
    }
}

impl Display for StatusError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Self { status, body, .. } = self;
        if body.is_empty() {
            write!(f, "{status}")
        } else {
            write!(f, "{status}: {body}")
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    /// No response was received.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Request failed with status {0}")]
    Status(StatusError),
    /// Deliberately says nothing about why; bad credentials and a failed sanity check look the same.
    #[error("Failed to log in")]
    LoginFailed,
    #[error("{0} is not available when using basic authentication")]
    Mode(&'static str),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The status of the response that caused this error, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(e) => Some(e.status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
