//! Client for the REST API of a JasperReports Server.
//!
//! All requests go through [`Client::request`], which takes care of logging in when the client
//! has no session or the session has expired. Alternatively the client can be configured to
//! send credentials with every request using basic authentication.
pub mod authentication;
mod client;
mod config;
pub mod error;
pub mod reports;
pub mod request;
pub mod resources;
pub mod session;

pub use authentication::{PathMatch, SessionId};
pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, Credentials};
pub use error::{Error, Result, StatusError};
pub use request::{AuthenticatedRequest, Body, RequestOptions};
pub use session::SessionStore;
