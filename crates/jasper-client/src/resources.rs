//! Bindings for the repository resources service, `/rest_v2/resources`.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::Result,
    request::{AuthenticatedRequest, Body, RequestOptions},
    Client,
};

pub(crate) const RESOURCES_ROOT: &str = "/rest_v2/resources";

/// Summary of a repository resource as returned when listing resources.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLookup {
    pub version: i64,
    pub permission_mask: u32,
    pub creation_date: Option<String>,
    pub update_date: Option<String>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub uri: String,
    pub resource_type: String,
}

pub struct Resources {
    client: Client,
}

pub struct ListRequestBuilder {
    client: Client,
    path: Option<String>,
    query: Vec<(String, String)>,
    body: Body,
    options: RequestOptions,
}

impl ListRequestBuilder {
    /// Restrict the listing to a folder or a single resource, e.g. `/Reports`.
    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    /// Add a search parameter such as `type=reportUnit` or `folderUri=/Reports`.
    pub fn query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.body = Body::Json(data);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    fn into_request(self) -> (Client, AuthenticatedRequest) {
        let Self {
            client,
            path,
            query,
            body,
            options,
        } = self;
        let path = format!("{RESOURCES_ROOT}{}", path.as_deref().unwrap_or_default());
        let mut request = AuthenticatedRequest::get(path).body(body).options(options);
        request.query = query;
        (client, request)
    }

    pub async fn send(self) -> Result<reqwest::Response> {
        let (client, request) = self.into_request();
        client.request(request).await
    }
}

impl Resources {
    /// List resources in the repository.
    pub fn list(self) -> ListRequestBuilder {
        ListRequestBuilder {
            client: self.client,
            path: None,
            query: Vec::new(),
            body: Body::Empty,
            options: RequestOptions::default(),
        }
    }
}

impl Client {
    pub fn resources(&self) -> Resources {
        Resources {
            client: self.clone(),
        }
    }
}
