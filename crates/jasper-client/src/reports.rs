//! Bindings for running reports, `/rest_v2/reports`, and for publishing them as report units.
use reqwest::{
    header::{HeaderValue, CONTENT_TYPE},
    Method,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    request::{AuthenticatedRequest, Body, RequestOptions},
    resources::RESOURCES_ROOT,
    Client,
};

const REPORTS_ROOT: &str = "/rest_v2/reports";
const REPORT_UNIT_CONTENT_TYPE: &str = "application/repository.reportUnit+json";

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ResourceFile {
    /// A file uploaded together with the report unit.
    FileResource {
        r#type: String,
        label: String,
        /// Base64 encoded content.
        content: String,
    },
    /// A file that already exists in the repository.
    FileReference { uri: String },
}

/// An auxiliary file, such as an image or a subreport, that a report refers to by name.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReportResource {
    pub name: String,
    pub file: ResourceFile,
}

impl ReportResource {
    /// A new file, where `content` is already base64 encoded.
    pub fn file(name: &str, r#type: &str, content: String) -> Self {
        Self {
            name: name.to_string(),
            file: ResourceFile::FileResource {
                r#type: r#type.to_string(),
                label: name.to_string(),
                content,
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReportResources {
    pub resource: Vec<ReportResource>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceReference {
    pub data_source_reference: Reference,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Reference {
    pub uri: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Jrxml {
    JrxmlFile {
        r#type: String,
        label: String,
        content: String,
    },
    JrxmlFileReference { uri: String },
}

/// A report unit as it is sent when publishing and returned by the server afterwards.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportUnit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overwrite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceReference>,
    pub jrxml: Jrxml,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ReportResources>,
}

pub struct Reports {
    client: Client,
}

pub struct RunRequestBuilder {
    client: Client,
    path: String,
    format: String,
    params: Vec<(String, String)>,
    options: RequestOptions,
}

impl RunRequestBuilder {
    /// Set an input control, e.g. `param("year", "2019")`.
    ///
    /// Multivalued controls are set by repeating the name.
    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
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
            format,
            params,
            options,
        } = self;
        let mut request =
            AuthenticatedRequest::get(format!("{REPORTS_ROOT}{path}.{format}")).options(options);
        request.query = params;
        (client, request)
    }

    /// Run the report.
    ///
    /// The body of the response is not read; use e.g. [`reqwest::Response::bytes_stream`] to
    /// stream large outputs.
    pub async fn send(self) -> Result<reqwest::Response> {
        let (client, request) = self.into_request();
        client.request(request).await
    }
}

pub struct PublishRequestBuilder {
    client: Client,
    path: String,
    current_version: Option<i64>,
    label: String,
    datasource: Option<String>,
    jrxml: String,
    resources: Vec<ReportResource>,
    options: RequestOptions,
}

impl PublishRequestBuilder {
    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// URI of the data source the report should use, e.g. `/datasources/Dummy`.
    pub fn datasource(mut self, uri: &str) -> Self {
        self.datasource = Some(uri.to_string());
        self
    }

    /// The main `.jrxml` file, already base64 encoded.
    pub fn jrxml(mut self, content: String) -> Self {
        self.jrxml = content;
        self
    }

    /// The version being replaced, when updating an existing report.
    pub fn current_version(mut self, version: i64) -> Self {
        self.current_version = Some(version);
        self
    }

    pub fn resource(mut self, resource: ReportResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    fn into_request(self) -> Result<(Client, AuthenticatedRequest)> {
        let Self {
            client,
            path,
            current_version,
            label,
            datasource,
            jrxml,
            resources,
            options,
        } = self;
        let unit = ReportUnit {
            version: current_version,
            overwrite: Some(true),
            uri: None,
            label,
            data_source: datasource.map(|uri| DataSourceReference {
                data_source_reference: Reference { uri },
            }),
            jrxml: Jrxml::JrxmlFile {
                r#type: "jrxml".to_string(),
                label: "Main jrxml".to_string(),
                content: jrxml,
            },
            resources: (!resources.is_empty()).then_some(ReportResources {
                resource: resources,
            }),
        };
        let options = options.header(
            CONTENT_TYPE,
            HeaderValue::from_static(REPORT_UNIT_CONTENT_TYPE),
        );
        let request = AuthenticatedRequest::new(Method::PUT, format!("{RESOURCES_ROOT}{path}"))
            .body(Body::Json(serde_json::to_value(&unit)?))
            .options(options);
        Ok((client, request))
    }

    /// Create or overwrite the report unit.
    ///
    /// The server answers with the stored [`ReportUnit`].
    pub async fn send(self) -> Result<reqwest::Response> {
        let (client, request) = self.into_request()?;
        client.request(request).await
    }
}

impl Reports {
    /// Run the report at `path`, e.g. `/Reports/Dummy`, producing output in `format`, e.g. `pdf`.
    pub fn run(self, path: &str, format: &str) -> RunRequestBuilder {
        RunRequestBuilder {
            client: self.client,
            path: path.to_string(),
            format: format.to_string(),
            params: Vec::new(),
            options: RequestOptions::default(),
        }
    }

    /// Upload a report consisting of a main `.jrxml` file and, optionally, auxiliary resources.
    pub fn publish(self, path: &str) -> PublishRequestBuilder {
        PublishRequestBuilder {
            client: self.client,
            path: path.to_string(),
            current_version: None,
            label: String::new(),
            datasource: None,
            jrxml: String::new(),
            resources: Vec::new(),
            options: RequestOptions::default(),
        }
    }
}

impl Client {
    pub fn reports(&self) -> Reports {
        Reports {
            client: self.clone(),
        }
    }
}
