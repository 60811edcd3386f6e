use futures_util::StreamExt;
use jasper_client::{
    reports::{ReportResource, ReportUnit},
    resources::ResourceLookup,
    Client, ClientConfig,
};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn logged_in_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jasperserver/j_spring_security_check"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header(
                    "Location",
                    "/jasperserver/scripts/auth/loginSuccess.json;jsessionid=3CF53E312EE7418CBE64363163B3CAB9",
                )
                .insert_header("Set-Cookie", "JSESSIONID=3CF53E312EE7418CBE64363163B3CAB9"),
        )
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer) -> Client {
    let address = server.address();
    Client::new(
        ClientConfig::new(address.ip().to_string())
            .port(Some(address.port()))
            .path("jasperserver")
            .credentials("username", "password"),
    )
    .unwrap()
}

#[tokio::test]
async fn list_reports_returns_lookups() -> anyhow::Result<()> {
    let server = logged_in_server().await;
    Mock::given(method("GET"))
        .and(path("/jasperserver/rest_v2/resources"))
        .and(query_param("type", "reportUnit"))
        .and(query_param("folderUri", "/Reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "version": 20,
            "permissionMask": 2,
            "creationDate": "2019-05-31T16:32:17",
            "updateDate": "2019-07-30T14:46:04",
            "label": "Dummy",
            "description": "A simple dummy report",
            "uri": "/Reports/Dummy",
            "resourceType": "reportUnit"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let lookups: Vec<ResourceLookup> = client(&server)
        .resources()
        .list()
        .query("type", "reportUnit")
        .query("folderUri", "/Reports")
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].uri, "/Reports/Dummy");
    assert_eq!(lookups[0].version, 20);
    Ok(())
}

#[tokio::test]
async fn list_with_path_targets_sub_resource() -> anyhow::Result<()> {
    let server = logged_in_server().await;
    Mock::given(method("GET"))
        .and(path("/jasperserver/rest_v2/resources/Reports/Dummy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"uri": "/Reports/Dummy"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .resources()
        .list()
        .path("/Reports/Dummy")
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    Ok(())
}

#[tokio::test]
async fn publish_new_report_returns_version_zero() -> anyhow::Result<()> {
    let server = logged_in_server().await;
    Mock::given(method("PUT"))
        .and(path("/jasperserver/rest_v2/resources/Reports/Dummy"))
        .and(header("content-type", "application/repository.reportUnit+json"))
        .and(body_partial_json(json!({
            "overwrite": true,
            "label": "Dummy Report",
            "dataSource": {"dataSourceReference": {"uri": "/datasources/Dummy"}},
            "jrxml": {"jrxmlFile": {"type": "jrxml", "label": "Main jrxml"}},
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "version": 0,
            "permissionMask": 1,
            "creationDate": "2019-11-18T21:06:19",
            "updateDate": "2019-11-18T21:06:19",
            "label": "Dummy Report",
            "uri": "/Reports/Dummy",
            "dataSource": {"dataSourceReference": {"uri": "/datasources/Dummy"}},
            "jrxml": {"jrxmlFileReference": {"uri": "/Dummy_files/Main_jrxml"}},
            "alwaysPromptControls": false,
            "controlsLayout": "popupScreen",
            "resources": {
                "resource": [
                    {"name": "img.png", "file": {"fileReference": {"uri": "/Dummy_files/img.png"}}},
                    {"name": "sub.jrxml", "file": {"fileReference": {"uri": "/Dummy_files/sub.jrxml"}}}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let unit: ReportUnit = client(&server)
        .reports()
        .publish("/Reports/Dummy")
        .label("Dummy Report")
        .datasource("/datasources/Dummy")
        .jrxml("PGphc3BlclJlcG9ydC8+".to_string())
        .resource(ReportResource::file("img.png", "img", "iVBORw0KGgo=".to_string()))
        .resource(ReportResource::file(
            "sub.jrxml",
            "jrxml",
            "PGphc3BlclJlcG9ydC8+".to_string(),
        ))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(unit.version, Some(0));
    assert_eq!(unit.resources.map(|r| r.resource.len()), Some(2));
    Ok(())
}

#[tokio::test]
async fn run_report_streams_attachment() -> anyhow::Result<()> {
    let server = logged_in_server().await;
    let pdf = b"%PDF-1.4\n%dummy\n".repeat(1024);
    Mock::given(method("GET"))
        .and(path("/jasperserver/rest_v2/reports/Reports/Dummy.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(pdf.clone(), "application/pdf")
                .insert_header("content-disposition", r#"attachment; filename="Dummy.pdf""#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .reports()
        .run("/Reports/Dummy", "pdf")
        .send()
        .await?;

    assert_eq!(
        response.headers()["content-disposition"],
        r#"attachment; filename="Dummy.pdf""#
    );
    assert_eq!(response.headers()["content-type"], "application/pdf");

    let mut stream = response.bytes_stream();
    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk?);
    }
    assert_eq!(received, pdf);
    Ok(())
}

#[tokio::test]
async fn run_report_forwards_input_controls() -> anyhow::Result<()> {
    let server = logged_in_server().await;
    Mock::given(method("GET"))
        .and(path("/jasperserver/rest_v2/reports/Reports/Dummy.csv"))
        .and(query_param("year", "2019"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("a,b\n", "text/csv"))
        .expect(1)
        .mount(&server)
        .await;

    let text = client(&server)
        .reports()
        .run("/Reports/Dummy", "csv")
        .param("year", "2019")
        .send()
        .await?
        .text()
        .await?;

    assert_eq!(text, "a,b\n");
    Ok(())
}
