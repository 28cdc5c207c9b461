//! Outbound HTTP client tests
//!
//! The ureq clients talk to a local actix-web server that records every
//! request, so paths, headers and bodies are checked on the wire.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::dev::ServerHandle;
use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use serde_json::{Value, json};

use dpc_portal::clients::{ApiOrganization, DpcApi, GithubApi, UreqDpcApi, UreqGithubApi};
use dpc_portal::config::{ApiConfig, ApiEndpointConfig, GithubAuthConfig};
use dpc_portal::errors::PortalError;
use dpc_portal::storage::{ApiEnvironment, FhirEndpoint, FhirEndpointStatus};

const SECRET: &str = "golden-macaroon";

#[derive(Debug, Clone)]
struct Received {
    method: String,
    uri: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: Value,
}

/// Canned API responses; `status` forces every response to that code
#[derive(Default)]
struct StubServer {
    received: Mutex<Vec<Received>>,
    status: Mutex<Option<u16>>,
}

impl StubServer {
    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    fn fail_with(&self, status: u16) {
        *self.status.lock().unwrap() = Some(status);
    }
}

fn query_page(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| pair.strip_prefix("page="))
}

fn teams_page(query: &str) -> Value {
    if query_page(query) == Some("1") {
        (1..=100)
            .map(|id| {
                json!({ "id": id, "name": format!("team {}", id), "slug": format!("team-{}", id) })
            })
            .collect()
    } else {
        json!([{ "id": 111222333, "name": "dpc-test", "slug": "dpc-test" }])
    }
}

async fn stub_handler(
    req: HttpRequest,
    body: web::Bytes,
    stub: web::Data<Arc<StubServer>>,
) -> HttpResponse {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    stub.received.lock().unwrap().push(Received {
        method: req.method().to_string(),
        uri: req.uri().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: body.clone(),
    });

    if let Some(code) = *stub.status.lock().unwrap() {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return HttpResponse::build(status).body("unavailable");
    }

    match (req.method().as_str(), req.path()) {
        ("POST", path) if path.starts_with("/Token/") => HttpResponse::Ok().json(json!({
            "token": "1234567890",
            "label": body["label"],
            "createdAt": "2019-11-07T17:15:22.781Z",
        })),
        ("GET", path) if path.starts_with("/Token/") => HttpResponse::Ok().json(json!([{
            "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "tokenType": "MACAROON",
            "label": "Sandbox Token 1",
            "createdAt": "2019-11-07T17:15:22.781Z",
            "expiresAt": "2020-11-07T17:15:22.781Z",
        }])),
        ("POST", "/Organization/$submit") => HttpResponse::Created().json(json!({
            "resourceType": "Organization",
            "id": "46ac7ad6-7487-4dd0-baa0-6e2c8cae76a0",
        })),
        ("PUT", _) => HttpResponse::Ok().json(json!({ "resourceType": "Organization" })),
        ("DELETE", _) => HttpResponse::Ok().finish(),
        ("GET", "/user/teams") => HttpResponse::Ok().json(teams_page(req.query_string())),
        _ => HttpResponse::NotFound().finish(),
    }
}

async fn start_stub(stub: Arc<StubServer>) -> (String, ServerHandle) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub listener");
    let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
    let data = web::Data::new(stub);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::to(stub_handler))
    })
    .workers(1)
    .disable_signals()
    .listen(listener)
    .expect("Failed to start stub server")
    .run();

    let handle = server.handle();
    actix_rt::spawn(server);
    (base_url, handle)
}

fn sandbox_api(base_url: &str) -> UreqDpcApi {
    UreqDpcApi::new(&ApiConfig {
        timeout: 5,
        sandbox: ApiEndpointConfig {
            base_url: base_url.to_string(),
            secret: SECRET.to_string(),
        },
        production: ApiEndpointConfig::default(),
    })
}

fn api_organization() -> ApiOrganization {
    ApiOrganization {
        name: "Reef Clinic".to_string(),
        identifier: Some("1234567893".to_string()),
        address: None,
        endpoint: FhirEndpoint {
            name: "Reef FHIR".to_string(),
            status: FhirEndpointStatus::Test,
            uri: "https://fhir.reef.example.com/r4".to_string(),
        },
    }
}

// =============================================================================
// Token service
// =============================================================================

#[actix_web::test]
async fn test_create_client_token_request() {
    let stub = Arc::new(StubServer::default());
    let (base_url, handle) = start_stub(stub.clone()).await;
    let api = sandbox_api(&base_url);

    let token = api
        .create_client_token(ApiEnvironment::Sandbox, "a1b2/c3", "Sandbox Token 1")
        .await
        .unwrap();
    assert_eq!(token.token, "1234567890");
    assert_eq!(token.label, "Sandbox Token 1");
    assert_eq!(token.created_at, "2019-11-07T17:15:22.781Z");

    let received = stub.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].method, "POST");
    assert_eq!(received[0].uri, "/Token/a1b2%2Fc3");
    assert_eq!(
        received[0].authorization.as_deref(),
        Some("Bearer golden-macaroon")
    );
    assert_eq!(received[0].body, json!({ "label": "Sandbox Token 1" }));

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_list_client_tokens_metadata() {
    let stub = Arc::new(StubServer::default());
    let (base_url, handle) = start_stub(stub.clone()).await;
    let api = sandbox_api(&base_url);

    let tokens = api
        .get_client_tokens(ApiEnvironment::Sandbox, "a1b2c3")
        .await
        .unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].label, "Sandbox Token 1");
    assert_eq!(tokens[0].token_type.as_deref(), Some("MACAROON"));
    assert_eq!(tokens[0].expires_at.as_deref(), Some("2020-11-07T17:15:22.781Z"));

    let received = stub.received();
    assert_eq!(received[0].method, "GET");
    assert_eq!(received[0].uri, "/Token/a1b2c3");
    assert_eq!(
        received[0].authorization.as_deref(),
        Some("Bearer golden-macaroon")
    );

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_non_success_status_is_external_service_error() {
    let stub = Arc::new(StubServer::default());
    stub.fail_with(503);
    let (base_url, handle) = start_stub(stub.clone()).await;
    let api = sandbox_api(&base_url);

    let err = api
        .create_client_token(ApiEnvironment::Sandbox, "a1b2c3", "Sandbox Token 1")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::ExternalService(ref m) if m.contains("503")));

    let err = api
        .get_client_tokens(ApiEnvironment::Sandbox, "a1b2c3")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::ExternalService(_)));

    handle.stop(true).await;
}

#[actix_web::test]
async fn test_unconfigured_environment_is_config_error() {
    let api = sandbox_api("http://127.0.0.1:9");

    let err = api
        .create_client_token(ApiEnvironment::Production, "a1b2c3", "Prod Token")
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::Config(ref m) if m.contains("api.production.base_url")));
}

// =============================================================================
// Organization registration
// =============================================================================

#[actix_web::test]
async fn test_organization_lifecycle_requests() {
    let stub = Arc::new(StubServer::default());
    let (base_url, handle) = start_stub(stub.clone()).await;
    let api = sandbox_api(&base_url);
    let organization = api_organization();

    let api_id = api
        .create_organization(ApiEnvironment::Sandbox, &organization)
        .await
        .unwrap();
    assert_eq!(api_id, "46ac7ad6-7487-4dd0-baa0-6e2c8cae76a0");

    api.update_organization(ApiEnvironment::Sandbox, &api_id, &organization)
        .await
        .unwrap();
    api.delete_organization(ApiEnvironment::Sandbox, &api_id)
        .await
        .unwrap();

    let received = stub.received();
    assert_eq!(received.len(), 3);

    assert_eq!(received[0].method, "POST");
    assert_eq!(received[0].uri, "/Organization/$submit");
    assert_eq!(
        received[0].content_type.as_deref(),
        Some("application/fhir+json")
    );
    assert_eq!(received[0].body["resourceType"], "Parameters");

    assert_eq!(received[1].method, "PUT");
    assert_eq!(received[1].uri, format!("/Organization/{}", api_id));
    assert_eq!(received[1].body["id"], api_id.as_str());
    assert_eq!(received[1].body["identifier"][0]["value"], "1234567893");

    assert_eq!(received[2].method, "DELETE");
    assert!(
        received
            .iter()
            .all(|r| r.authorization.as_deref() == Some("Bearer golden-macaroon"))
    );

    handle.stop(true).await;
}

// =============================================================================
// GitHub
// =============================================================================

#[actix_web::test]
async fn test_github_teams_follow_every_page() {
    let stub = Arc::new(StubServer::default());
    let (base_url, handle) = start_stub(stub.clone()).await;
    let github = UreqGithubApi::new(
        &GithubAuthConfig {
            api_url: base_url,
            ..Default::default()
        },
        5,
    );

    let teams = github.fetch_user_teams("abcdefg").await.unwrap();
    assert_eq!(teams.len(), 101);
    assert!(teams.iter().any(|t| t.id == "111222333"));

    let received = stub.received();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|r| r.uri.starts_with("/user/teams?")));
    let pages: Vec<Option<&str>> = received
        .iter()
        .map(|r| r.uri.split_once('?').and_then(|(_, q)| query_page(q)))
        .collect();
    assert_eq!(pages, vec![Some("1"), Some("2")]);
    assert_eq!(received[0].authorization.as_deref(), Some("Bearer abcdefg"));

    handle.stop(true).await;
}
