//! API integration tests
//!
//! The router is driven in-process; GitHub and Google are wiremock servers.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sitepulse_server::{api::create_router, AppConfig, AppState};

const SERVICE_ACCOUNT: &str = include_str!("../fixtures/service-account.json");
const GIST_ID: &str = "f00dfeed";

const STORED: &str = r#"{
  "total_visits": 10,
  "today_visits": 3,
  "last_updated": "2000-01-01",
  "daily_stats": {
    "2000-01-01": 3
  }
}"#;

fn app(config: AppConfig) -> Router {
    create_router(AppState::new(config).expect("Failed to build state"))
}

fn gist_config(github: &MockServer, token: Option<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.gist.api_base_url = github.uri();
    config.gist.gist_id = GIST_ID.to_string();
    config.gist.token = token.map(str::to_string);
    config
}

fn analytics_config(google: &MockServer) -> AppConfig {
    let mut key: Value = serde_json::from_str(SERVICE_ACCOUNT).expect("Invalid fixture");
    key["token_uri"] = json!(format!("{}/token", google.uri()));

    let mut config = AppConfig::default();
    config.analytics.credentials_json = Some(key.to_string());
    config.analytics.property_id = Some("503780674".to_string());
    config.analytics.api_base_url = google.uri();
    config
}

async fn send(app: Router, method: Method, uri: &str) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request");
    app.oneshot(request).await.expect("Request failed")
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

async fn mount_gist(github: &MockServer, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/gists/{}", GIST_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": GIST_ID,
            "files": { "visitor-count.json": { "filename": "visitor-count.json", "content": content } }
        })))
        .mount(github)
        .await;
}

#[tokio::test]
async fn test_health_check() {
    let response = send(app(AppConfig::default()), Method::GET, "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_lists_missing_settings() {
    let body = json_body(send(app(AppConfig::default()), Method::GET, "/api/ready").await).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["missing"], json!(["GIST_TOKEN", "GA_CREDENTIALS", "GA_PROPERTY_ID"]));
}

#[tokio::test]
async fn test_counter_read_does_not_write() {
    let github = MockServer::start().await;
    mount_gist(&github, STORED).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&github)
        .await;

    let response = send(
        app(gist_config(&github, Some("t0k"))),
        Method::GET,
        "/api/gist-proxy",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");

    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": {
                "total_visits": 10,
                "today_visits": 3,
                "last_updated": "2000-01-01",
                "daily_stats": { "2000-01-01": 3 }
            },
            "updated": false
        })
    );
}

#[tokio::test]
async fn test_counter_increment_writes_back() {
    let github = MockServer::start().await;
    mount_gist(&github, STORED).await;
    Mock::given(method("PATCH"))
        .and(path(format!("/gists/{}", GIST_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&github)
        .await;

    let response = send(
        app(gist_config(&github, Some("t0k"))),
        Method::GET,
        "/api/gist-proxy?increment=true",
    )
    .await;
    let body = json_body(response).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["updated"], true);
    assert_eq!(body["data"]["total_visits"], 11);
    assert_eq!(body["data"]["today_visits"], 1);
    assert_eq!(body["data"]["daily_stats"]["2000-01-01"], 3);

    let today = body["data"]["last_updated"].as_str().unwrap().to_string();
    assert_ne!(today, "2000-01-01");
    assert_eq!(body["data"]["daily_stats"][today.as_str()], 1);

    // The document written back is the returned record, pretty-printed
    let requests = github.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .expect("No PATCH sent");
    let sent: Value = serde_json::from_slice(&patch.body).unwrap();
    let content = sent["files"]["visitor-count.json"]["content"].as_str().unwrap();
    assert!(content.starts_with("{\n  \"total_visits\": 11,"));
    assert_eq!(serde_json::from_str::<Value>(content).unwrap(), body["data"]);
}

#[tokio::test]
async fn test_counter_post_increments() {
    let github = MockServer::start().await;
    mount_gist(&github, "").await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&github)
        .await;

    let body = json_body(
        send(
            app(gist_config(&github, Some("t0k"))),
            Method::POST,
            "/api/gist-proxy",
        )
        .await,
    )
    .await;

    assert_eq!(body["updated"], true);
    assert_eq!(body["data"]["total_visits"], 1);
    assert_eq!(body["data"]["today_visits"], 1);
}

#[tokio::test]
async fn test_counter_iframe_method_increments() {
    let github = MockServer::start().await;
    mount_gist(&github, STORED).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&github)
        .await;

    let body = json_body(
        send(
            app(gist_config(&github, Some("t0k"))),
            Method::GET,
            "/api/gist-proxy?method=POST",
        )
        .await,
    )
    .await;

    assert_eq!(body["updated"], true);
    assert_eq!(body["data"]["total_visits"], 11);
}

#[tokio::test]
async fn test_counter_repeated_parameter_keeps_last() {
    let github = MockServer::start().await;
    mount_gist(&github, STORED).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&github)
        .await;

    let response = send(
        app(gist_config(&github, Some("t0k"))),
        Method::GET,
        "/api/gist-proxy?increment=false&increment=true",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["updated"], true);
}

#[tokio::test]
async fn test_counter_without_token() {
    let github = MockServer::start().await;

    let response = send(app(gist_config(&github, None)), Method::GET, "/api/gist-proxy").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({ "error": "GitHub token not configured", "code": "TOKEN_MISSING" })
    );
}

#[tokio::test]
async fn test_counter_upstream_errors() {
    let github = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&github)
        .await;

    let body = json_body(
        send(
            app(gist_config(&github, Some("expired"))),
            Method::GET,
            "/api/gist-proxy?increment=true",
        )
        .await,
    )
    .await;
    assert_eq!(
        body,
        json!({ "error": "GitHub API error: 401", "code": "API_ERROR" })
    );

    let github = MockServer::start().await;
    mount_gist(&github, STORED).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&github)
        .await;

    let body = json_body(
        send(
            app(gist_config(&github, Some("read-only"))),
            Method::GET,
            "/api/gist-proxy?increment=true",
        )
        .await,
    )
    .await;
    assert_eq!(
        body,
        json!({ "error": "Failed to update Gist: 403", "code": "UPDATE_ERROR" })
    );
}

#[tokio::test]
async fn test_options_requests() {
    for uri in ["/api/gist-proxy", "/api/ga-stats"] {
        let response = send(app(AppConfig::default()), Method::OPTIONS, uri).await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers().clone();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    // Browser preflight
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/gist-proxy")
        .header(header::ORIGIN, "https://zedxzk.github.io")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app(AppConfig::default()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, OPTIONS"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS], "Content-Type");
}

#[tokio::test]
async fn test_snapshot() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.integration",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&google)
        .await;

    let report_path = "/v1beta/properties/503780674:runReport";
    let ranges = [
        ("2024-03-05", Some(("5", "12"))),
        ("2024-02-05", Some(("40", "90"))),
        ("2020-01-01", None),
    ];
    for (start, values) in ranges {
        let body = match values {
            Some((users, views)) => json!({
                "rows": [{ "metricValues": [{ "value": users }, { "value": views }] }],
                "rowCount": 1
            }),
            None => json!({ "kind": "analyticsData#runReport" }),
        };
        Mock::given(method("POST"))
            .and(path(report_path))
            .and(body_partial_json(json!({
                "dateRanges": [{ "startDate": start, "endDate": "2024-03-05" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&google)
            .await;
    }

    let response = send(
        app(analytics_config(&google)),
        Method::GET,
        "/api/ga-stats?date=2024-03-05",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["metric_type"], "users_and_pageviews");
    assert_eq!(
        body["stats"],
        json!({
            "todayUsers": 5,
            "todayPageViews": 12,
            "totalUsers": 0,
            "totalPageViews": 0,
            "last30DaysUsers": 40,
            "last30DaysPageViews": 90
        })
    );
    assert_eq!(body["last_updated"].as_str().unwrap().len(), "2024-03-05 10:00:00".len());
}

#[tokio::test]
async fn test_snapshot_without_credentials() {
    let body = json_body(send(app(AppConfig::default()), Method::GET, "/api/ga-stats").await).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert!(body.get("stats").is_none());
}

#[tokio::test]
async fn test_snapshot_invalid_date() {
    let google = MockServer::start().await;
    let body = json_body(
        send(
            app(analytics_config(&google)),
            Method::GET,
            "/api/ga-stats?date=03/05/2024",
        )
        .await,
    )
    .await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Invalid date '03/05/2024', expected YYYY-MM-DD");
}

#[tokio::test]
async fn test_snapshot_repeated_date_keeps_last() {
    let google = MockServer::start().await;
    let response = send(
        app(analytics_config(&google)),
        Method::GET,
        "/api/ga-stats?date=2024-03-05&date=yesterday",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(
        body,
        json!({ "success": false, "error": "Invalid date 'yesterday', expected YYYY-MM-DD" })
    );
}

#[tokio::test]
async fn test_snapshot_upstream_failure() {
    let google = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.integration"
        })))
        .mount(&google)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/properties/503780674:runReport"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED" }
        })))
        .mount(&google)
        .await;

    let body = json_body(
        send(
            app(analytics_config(&google)),
            Method::GET,
            "/api/ga-stats?date=2024-03-05",
        )
        .await,
    )
    .await;
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": "Failed to fetch GA data: Analytics report failed (403): Permission denied"
        })
    );
}
