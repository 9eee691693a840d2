#![allow(dead_code)]

use notification_relay::config::RelayConfig;
use notification_relay::startup::Application;
use serde_json::json;
use service_core::config::Config as CoreConfig;
use std::collections::HashMap;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");
pub const TEST_CLIENT_EMAIL: &str = "relay@demo-project.iam.gserviceaccount.com";
pub const TEST_PROJECT_ID: &str = "demo-project";
pub const TEST_SERVER_KEY: &str = "AAAA-test-server-key";
pub const TEST_ACCESS_TOKEN: &str = "ya29.test-access-token";

pub const TOKEN_PATH: &str = "/token";
pub const V1_SEND_PATH: &str = "/v1/projects/demo-project/messages:send";
pub const LEGACY_SEND_PATH: &str = "/fcm/send";

/// Service-account credentials for v1 mode.
pub fn v1_vars() -> Vec<(&'static str, String)> {
    vec![
        ("FCM_MODE", "v1".to_string()),
        ("FIREBASE_CLIENT_EMAIL", TEST_CLIENT_EMAIL.to_string()),
        ("FIREBASE_PRIVATE_KEY", TEST_PRIVATE_KEY.to_string()),
        ("FIREBASE_PROJECT_ID", TEST_PROJECT_ID.to_string()),
    ]
}

/// Server key for legacy mode.
pub fn legacy_vars() -> Vec<(&'static str, String)> {
    vec![
        ("FCM_MODE", "legacy".to_string()),
        ("FCM_SERVER_KEY", TEST_SERVER_KEY.to_string()),
    ]
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    /// Stands in for both the FCM API and the OAuth2 token endpoint.
    pub fcm: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn(vars: Vec<(&'static str, String)>) -> Self {
        let fcm = MockServer::start().await;

        let mut env: HashMap<String, String> = vars
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        env.insert("FCM_API_BASE_URL".to_string(), fcm.uri());
        env.insert(
            "FCM_TOKEN_URI".to_string(),
            format!("{}{}", fcm.uri(), TOKEN_PATH),
        );

        // Use random port for testing (port 0)
        let config = RelayConfig::from_source(CoreConfig { port: 0 }, &env)
            .expect("Failed to load test configuration");

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            fcm,
            client,
        }
    }

    pub fn relay_url(&self) -> String {
        format!("{}/send-notification", self.address)
    }

    pub async fn post_notification(&self, body: &str) -> reqwest::Response {
        self.client
            .post(self.relay_url())
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Token endpoint that accepts any JWT-bearer assertion.
    pub async fn mount_token_endpoint(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": TEST_ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .mount(&self.fcm)
            .await;
    }

    /// Fails the test if FCM is called at all.
    pub async fn forbid_provider_calls(&self) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.fcm)
            .await;
    }

    /// JSON bodies of every request FCM received on `send_path`.
    pub async fn sent_envelopes(&self, send_path: &str) -> Vec<serde_json::Value> {
        self.fcm
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == send_path)
            .map(|request| {
                serde_json::from_slice(&request.body).expect("Envelope was not JSON")
            })
            .collect()
    }
}

pub async fn json_body(response: reqwest::Response) -> serde_json::Value {
    response.json().await.expect("Failed to parse response")
}
