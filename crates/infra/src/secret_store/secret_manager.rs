//! HTTP client for the Secret Manager REST API.
//!
//! `GET {endpoint}/v1/projects/{project}/secrets/{secret}/versions/latest:access`
//! returns the payload base64-encoded under `payload.data`.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;
use serde::Deserialize;

use super::r#trait::{SecretStore, SecretStoreError, SecretVersion};

pub const DEFAULT_ENDPOINT: &str = "https://secretmanager.googleapis.com";

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Where the bearer token for Secret Manager comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTokenSource {
    /// Fixed token (local development, emulators).
    Static(String),
    /// Compute metadata server of the hosting runtime.
    MetadataServer { url: String },
}

impl Default for AccessTokenSource {
    fn default() -> Self {
        AccessTokenSource::MetadataServer {
            url: METADATA_TOKEN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecretManagerConfig {
    pub project_id: String,
    pub endpoint: String,
    pub token: AccessTokenSource,
    /// Per-request bound on each HTTP call.
    pub request_timeout: Duration,
}

impl SecretManagerConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: AccessTokenSource::default(),
            request_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessResponse {
    name: String,
    payload: AccessPayload,
}

#[derive(Debug, Deserialize)]
struct AccessPayload {
    data: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// [`SecretStore`] backed by the Secret Manager REST API.
#[derive(Debug, Clone)]
pub struct SecretManagerClient {
    http: reqwest::Client,
    config: SecretManagerConfig,
}

impl SecretManagerClient {
    pub fn new(config: SecretManagerConfig) -> Result<Self, SecretStoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SecretStoreError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    fn latest_version_url(&self, secret: &str) -> String {
        format!(
            "{}/v1/projects/{}/secrets/{}/versions/latest:access",
            self.config.endpoint.trim_end_matches('/'),
            self.config.project_id,
            secret
        )
    }

    async fn access_token(&self) -> Result<String, SecretStoreError> {
        match &self.config.token {
            AccessTokenSource::Static(token) => Ok(token.clone()),
            AccessTokenSource::MetadataServer { url } => {
                let resp = self
                    .http
                    .get(url)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await
                    .map_err(transport_error)?;

                if !resp.status().is_success() {
                    return Err(SecretStoreError::Unauthorized(format!(
                        "metadata server returned {}",
                        resp.status()
                    )));
                }

                let token: TokenResponse = resp
                    .json()
                    .await
                    .map_err(|e| SecretStoreError::Malformed(e.to_string()))?;
                Ok(token.access_token)
            }
        }
    }
}

fn transport_error(err: reqwest::Error) -> SecretStoreError {
    if err.is_timeout() {
        SecretStoreError::Transport(format!("request timed out: {err}"))
    } else {
        SecretStoreError::Transport(err.to_string())
    }
}

#[async_trait]
impl SecretStore for SecretManagerClient {
    async fn access_latest(&self, secret: &str) -> Result<SecretVersion, SecretStoreError> {
        let token = self.access_token().await?;
        let url = self.latest_version_url(secret);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(SecretStoreError::NotFound(format!(
                    "projects/{}/secrets/{secret}",
                    self.config.project_id
                )));
            }
            s @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                return Err(SecretStoreError::Unauthorized(format!("{url} returned {s}")));
            }
            s => {
                return Err(SecretStoreError::Transport(format!("{url} returned {s}")));
            }
        }

        let body: AccessResponse = resp
            .json()
            .await
            .map_err(|e| SecretStoreError::Malformed(e.to_string()))?;

        let bytes = STANDARD
            .decode(body.payload.data.as_bytes())
            .map_err(|e| SecretStoreError::Malformed(format!("payload is not base64: {e}")))?;
        let payload = String::from_utf8(bytes)
            .map_err(|e| SecretStoreError::InvalidPayload(format!("payload is not UTF-8: {e}")))?;

        tracing::debug!(version = %body.name, "fetched secret version");

        Ok(SecretVersion {
            name: body.name,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::Json;
    use axum::Router;
    use axum::extract::Path;
    use axum::http::HeaderMap;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use serde_json::json;

    struct MockSecretManager {
        base_url: String,
        handle: tokio::task::JoinHandle<()>,
    }

    impl MockSecretManager {
        async fn spawn() -> Self {
            let app = Router::new()
                .route(
                    "/v1/projects/:project/secrets/:secret/versions/:version",
                    get(access_latest),
                )
                .route("/token", get(metadata_token));

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind ephemeral port");
            let addr = listener.local_addr().unwrap();
            let handle = tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            Self {
                base_url: format!("http://{addr}"),
                handle,
            }
        }

        fn client(&self, token: AccessTokenSource) -> SecretManagerClient {
            let mut config = SecretManagerConfig::new("demo-project");
            config.endpoint = self.base_url.clone();
            config.token = token;
            SecretManagerClient::new(config).unwrap()
        }
    }

    impl Drop for MockSecretManager {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    /// Mimics the REST surface: `auth-allowed-emails` exists, `forbidden` is
    /// not readable, `binary` holds non-UTF-8 bytes, `garbled` returns a
    /// non-base64 payload, anything else 404s.
    async fn access_latest(
        Path((project, secret, version)): Path<(String, String, String)>,
        headers: HeaderMap,
    ) -> Response {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "Bearer test-token");
        if !authorized {
            return AxumStatus::UNAUTHORIZED.into_response();
        }

        if version != "latest:access" {
            return AxumStatus::BAD_REQUEST.into_response();
        }

        let name = secret.as_str();
        match name {
            "auth-allowed-emails" => Json(json!({
                "name": format!("projects/{project}/secrets/{name}/versions/3"),
                "payload": { "data": STANDARD.encode("a@x.com, B@X.com") }
            }))
            .into_response(),
            "forbidden" => AxumStatus::FORBIDDEN.into_response(),
            "binary" => Json(json!({
                "name": format!("projects/{project}/secrets/{name}/versions/2"),
                "payload": { "data": STANDARD.encode([0xffu8, 0xfe]) }
            }))
            .into_response(),
            "garbled" => Json(json!({
                "name": format!("projects/{project}/secrets/{name}/versions/1"),
                "payload": { "data": "!!not-base64!!" }
            }))
            .into_response(),
            _ => AxumStatus::NOT_FOUND.into_response(),
        }
    }

    async fn metadata_token(headers: HeaderMap) -> Response {
        if headers.get("Metadata-Flavor").and_then(|v| v.to_str().ok()) != Some("Google") {
            return AxumStatus::FORBIDDEN.into_response();
        }
        Json(json!({
            "access_token": "test-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        }))
        .into_response()
    }

    #[tokio::test]
    async fn decodes_latest_version_with_static_token() {
        let server = MockSecretManager::spawn().await;
        let client = server.client(AccessTokenSource::Static("test-token".into()));

        let version = client.access_latest("auth-allowed-emails").await.unwrap();
        assert_eq!(version.payload, "a@x.com, B@X.com");
        assert_eq!(
            version.name,
            "projects/demo-project/secrets/auth-allowed-emails/versions/3"
        );
    }

    #[tokio::test]
    async fn fetches_token_from_metadata_server() {
        let server = MockSecretManager::spawn().await;
        let client = server.client(AccessTokenSource::MetadataServer {
            url: format!("{}/token", server.base_url),
        });

        assert!(client.access_latest("auth-allowed-emails").await.is_ok());
    }

    #[tokio::test]
    async fn maps_status_codes() {
        let server = MockSecretManager::spawn().await;
        let client = server.client(AccessTokenSource::Static("test-token".into()));

        assert!(matches!(
            client.access_latest("does-not-exist").await,
            Err(SecretStoreError::NotFound(_))
        ));
        assert!(matches!(
            client.access_latest("forbidden").await,
            Err(SecretStoreError::Unauthorized(_))
        ));

        let wrong_token = server.client(AccessTokenSource::Static("stale".into()));
        assert!(matches!(
            wrong_token.access_latest("auth-allowed-emails").await,
            Err(SecretStoreError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn rejects_non_base64_payload() {
        let server = MockSecretManager::spawn().await;
        let client = server.client(AccessTokenSource::Static("test-token".into()));

        assert!(matches!(
            client.access_latest("garbled").await,
            Err(SecretStoreError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn non_utf8_payload_is_invalid_configuration() {
        let server = MockSecretManager::spawn().await;
        let client = server.client(AccessTokenSource::Static("test-token".into()));

        let err = client.access_latest("binary").await.unwrap_err();
        assert!(matches!(err, SecretStoreError::InvalidPayload(_)));
        assert!(matches!(
            allowgate_core::GateError::from(err),
            allowgate_core::GateError::Configuration(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let mut config = SecretManagerConfig::new("demo-project");
        config.endpoint = "http://127.0.0.1:1".to_string();
        config.token = AccessTokenSource::Static("test-token".into());
        config.request_timeout = Duration::from_millis(500);
        let client = SecretManagerClient::new(config).unwrap();

        assert!(matches!(
            client.access_latest("auth-allowed-emails").await,
            Err(SecretStoreError::Transport(_))
        ));
    }
}
