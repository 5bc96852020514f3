//! Client for the Microcks server APIs
//!
//! A client is either headless (bare server address, token set by the
//! caller) or built from a stored context, in which case an expired access
//! token is refreshed and persisted back to the configuration before any
//! API call runs.

use std::collections::HashMap;
use std::path::Path;

use reqwest::{header, multipart, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use microcks_shared::types::{HeaderDto, OAuth2ClientContext, OAUTH2_GRANT_TYPES};
use microcks_shared::{
    LocalConfig, MicrocksError, Result, RunnerType, TestRequest, TestResultSummary, User,
};

use crate::auth;
use crate::keycloak::KeycloakClient;
use crate::options::ConnectOptions;

/// Client for one Microcks server's `/api/` endpoints.
#[derive(Debug)]
pub struct MicrocksClient {
    api_url: Url,
    auth_token: String,
    refresh_token: String,
    options: ConnectOptions,
    http_client: reqwest::Client,
}

/// Arguments for launching a new conformance test.
#[derive(Debug, Clone)]
pub struct TestSpec {
    /// Service identifier, `name:version`
    pub service_id: String,
    /// Endpoint URL of the deployment under test
    pub test_endpoint: String,
    pub runner_type: RunnerType,
    /// Max test duration in milliseconds
    pub timeout: i64,
    /// Name of a server-side secret used to reach the endpoint
    pub secret_name: Option<String>,
    /// JSON list of operation names to restrict the test to
    pub filtered_operations: Option<String>,
    /// JSON map of operation name to header list
    pub operations_headers: Option<String>,
    /// JSON OAuth2 client context for authorizing the tested endpoint
    pub oauth2_context: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KeycloakConfig {
    enabled: bool,
    #[serde(rename = "auth-server-url")]
    auth_server_url: String,
    realm: String,
}

#[derive(Debug, Deserialize)]
struct CreateTestResponse {
    id: String,
}

impl MicrocksClient {
    /// Builds a headless client for the given server address. No token is
    /// attached; use [`MicrocksClient::set_oauth_token`] after connecting to
    /// Keycloak, or skip it entirely for servers without authentication.
    pub fn new(server_addr: &str, options: &ConnectOptions) -> Result<Self> {
        let mut api_url = server_addr.to_string();
        if !api_url.ends_with("/api/") {
            api_url.push_str("/api/");
        }
        Ok(MicrocksClient {
            api_url: Url::parse(&api_url)?,
            auth_token: String::new(),
            refresh_token: String::new(),
            options: options.clone(),
            http_client: options.build_http_client()?,
        })
    }

    /// Builds a client from a stored context (the current one when
    /// `context_name` is empty). When the stored access token has expired
    /// and a refresh token is present, the tokens are renewed and written
    /// back to `config_path` before this returns.
    pub async fn from_context(
        config: &mut LocalConfig,
        config_path: &Path,
        context_name: &str,
        options: &ConnectOptions,
    ) -> Result<Self> {
        let resolved = config.resolve_context(context_name)?;

        let mut effective = options.clone();
        if resolved.server.insecure_tls {
            effective.insecure_tls = true;
        }

        let mut client = MicrocksClient::new(&resolved.server.server, &effective)?;
        client.auth_token = resolved.user.auth_token.clone();
        client.refresh_token = resolved.user.refresh_token.clone();
        client
            .refresh_stored_token(config, config_path, &resolved.name)
            .await?;
        Ok(client)
    }

    /// Attaches a bearer token to subsequent API calls.
    pub fn set_oauth_token(&mut self, token: String) {
        self.auth_token = token;
    }

    /// Returns the realm URL of the Keycloak instance securing this server,
    /// or the literal string `"null"` when authentication is disabled.
    pub async fn get_keycloak_url(&self) -> Result<String> {
        let url = self.api_url.join("keycloak/config")?;
        debug!(%url, "fetching keycloak config");

        let response = self
            .http_client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MicrocksError::Upstream(format!(
                "cannot get keycloak config, status {status}"
            )));
        }
        let config: KeycloakConfig = response.json().await?;

        if config.enabled {
            Ok(format!(
                "{}/realms/{}/",
                config.auth_server_url, config.realm
            ))
        } else {
            Ok("null".to_string())
        }
    }

    /// Launches a test and returns its result id for polling.
    pub async fn create_test_result(&self, spec: &TestSpec) -> Result<String> {
        let request = spec.to_request();
        let url = self.api_url.join("tests")?;
        debug!(%url, service = %spec.service_id, "creating test");

        let response = self
            .http_client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&self.auth_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MicrocksError::Upstream(format!(
                "cannot create test, status {status}: {body}"
            )));
        }
        let created: CreateTestResponse = serde_json::from_str(&body)?;
        Ok(created.id)
    }

    /// Fetches the summary of a test result.
    pub async fn get_test_result(&self, test_result_id: &str) -> Result<TestResultSummary> {
        let url = self.api_url.join(&format!("tests/{test_result_id}"))?;
        debug!(%url, "fetching test result");

        let response = self
            .http_client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(&self.auth_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MicrocksError::Upstream(format!(
                "cannot get test result {test_result_id}, status {status}"
            )));
        }
        Ok(response.json().await?)
    }

    /// Uploads an artifact file and returns the name of the discovered
    /// service. The server answers 201 on success; anything else surfaces
    /// the response body as the error message.
    pub async fn upload_artifact(&self, path: &Path, main_artifact: bool) -> Result<String> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(data).file_name(file_name))
            .text("mainArtifact", main_artifact.to_string());

        let url = self.api_url.join("artifact/upload")?;
        debug!(%url, file = %path.display(), "uploading artifact");

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.auth_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::CREATED {
            return Err(MicrocksError::Upstream(body));
        }
        Ok(body)
    }

    /// Asks the server to download an artifact from a remote URL and
    /// returns the name of the discovered service.
    pub async fn download_artifact(
        &self,
        artifact_url: &str,
        main_artifact: bool,
        secret: Option<&str>,
    ) -> Result<String> {
        let mut form = multipart::Form::new()
            .text("url", artifact_url.to_string())
            .text("mainArtifact", main_artifact.to_string());
        if let Some(secret) = secret {
            if !secret.is_empty() {
                form = form.text("secret", secret.to_string());
            }
        }

        let url = self.api_url.join("artifact/download")?;
        debug!(%url, artifact_url, "downloading artifact");

        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.auth_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::CREATED {
            return Err(MicrocksError::Upstream(body));
        }
        Ok(body)
    }

    /// Renews an expired access token with the stored refresh token and
    /// auth client credentials, persisting the new pair. No-op without a
    /// refresh token or while the stored token is still valid.
    async fn refresh_stored_token(
        &mut self,
        config: &mut LocalConfig,
        config_path: &Path,
        context_name: &str,
    ) -> Result<()> {
        if self.refresh_token.is_empty() {
            return Ok(());
        }

        let resolved = config.resolve_context(context_name)?;
        let claims = auth::decode_claims(&resolved.user.auth_token)?;
        if !claims.is_expired() {
            return Ok(());
        }

        info!("auth token no longer valid, refreshing");
        let auth_record = config.get_auth(&resolved.server.server)?.clone();

        let keycloak_url = self.get_keycloak_url().await?;
        let keycloak = KeycloakClient::new(
            &self.options,
            &keycloak_url,
            &auth_record.client_id,
            &auth_record.client_secret,
        )?;
        let (auth_token, refresh_token) = keycloak.refresh(&self.refresh_token).await?;

        self.auth_token = auth_token.clone();
        self.refresh_token = refresh_token.clone();
        config.upsert_user(User {
            name: resolved.user.name,
            auth_token,
            refresh_token,
        });
        config.write(config_path)?;
        Ok(())
    }
}

impl TestSpec {
    fn to_request(&self) -> TestRequest {
        TestRequest {
            service_id: self.service_id.clone(),
            test_endpoint: self.test_endpoint.clone(),
            runner_type: self.runner_type,
            timeout: self.timeout,
            secret_name: self.secret_name.clone(),
            filtered_operations: self
                .filtered_operations
                .as_deref()
                .and_then(parse_filtered_operations),
            operations_headers: self
                .operations_headers
                .as_deref()
                .and_then(parse_operations_headers),
            o_auth2_context: self.oauth2_context.as_deref().and_then(parse_oauth2_context),
        }
    }
}

/// The pass-through test options keep the user's JSON verbatim, but only
/// after it validated against the expected shape. Invalid input downgrades
/// to a warning and the option is dropped, not a failed command.
fn parse_filtered_operations(raw: &str) -> Option<serde_json::Value> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("cannot parse filteredOperations as JSON: {e}");
            return None;
        }
    };
    if let Err(e) = serde_json::from_value::<Vec<String>>(value.clone()) {
        warn!("filteredOperations is not a list of operation names: {e}");
        return None;
    }
    Some(value)
}

fn parse_operations_headers(raw: &str) -> Option<serde_json::Value> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("cannot parse operationsHeaders as JSON: {e}");
            return None;
        }
    };
    if let Err(e) = serde_json::from_value::<HashMap<String, Vec<HeaderDto>>>(value.clone()) {
        warn!("operationsHeaders is not a map of operation to headers: {e}");
        return None;
    }
    Some(value)
}

fn parse_oauth2_context(raw: &str) -> Option<serde_json::Value> {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("cannot parse oAuth2Context as JSON: {e}");
            return None;
        }
    };
    let context: OAuth2ClientContext = match serde_json::from_value(value.clone()) {
        Ok(context) => context,
        Err(e) => {
            warn!("oAuth2Context has an unexpected shape: {e}");
            return None;
        }
    };
    if !OAUTH2_GRANT_TYPES.contains(&context.grant_type.as_str()) {
        warn!(
            "grant type '{}' in oAuth2Context is not supported, OAuth2 is turned off",
            context.grant_type
        );
        return None;
    }
    Some(value)
}
