//! Keycloak client for the OAuth grants the CLI needs

use reqwest::header;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use microcks_shared::{MicrocksError, Result};

use crate::options::ConnectOptions;

/// Client bound to one Keycloak realm, e.g.
/// `http://keycloak.example.com/realms/microcks/`.
pub struct KeycloakClient {
    base_url: Url,
    client_id: String,
    client_secret: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct OidcDiscovery {
    token_endpoint: String,
}

impl KeycloakClient {
    /// Builds a client for the given realm URL with OAuth client
    /// credentials. The URL gets a trailing slash when missing so that
    /// relative endpoint paths resolve under the realm.
    pub fn new(
        options: &ConnectOptions,
        realm_url: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Self> {
        let mut realm_url = realm_url.to_string();
        if !realm_url.ends_with('/') {
            realm_url.push('/');
        }
        Ok(KeycloakClient {
            base_url: Url::parse(&realm_url)?,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            http_client: options.build_http_client()?,
        })
    }

    /// Redeems the client credentials for an access token
    /// (`client_credentials` grant). Used for service-account style logins
    /// in CI pipelines.
    pub async fn connect(&self) -> Result<String> {
        let url = self.base_url.join("protocol/openid-connect/token")?;
        debug!(%url, "requesting client_credentials token");

        let response = self
            .http_client
            .post(url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(header::ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let tokens = parse_token_response(response).await?;
        Ok(tokens.access_token)
    }

    /// Logs a user in with the `password` grant and returns the access and
    /// refresh token pair.
    pub async fn connect_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, String)> {
        let url = self.base_url.join("protocol/openid-connect/token")?;
        debug!(%url, username, "requesting password grant token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("username", username),
            ("password", password),
            ("grant_type", "password"),
        ];
        let response = self.http_client.post(url).form(&params).send().await?;

        let tokens = parse_token_response(response).await?;
        Ok((tokens.access_token, tokens.refresh_token))
    }

    /// Redeems a refresh token against the realm's discovered token
    /// endpoint and returns the new access and refresh token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(String, String)> {
        let token_endpoint = self.discover_token_endpoint().await?;
        debug!(%token_endpoint, "redeeming refresh token");

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .http_client
            .post(token_endpoint)
            .form(&params)
            .send()
            .await?;

        let tokens = parse_token_response(response).await?;
        Ok((tokens.access_token, tokens.refresh_token))
    }

    async fn discover_token_endpoint(&self) -> Result<Url> {
        let url = self.base_url.join(".well-known/openid-configuration")?;
        let response = self.http_client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MicrocksError::Upstream(format!(
                "OIDC discovery failed with status {status}"
            )));
        }
        let discovery: OidcDiscovery = response.json().await?;
        Ok(Url::parse(&discovery.token_endpoint)?)
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(MicrocksError::Upstream(format!(
            "token request failed with status {status}: {body}"
        )));
    }
    Ok(serde_json::from_str(&body)?)
}
