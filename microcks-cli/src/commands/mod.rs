//! Command implementations, one module per subcommand.

pub mod context;
pub mod import;
pub mod import_dir;
pub mod import_url;
pub mod login;
pub mod logout;
pub mod start;
pub mod stop;
pub mod test;
pub mod watch;

use clap::Args;
use microcks_client::{ConnectOptions, KeycloakClient, MicrocksClient};
use microcks_shared::config::{self, LocalConfig};
use microcks_shared::{MicrocksError, Result};

/// Server flags shared by the commands that can run without a stored
/// context. When any of them is set, all three must be, and the command
/// authenticates with the service account instead of the context user.
#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    /// Microcks API URL
    #[arg(long = "microcksURL", value_name = "URL")]
    pub microcks_url: Option<String>,

    /// Keycloak realm service account client id
    #[arg(long = "keycloakClientId", value_name = "ID")]
    pub keycloak_client_id: Option<String>,

    /// Keycloak realm service account client secret
    #[arg(long = "keycloakClientSecret", value_name = "SECRET")]
    pub keycloak_client_secret: Option<String>,
}

impl ServerArgs {
    fn is_set(&self) -> bool {
        self.microcks_url.is_some()
            || self.keycloak_client_id.is_some()
            || self.keycloak_client_secret.is_some()
    }
}

/// A connected API client together with the origin it was built from.
#[derive(Debug)]
pub struct ClientHandle {
    pub client: MicrocksClient,
    /// Base address of the server, used to print result links
    pub server_addr: String,
    /// The context name, or the server URL when connected through flags
    pub context_label: String,
}

/// Builds an authenticated [`MicrocksClient`] either from the server flags
/// (service account login) or from the stored context.
pub async fn connect(
    server: &ServerArgs,
    context: &str,
    options: &ConnectOptions,
) -> Result<ClientHandle> {
    if server.is_set() {
        return connect_with_flags(server, options).await;
    }

    let config_path = config::default_config_path()?;
    let mut local = LocalConfig::read(&config_path)?
        .ok_or_else(|| MicrocksError::Validation("no configuration found, please login first".into()))?;
    let resolved = local.resolve_context(context)?;
    let client = MicrocksClient::from_context(&mut local, &config_path, context, options).await?;

    Ok(ClientHandle {
        client,
        server_addr: resolved.server.server,
        context_label: resolved.name,
    })
}

async fn connect_with_flags(server: &ServerArgs, options: &ConnectOptions) -> Result<ClientHandle> {
    let missing = || {
        MicrocksError::Validation(
            "--microcksURL, --keycloakClientId and --keycloakClientSecret must be given together"
                .into(),
        )
    };
    let url = server.microcks_url.as_deref().ok_or_else(missing)?;
    let client_id = server.keycloak_client_id.as_deref().ok_or_else(missing)?;
    let client_secret = server.keycloak_client_secret.as_deref().ok_or_else(missing)?;

    let mut client = MicrocksClient::new(url, options)?;
    let keycloak_url = client.get_keycloak_url().await?;

    let token = if keycloak_url == "null" {
        // Authentication is disabled server-side, any token will do.
        "unauthenticated-token".to_string()
    } else {
        KeycloakClient::new(options, &keycloak_url, client_id, client_secret)?
            .connect()
            .await?
    };
    client.set_oauth_token(token);

    Ok(ClientHandle {
        client,
        server_addr: url.to_string(),
        context_label: url.to_string(),
    })
}
