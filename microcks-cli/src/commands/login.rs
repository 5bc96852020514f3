//! `login` stores credentials for a Microcks server in a new or existing
//! context and makes that context current.

use clap::Args;
use microcks_client::{auth, ConnectOptions, KeycloakClient, MicrocksClient};
use microcks_shared::config::{self, Auth, ContextRef, LocalConfig, Server, User};
use microcks_shared::{MicrocksError, Result};
use tracing::warn;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Address of the Microcks server, e.g. http://localhost:8080
    pub server: String,

    /// Name to use for the context
    #[arg(long)]
    pub name: Option<String>,

    /// The username of an account to authenticate
    #[arg(long, default_value = "")]
    pub username: String,

    /// The password of an account to authenticate
    #[arg(long, default_value = "")]
    pub password: String,

    /// OAuth client id used for the password grant
    #[arg(long = "client-id", env = "MICROCKS_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret used for the password grant
    #[arg(long = "client-secret", env = "MICROCKS_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
}

pub async fn execute(args: LoginArgs, options: &ConnectOptions) -> Result<()> {
    let server = args.server;
    let client = MicrocksClient::new(&server, options)?;
    let keycloak_url = client.get_keycloak_url().await?;

    let ctx_name = args.name.unwrap_or_else(|| server.clone());

    let config_path = config::default_config_path()?;
    let mut local = LocalConfig::read(&config_path)?.unwrap_or_default();

    let mut auth_cfg = Auth {
        server: server.clone(),
        ..Default::default()
    };
    let mut auth_token = String::new();
    let mut refresh_token = String::new();

    if keycloak_url == "null" {
        local.upsert_server(Server {
            name: String::new(),
            server: server.clone(),
            insecure_tls: options.insecure_tls,
            keycloak_enable: false,
        });
        println!("No login required...");
    } else {
        let missing_credentials = || {
            MicrocksError::Validation(
                "set MICROCKS_CLIENT_ID and MICROCKS_CLIENT_SECRET (or --client-id and \
                 --client-secret) to perform a password login"
                    .into(),
            )
        };
        let client_id = args.client_id.ok_or_else(missing_credentials)?;
        let client_secret = args.client_secret.ok_or_else(missing_credentials)?;

        let keycloak = KeycloakClient::new(options, &keycloak_url, &client_id, &client_secret)?;
        let (access, refresh) = keycloak
            .connect_with_password(&args.username, &args.password)
            .await?;
        auth_token = access;
        refresh_token = refresh;
        auth_cfg.client_id = client_id;
        auth_cfg.client_secret = client_secret;

        match auth::decode_claims(&auth_token) {
            Ok(claims) => println!("'{}' logged in successfully", claims.username()),
            Err(e) => warn!("cannot read username from token: {e}"),
        }

        local.upsert_server(Server {
            name: String::new(),
            server: server.clone(),
            insecure_tls: options.insecure_tls,
            keycloak_enable: true,
        });
    }

    local.upsert_auth(auth_cfg);
    local.upsert_user(User {
        name: server.clone(),
        auth_token,
        refresh_token,
    });
    local.current_context = ctx_name.clone();
    local.upsert_context(ContextRef {
        name: ctx_name.clone(),
        server: server.clone(),
        user: server,
        instance: String::new(),
    });

    local.write(&config_path)?;
    println!("Context '{ctx_name}' updated");
    Ok(())
}
