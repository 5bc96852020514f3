//! `start` launches a local Microcks container and records it, together
//! with a matching server, user and context, in the local configuration.

use clap::Args;
use microcks_client::{ContainerClient, ContainerOpts, Driver};
use microcks_shared::config::{self, ContextRef, Instance, InstanceStatus, LocalConfig, Server, User};
use microcks_shared::Result;

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Name for the Microcks instance
    #[arg(long, default_value = "microcks")]
    pub name: String,

    /// Host port the instance is exposed on
    #[arg(long, default_value = "8585")]
    pub port: String,

    /// Image used to create the container
    #[arg(long, default_value = "quay.io/microcks/microcks-uber:latest-native")]
    pub image: String,

    /// Remove the container and its records once it stops
    #[arg(long = "rm")]
    pub auto_remove: bool,

    /// Container runtime to use, docker or podman
    #[arg(long, default_value = "docker")]
    pub driver: Driver,
}

pub async fn execute(args: StartArgs) -> Result<()> {
    let config_path = config::default_config_path()?;
    let mut local = LocalConfig::read(&config_path)?.unwrap_or_default();
    let client = ContainerClient::new(args.driver);

    // A known instance is resumed instead of recreated.
    if let Ok(instance) = local.get_instance(&args.name) {
        match instance.status {
            InstanceStatus::Running => {
                println!("Microcks is already running.");
                return Ok(());
            }
            InstanceStatus::Created | InstanceStatus::Stopped | InstanceStatus::Exited => {
                let mut instance = instance.clone();
                client.start_container(&instance.container_id).await?;
                instance.status = InstanceStatus::Running;
                local.upsert_instance(instance);
                local.write(&config_path)?;
                println!("Microcks started successfully...");
                return Ok(());
            }
            InstanceStatus::None => {}
        }
    }

    let opts = ContainerOpts {
        image: args.image.clone(),
        port: args.port.clone(),
        auto_remove: args.auto_remove,
        name: args.name.clone(),
    };
    let container_id = client.create_container(&opts).await?;

    let mut instance = Instance {
        name: args.name.clone(),
        image: args.image,
        status: InstanceStatus::Created,
        port: args.port.clone(),
        container_id: container_id.clone(),
        auto_remove: args.auto_remove,
        driver: args.driver.to_string(),
    };

    client.start_container(&container_id).await?;
    instance.status = InstanceStatus::Running;

    // Wire a ready-to-use context around the fresh instance. The uber image
    // runs without authentication, so the user record carries no tokens.
    let server_addr = format!("http://localhost:{}", args.port);
    local.upsert_instance(instance);
    local.upsert_server(Server {
        name: args.name.clone(),
        server: server_addr.clone(),
        insecure_tls: false,
        keycloak_enable: false,
    });
    local.upsert_user(User {
        name: server_addr.clone(),
        ..Default::default()
    });
    local.upsert_context(ContextRef {
        name: args.name.clone(),
        server: server_addr.clone(),
        user: server_addr.clone(),
        instance: args.name.clone(),
    });
    local.current_context = args.name;
    local.write(&config_path)?;

    println!("Microcks started successfully, reachable at {server_addr}");
    Ok(())
}
