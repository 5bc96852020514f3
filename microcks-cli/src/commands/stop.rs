//! `stop` halts a locally-started Microcks container. With autoRemove set
//! the instance and the records only it references are dropped.

use std::io::Write;

use clap::Args;
use microcks_client::{ContainerClient, Driver};
use microcks_shared::config::{self, InstanceStatus, LocalConfig};
use microcks_shared::{MicrocksError, Result};

use super::context::remove_context_records;

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Name of the instance to stop
    #[arg(long, default_value = "microcks")]
    pub name: String,
}

pub async fn execute(args: StopArgs) -> Result<()> {
    let config_path = config::default_config_path()?;
    let mut local = LocalConfig::read(&config_path)?
        .ok_or_else(|| MicrocksError::NotFound("no configuration found, nothing to stop".into()))?;

    let instance = local.get_instance(&args.name)?.clone();

    // Records written before containers existed carry no driver.
    let driver = if instance.driver.is_empty() {
        Driver::Docker
    } else {
        instance.driver.parse()?
    };
    let client = ContainerClient::new(driver);

    print!("Stopping container {}... ", instance.container_id);
    std::io::stdout().flush()?;
    client.stop_container(&instance.container_id).await?;
    println!("Success");

    if instance.auto_remove {
        local.remove_instance(&args.name);
        // The runtime removed the container, drop the records around it.
        let referencing: Vec<String> = local
            .contexts
            .iter()
            .filter(|c| c.instance == args.name)
            .map(|c| c.name.clone())
            .collect();
        for context in referencing {
            remove_context_records(&mut local, &context);
        }
        if local.is_empty() {
            LocalConfig::delete(&config_path)?;
        } else {
            local.write(&config_path)?;
        }
    } else {
        let mut instance = instance;
        instance.status = InstanceStatus::Stopped;
        local.upsert_instance(instance);
        local.write(&config_path)?;
    }

    println!("Microcks stopped successfully...");
    Ok(())
}
