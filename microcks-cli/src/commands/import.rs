//! `import` uploads local artifact files and can register them in the
//! watch registry for automatic re-import on change.

use std::path::Path;

use clap::Args;
use microcks_client::ConnectOptions;
use microcks_shared::config;
use microcks_shared::{Result, WatchConfig, WatchEntry};
use tracing::warn;

use super::ServerArgs;

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Comma separated artifact files, each with an optional `:primary`
    /// boolean suffix, e.g. `api.yaml,postman.json:false`
    #[arg(value_name = "FILE[:primary],...")]
    pub specification_files: String,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Register the files so `microcks watch` re-imports them on change
    #[arg(long)]
    pub watch: bool,
}

pub async fn execute(args: ImportArgs, context: &str, options: &ConnectOptions) -> Result<()> {
    let handle = super::connect(&args.server, context, options).await?;

    for spec in args.specification_files.split(',') {
        let (file, main_artifact) = split_file_spec(spec);

        let msg = handle
            .client
            .upload_artifact(Path::new(&file), main_artifact)
            .await?;
        println!("Microcks has discovered '{msg}'");

        if args.watch {
            register_for_watching(&file, &handle.context_label, main_artifact)?;
        }
    }
    Ok(())
}

/// Splits `path[:primary]` into the file path and the main-artifact flag.
/// URLs are passed through untouched, their scheme colon is not a separator.
fn split_file_spec(spec: &str) -> (String, bool) {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        return (spec.to_string(), true);
    }
    match spec.split_once(':') {
        Some((file, flag)) => match flag.parse::<bool>() {
            Ok(value) => (file.to_string(), value),
            Err(_) => {
                warn!("cannot parse '{flag}' as bool, defaulting to true");
                (file.to_string(), true)
            }
        },
        None => (spec.to_string(), true),
    }
}

fn register_for_watching(file: &str, context: &str, main_artifact: bool) -> Result<()> {
    let watch_path = config::default_watch_path()?;
    let mut registry = WatchConfig::read(&watch_path)?.unwrap_or_default();

    let file_path = file.strip_prefix("./").unwrap_or(file).to_string();
    registry.upsert_entry(WatchEntry {
        file_path: file_path.clone(),
        context: vec![context.to_string()],
        main_artifact,
    });
    registry.write(&watch_path)?;

    println!("Now watching '{file_path}' for changes");
    Ok(())
}
