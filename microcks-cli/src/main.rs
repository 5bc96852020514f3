//! Microcks CLI entry point.
//!
//! Parses the command line, configures logging and dispatches to the
//! command implementations in [`commands`].

mod commands;
mod watcher;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use microcks_client::ConnectOptions;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "microcks",
    version,
    about = "A command line interface for interacting with Microcks",
    long_about = "microcks talks to a Microcks server to import API artifacts, run \
                  conformance tests and manage local instances. Connection details are \
                  taken from the current context unless server flags are given."
)]
struct Cli {
    /// Name of the context to use instead of the current one
    #[arg(long, global = true, default_value = "", hide_default_value = true)]
    context: String,

    /// Accept insecure HTTPS connections
    #[arg(long, global = true)]
    insecure: bool,

    /// Comma separated paths of CRT files to add to trusted root CAs
    #[arg(long = "caCerts", global = true, value_name = "PATHS")]
    ca_certs: Option<String>,

    /// Produce dumps of HTTP exchanges
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to a Microcks server and store the credentials in a context
    Login(commands::login::LoginArgs),
    /// Clear the stored tokens of a context
    Logout(commands::logout::LogoutArgs),
    /// List contexts, switch to another one or delete one
    #[command(alias = "ctx")]
    Context(commands::context::ContextArgs),
    /// Import API artifact files into Microcks
    Import(commands::import::ImportArgs),
    /// Import API artifacts from remote URLs
    ImportUrl(commands::import_url::ImportUrlArgs),
    /// Import every API artifact found in a directory
    ImportDir(commands::import_dir::ImportDirArgs),
    /// Launch a conformance test on a deployed service
    Test(commands::test::TestArgs),
    /// Start a local Microcks instance in a container
    Start(commands::start::StartArgs),
    /// Stop a local Microcks instance
    Stop(commands::stop::StopArgs),
    /// Watch registered artifact files and re-import them on change
    Watch,
    /// Print the CLI version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = connect_options(&cli);

    match cli.command {
        Commands::Login(args) => commands::login::execute(args, &options).await?,
        Commands::Logout(args) => commands::logout::execute(args)?,
        Commands::Context(args) => commands::context::execute(args)?,
        Commands::Import(args) => commands::import::execute(args, &cli.context, &options).await?,
        Commands::ImportUrl(args) => {
            commands::import_url::execute(args, &cli.context, &options).await?
        }
        Commands::ImportDir(args) => {
            commands::import_dir::execute(args, &cli.context, &options).await?
        }
        Commands::Test(args) => {
            let success = commands::test::execute(args, &cli.context, &options).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Start(args) => commands::start::execute(args).await?,
        Commands::Stop(args) => commands::stop::execute(args).await?,
        Commands::Watch => commands::watch::execute(&options).await?,
        Commands::Version => println!("{}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default_directives = if verbose {
        "info,microcks_cli=debug,microcks_client=debug,microcks_shared=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn connect_options(cli: &Cli) -> ConnectOptions {
    ConnectOptions {
        insecure_tls: cli.insecure,
        ca_cert_paths: cli
            .ca_certs
            .as_deref()
            .map(split_cert_paths)
            .unwrap_or_default(),
        verbose: cli.verbose,
        timeout: Some(Duration::from_secs(60)),
    }
}

fn split_cert_paths(paths: &str) -> Vec<PathBuf> {
    paths
        .split(',')
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}
