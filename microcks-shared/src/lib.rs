//! Shared types and configuration model for the Microcks CLI
//!
//! This crate holds everything the CLI binary and the HTTP clients have in
//! common: the on-disk configuration store (`config`), the watch registry
//! (`watch`), the API data transfer types (`types`) and the error taxonomy
//! (`error`).

pub mod config;
pub mod error;
pub mod types;
pub mod watch;

pub use config::{
    Auth, ContextRef, Instance, InstanceStatus, LocalConfig, ResolvedContext, Server, User,
};
pub use error::{MicrocksError, Result};
pub use types::{HeaderDto, OAuth2ClientContext, RunnerType, TestRequest, TestResultSummary};
pub use watch::{WatchConfig, WatchEntry};
