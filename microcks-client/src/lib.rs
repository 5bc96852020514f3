//! Clients for the Microcks server, its Keycloak authentication and the
//! local container runtime
//!
//! The [`MicrocksClient`] talks to the Microcks APIs with a bearer token and
//! refreshes expired tokens transparently when built from a stored context.
//! The [`KeycloakClient`] handles the OAuth grants behind that. The
//! [`ContainerClient`] drives a local docker or podman binary to start and
//! stop Microcks instances.

pub mod auth;
pub mod container;
pub mod keycloak;
pub mod microcks;
pub mod options;

pub use container::{ContainerClient, ContainerOpts, Driver};
pub use keycloak::KeycloakClient;
pub use microcks::{MicrocksClient, TestSpec};
pub use options::ConnectOptions;
