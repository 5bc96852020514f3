//! Connection options threaded through client construction

use std::path::PathBuf;
use std::time::Duration;

use microcks_shared::Result;

/// TLS and transport settings shared by every HTTP client the CLI builds.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Skip verification of the server certificate chain
    pub insecure_tls: bool,
    /// Extra root certificates, PEM files
    pub ca_cert_paths: Vec<PathBuf>,
    /// Dump request and response details
    pub verbose: bool,
    pub timeout: Option<Duration>,
}

impl ConnectOptions {
    /// Builds a reqwest client honouring these options.
    pub fn build_http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if self.insecure_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        for path in &self.ca_cert_paths {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        Ok(builder.build()?)
    }
}
