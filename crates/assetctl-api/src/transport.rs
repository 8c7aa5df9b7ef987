// Shared transport configuration for building reqwest::Client instances.
//
// The asset-service client and the storage client share TLS and timeout
// settings through this module, avoiding duplicated builder logic. They use
// separate timeouts because a part PUT moves megabytes while API calls
// move a few hundred bytes of JSON.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

const USER_AGENT: &str = concat!("assetctl/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode (api-level mirror of core's TlsVerification).
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (test environments with self-signed certs).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Overall timeout for asset-service calls.
    pub timeout: Duration,
    /// Overall timeout for a single part upload.
    pub storage_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            storage_timeout: Duration::from_secs(300),
        }
    }
}

impl TransportConfig {
    /// Build the `reqwest::Client` used for asset-service calls.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.builder(self.timeout)?
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build the `reqwest::Client` used for part uploads.
    ///
    /// Upload targets are pre-signed, so this client never carries the
    /// asset-service credential.
    pub fn build_storage_client(&self) -> Result<reqwest::Client, Error> {
        self.builder(self.storage_timeout)?
            .build()
            .map_err(|e| Error::Tls(format!("failed to build storage client: {e}")))
    }

    fn builder(&self, timeout: Duration) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_ca_file_is_a_tls_error() {
        let config = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/ca.pem")),
            ..TransportConfig::default()
        };
        let err = config.build_client().unwrap_err();
        assert!(matches!(err, Error::Tls(msg) if msg.contains("failed to read CA cert")));
    }

    #[test]
    fn default_timeouts() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.storage_timeout > config.timeout);
    }
}
