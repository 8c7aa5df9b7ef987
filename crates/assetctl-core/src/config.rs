// ── Runtime client configuration ──
//
// These types describe how to reach the asset service. They carry the
// credential and transport tuning but never touch disk: the CLI builds a
// `ClientConfig` (usually through assetctl-config) and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::upload::RetryPolicy;

/// Credential attached to asset-service requests.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Identity token, sent raw in `Authorization`.
    Token(SecretString),
    /// Send requests unsigned.
    None,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed test deployments).
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub(crate) fn to_api(&self) -> assetctl_api::TlsMode {
        match self {
            Self::SystemDefaults => assetctl_api::TlsMode::System,
            Self::CustomCa(path) => assetctl_api::TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => assetctl_api::TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Configuration for talking to one asset service deployment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL (e.g. `https://sda.example.com`).
    pub url: Url,
    pub auth: Credentials,
    pub tls: TlsVerification,
    /// Timeout for asset-service calls.
    pub timeout: Duration,
    /// Timeout for a single part PUT.
    pub storage_timeout: Duration,
    /// Maximum number of parts in flight at once.
    pub upload_concurrency: usize,
    /// Part PUT retry policy. Defaults to a single attempt.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(url: Url, auth: Credentials) -> Self {
        Self {
            url,
            auth,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            storage_timeout: Duration::from_secs(300),
            upload_concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }

    pub(crate) fn transport(&self) -> assetctl_api::TransportConfig {
        assetctl_api::TransportConfig {
            tls: self.tls.to_api(),
            timeout: self.timeout,
            storage_timeout: self.storage_timeout,
        }
    }
}
