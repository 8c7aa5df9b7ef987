use thiserror::Error;

/// Top-level error type for the `assetctl-api` crate.
///
/// Covers every failure mode of the raw HTTP layer: transport, asset-service
/// responses, and object-storage part writes. `assetctl-core` maps these into
/// the domain taxonomy (validation, protocol, transport, server, conflict).
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Signing ─────────────────────────────────────────────────────
    /// The configured token cannot be used as a header value.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    // ── Asset service ───────────────────────────────────────────────
    /// Non-2xx response from the asset service. `body` is kept verbatim.
    #[error("Asset service error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    // ── Object storage ──────────────────────────────────────────────
    /// Non-2xx response from an upload target.
    #[error("Storage rejected part {part_number} (HTTP {status}): {body}")]
    Storage {
        part_number: u32,
        status: u16,
        body: String,
    },

    /// Upload target accepted the bytes but returned no `ETag`.
    #[error("Storage returned no completion tag for part {part_number}")]
    MissingCompletionTag { part_number: u32 },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Storage { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Timeouts, connection failures, throttling and 5xx responses qualify.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } | Self::Storage { status, .. } => {
                *status == 429 || (500..600).contains(status)
            }
            _ => false,
        }
    }
}
