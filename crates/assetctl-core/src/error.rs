// ── Core error types ──
//
// Domain errors from assetctl-core. Consumers see which protocol phase
// failed and why, never a raw reqwest error. `ResultExt::during` translates
// transport-layer errors into these variants, tagging each with its phase.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::session::SessionState;

/// The protocol step a network error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Register,
    /// 1-based part number.
    UploadPart(u32),
    Finalize,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => f.write_str("register"),
            Self::UploadPart(n) => write!(f, "upload of part {n}"),
            Self::Finalize => f.write_str("finalize"),
            Self::Read => f.write_str("read"),
            Self::Update => f.write_str("update"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local errors (nothing sent) ──────────────────────────────────
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Protocol errors ──────────────────────────────────────────────
    #[error("Protocol mismatch: requested {expected} upload targets, server issued {actual}")]
    ProtocolMismatch { expected: usize, actual: usize },

    #[error("Invalid transfer session transition: {from} -> {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("Malformed response during {phase}: {message}")]
    MalformedResponse { phase: Phase, message: String },

    // ── Network errors ───────────────────────────────────────────────
    #[error("Transport error during {phase}: {message}")]
    Transport { phase: Phase, message: String },

    #[error("Not found during {phase}: {body}")]
    NotFound { phase: Phase, body: String },

    #[error("Forbidden during {phase}: {body}")]
    Forbidden { phase: Phase, body: String },

    #[error("Server returned HTTP {status} during {phase}: {body}")]
    Server {
        phase: Phase,
        status: u16,
        body: String,
    },

    #[error("Concurrency conflict: {kind} {id} changed on the server since version {version}")]
    ConcurrencyConflict {
        kind: String,
        id: String,
        version: i64,
        body: String,
    },

    // ── Lifecycle ────────────────────────────────────────────────────
    /// The caller's token fired. During `Register` the request is dropped
    /// in flight, so the service may still have created the resource.
    #[error("Cancelled during {phase}")]
    Cancelled { phase: Phase },

    /// A failure after a successful Register. The resource exists remotely
    /// but its payload may be incomplete; nothing cleans it up.
    #[error(
        "Transfer abandoned after registration (resource {resource_id}, upload {upload_id}): {source}"
    )]
    Abandoned {
        resource_id: String,
        upload_id: String,
        source: Box<CoreError>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The innermost error, looking through `Abandoned`.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::Abandoned { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Translate a transport-layer error raised during `phase`.
    pub fn from_api(phase: Phase, err: assetctl_api::Error) -> Self {
        use assetctl_api::Error as Api;

        match err {
            Api::Transport(e) => Self::Transport {
                phase,
                message: e.to_string(),
            },
            Api::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(message) => Self::Config {
                message: format!("TLS error: {message}"),
            },
            Api::InvalidToken { message } => Self::Config { message },
            Api::Api { status: 404, body } => Self::NotFound { phase, body },
            Api::Api { status: 403, body } | Api::Storage {
                status: 403, body, ..
            } => Self::Forbidden { phase, body },
            Api::Api { status, body } | Api::Storage { status, body, .. } => Self::Server {
                phase,
                status,
                body,
            },
            Api::MissingCompletionTag { part_number } => Self::MalformedResponse {
                phase,
                message: format!("no ETag returned for part {part_number}"),
            },
            Api::Deserialization { message, .. } => Self::MalformedResponse { phase, message },
        }
    }
}

/// Attach a protocol phase to a transport-layer result.
pub trait ResultExt<T> {
    fn during(self, phase: Phase) -> Result<T, CoreError>;
}

impl<T> ResultExt<T> for Result<T, assetctl_api::Error> {
    fn during(self, phase: Phase) -> Result<T, CoreError> {
        self.map_err(|e| CoreError::from_api(phase, e))
    }
}
