//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a distinct exit code per failure class.

use miette::Diagnostic;
use thiserror::Error;

use assetctl_config::ConfigError;
use assetctl_core::{CoreError, Phase};

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const ABANDONED: i32 = 8;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the asset service during {phase}: {message}")]
    #[diagnostic(
        code(assetctl::connection_failed),
        help(
            "Check that the service URL is correct and reachable.\n\
             Self-signed deployments need --insecure (-k) or ca_cert in the profile."
        )
    )]
    ConnectionFailed { phase: String, message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Access denied during {phase}")]
    #[diagnostic(
        code(assetctl::forbidden),
        help(
            "Check that the token is valid and its permission scope covers this asset.\n\
             Server said: {body}"
        )
    )]
    Forbidden { phase: String, body: String },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(assetctl::no_credentials),
        help(
            "Store one with: assetctl config set-token --profile {profile}\n\
             Or pass --token / set ASSETCTL_TOKEN."
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{what} not found during {phase}")]
    #[diagnostic(code(assetctl::not_found), help("Server said: {body}"))]
    NotFound {
        what: String,
        phase: String,
        body: String,
    },

    #[error("No tracked state at {path}")]
    #[diagnostic(
        code(assetctl::no_state),
        help("Nothing has been applied from this manifest yet. Run: assetctl apply -f <manifest>")
    )]
    NoState { path: String },

    #[error("{kind} {id} was modified on the server since version {version}")]
    #[diagnostic(
        code(assetctl::conflict),
        help(
            "Run: assetctl refresh -f <manifest>, review with plan, then apply again.\n\
             Server said: {body}"
        )
    )]
    Conflict {
        kind: String,
        id: String,
        version: i64,
        body: String,
    },

    #[error("Transfer abandoned: {kind} {resource_id} exists but its upload did not complete")]
    #[diagnostic(
        code(assetctl::abandoned),
        help(
            "Upload session {upload_id} was left open and is not tracked locally.\n\
             Remove the partial resource on the service before applying again.\n\
             Cause: {cause}"
        )
    )]
    Abandoned {
        kind: String,
        resource_id: String,
        upload_id: String,
        cause: String,
    },

    #[error("Cancelled during {phase}")]
    #[diagnostic(code(assetctl::cancelled), help("{hint}"))]
    Cancelled { phase: String, hint: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Asset service returned HTTP {status} during {phase}")]
    #[diagnostic(code(assetctl::api_error), help("Server said: {body}"))]
    Api {
        phase: String,
        status: u16,
        body: String,
    },

    #[error("Protocol error: {message}")]
    #[diagnostic(
        code(assetctl::protocol),
        help("The service answered in an unexpected shape. Re-run with -vv for request logs.")
    )]
    Protocol { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(assetctl::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid manifest {path}")]
    #[diagnostic(
        code(assetctl::manifest),
        help("A manifest is `kind: document|license|project` plus a `spec:` mapping.\n{reason}")
    )]
    Manifest { path: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(assetctl::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(assetctl::no_config),
        help(
            "Create a profile in {path}\n\
             or pass --url and --token directly."
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(assetctl::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(assetctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(assetctl::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML: {0}")]
    #[diagnostic(code(assetctl::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } | Self::NoState { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Abandoned { .. } => exit_code::ABANDONED,
            Self::Cancelled { .. } => exit_code::CANCELLED,
            Self::Validation { .. }
            | Self::Manifest { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Name the resource kind on an abandoned transfer.
    pub fn with_kind(mut self, resource_kind: impl std::fmt::Display) -> Self {
        if let Self::Abandoned { kind, .. } = &mut self {
            *kind = resource_kind.to_string();
        }
        self
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => Self::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::File { path, source } => Self::Validation {
                field: "file_path".into(),
                reason: format!("cannot read {}: {source}", path.display()),
            },

            CoreError::Transport { phase, message } => Self::ConnectionFailed {
                phase: phase.to_string(),
                message,
            },

            CoreError::NotFound { phase, body } => Self::NotFound {
                what: "Resource".into(),
                phase: phase.to_string(),
                body,
            },

            CoreError::Forbidden { phase, body } => Self::Forbidden {
                phase: phase.to_string(),
                body,
            },

            CoreError::Server {
                phase,
                status,
                body,
            } => Self::Api {
                phase: phase.to_string(),
                status,
                body,
            },

            CoreError::ConcurrencyConflict {
                kind,
                id,
                version,
                body,
            } => Self::Conflict {
                kind,
                id,
                version,
                body,
            },

            CoreError::Cancelled { phase } => Self::Cancelled {
                phase: phase.to_string(),
                hint: cancel_hint(phase).into(),
            },

            CoreError::Abandoned {
                resource_id,
                upload_id,
                source,
            } => Self::Abandoned {
                kind: "resource".into(),
                resource_id,
                upload_id,
                cause: source.to_string(),
            },

            err @ (CoreError::ProtocolMismatch { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::MalformedResponse { .. }) => Self::Protocol {
                message: err.to_string(),
            },

            CoreError::Config { message } => Self::Config { message },

            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

/// What an interrupted request may have left behind.
fn cancel_hint(phase: Phase) -> &'static str {
    match phase {
        Phase::Register => {
            "The registration request was dropped in flight; the service may already \
             have created the resource. Nothing was written to the state file."
        }
        Phase::Update | Phase::Delete => {
            "The request may already have been applied. Run: assetctl refresh -f <manifest>"
        }
        Phase::UploadPart(_) | Phase::Finalize | Phase::Read => "No remote change was recorded.",
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownProfile { profile } => Self::ProfileNotFound {
                name: profile,
                available: String::new(),
            },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}
