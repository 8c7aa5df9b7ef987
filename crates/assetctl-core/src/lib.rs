//! Multipart transfer and version-guarded reconciliation for SDA assets.
//!
//! This crate owns the engineering core shared by every asset kind:
//!
//! - **Transfer path**: [`ChunkPlan`] splits a file into fixed-size ranges,
//!   [`chunk::compute_checksums`] hashes each one (MD5, base64), and
//!   [`UploadCoordinator`] drives a [`TransferSession`] through
//!   register → upload parts → finalize.
//!
//! - **Update path**: [`Reconciler`] diffs a [`DesiredConfig`] against the
//!   last-known [`ResourceSnapshot`] into a minimal [`Patch`] carrying the
//!   version stamp; [`StateProjector`] maps the server's answer back into a
//!   snapshot.
//!
//! - **Resources** ([`resource`]): static descriptors for documents,
//!   licenses, and projects, plus the typed [`Manifest`] specs.
//!
//! [`AssetService`] is the facade the CLI talks to.

pub mod chunk;
pub mod config;
pub mod error;
pub mod field;
pub mod projector;
pub mod reconcile;
pub mod resource;
pub mod service;
pub mod session;
pub mod upload;

// ── Primary re-exports ──────────────────────────────────────────────
pub use chunk::{ByteRange, ChunkPlan, PART_SIZE, PartChecksum};
pub use config::{ClientConfig, Credentials, TlsVerification};
pub use error::{CoreError, Phase};
pub use field::{Field, FieldValue};
pub use projector::StateProjector;
pub use reconcile::{Patch, Reconciler};
pub use resource::{DesiredConfig, Manifest, ResourceKind, ResourceSnapshot, TrackedFile};
pub use service::AssetService;
pub use session::{SessionState, TransferSession};
pub use upload::{
    PreparedTransfer, RetryPolicy, TransferObserver, UploadCoordinator, UploadOptions,
};
