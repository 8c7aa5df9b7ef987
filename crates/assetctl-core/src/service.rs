// ── Asset service facade ──
//
// Ties the transfer and reconcile halves into the resource lifecycle:
// create (plan, checksum, upload, project), read, plan, update, delete.
// One `AssetService` serves every kind; the descriptor supplies the
// kind-specific routes and field rules.

use std::sync::Arc;

use assetctl_api::{AssetClient, IdToken, RequestSigner, StorageClient, Unsigned};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{ClientConfig, Credentials};
use crate::error::{CoreError, Phase};
use crate::projector::StateProjector;
use crate::reconcile::{Patch, Reconciler};
use crate::resource::{DesiredConfig, ResourceSnapshot};
use crate::upload::{PreparedTransfer, TransferObserver, UploadCoordinator, UploadOptions};

/// Entry point for resource lifecycle operations.
///
/// Holds a cancellation token shared by every in-flight transfer; cancel it
/// to abort uploads deterministically.
pub struct AssetService {
    client: Arc<AssetClient>,
    coordinator: UploadCoordinator,
    cancel: CancellationToken,
}

impl AssetService {
    pub fn new(config: &ClientConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let signer: Arc<dyn RequestSigner> = match &config.auth {
            Credentials::Token(token) => {
                Arc::new(IdToken::new(token).map_err(config_error)?)
            }
            Credentials::None => Arc::new(Unsigned),
        };

        let client =
            AssetClient::new(config.url.as_str(), signer, &transport).map_err(config_error)?;
        let storage = StorageClient::new(&transport).map_err(config_error)?;
        let options = UploadOptions {
            concurrency: config.upload_concurrency,
            retry: config.retry.clone(),
            ..UploadOptions::default()
        };
        if options.retry.is_enabled() {
            info!(
                attempts = options.retry.max_attempts,
                "part upload retry enabled"
            );
        }

        Ok(Self::from_parts(Arc::new(client), storage, options))
    }

    /// Assemble from pre-built clients.
    pub fn from_parts(
        client: Arc<AssetClient>,
        storage: StorageClient,
        options: UploadOptions,
    ) -> Self {
        Self {
            coordinator: UploadCoordinator::new(Arc::clone(&client), storage, options),
            client,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.coordinator = self.coordinator.with_observer(observer);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ── Create ───────────────────────────────────────────────────────

    /// Register the resource, upload its file, and finalize.
    pub async fn create(&self, desired: &DesiredConfig) -> Result<ResourceSnapshot, CoreError> {
        let descriptor = desired.kind.descriptor();
        let transfer = self.prepare(desired).await?;
        let metadata = desired.registration_body(descriptor);

        let outcome = self
            .coordinator
            .run(descriptor, metadata, &transfer, &self.cancel)
            .await?;
        info!(
            kind = %desired.kind,
            id = %outcome.resource_id,
            state = %outcome.session.state(),
            "created"
        );

        StateProjector::new(descriptor).created(
            &outcome.registration.record,
            outcome.registration.version_id.clone(),
            desired,
            transfer.tracked_file(),
        )
    }

    /// Plan and checksum the source file, or fall back to a placeholder.
    pub async fn prepare(&self, desired: &DesiredConfig) -> Result<PreparedTransfer, CoreError> {
        PreparedTransfer::for_desired(desired, self.coordinator.options().chunk_size).await
    }

    // ── Read ─────────────────────────────────────────────────────────

    /// Refresh a snapshot from the server. `None` means the resource is gone
    /// and should be dropped from tracked state.
    pub async fn read(
        &self,
        previous: &ResourceSnapshot,
    ) -> Result<Option<ResourceSnapshot>, CoreError> {
        let descriptor = previous.kind.descriptor();
        let path = descriptor.record_path(&previous.id);

        let record = match self.client.get_record(&path).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                info!(kind = %previous.kind, id = %previous.id, "resource no longer exists");
                return Ok(None);
            }
            Err(e) => return Err(CoreError::from_api(Phase::Read, e)),
        };

        StateProjector::new(descriptor)
            .read(&record, previous)
            .map(Some)
    }

    // ── Update ───────────────────────────────────────────────────────

    /// The patch `update` would send. Nothing is sent.
    pub fn plan(
        &self,
        desired: &DesiredConfig,
        snapshot: &ResourceSnapshot,
    ) -> Result<Patch, CoreError> {
        Reconciler::new(snapshot.kind.descriptor()).diff(desired, snapshot)
    }

    /// Apply the minimal version-guarded patch.
    ///
    /// An empty patch is not sent. A patch touching fields that cannot change
    /// in place is refused before any call.
    pub async fn update(
        &self,
        desired: &DesiredConfig,
        snapshot: &ResourceSnapshot,
    ) -> Result<ResourceSnapshot, CoreError> {
        let descriptor = snapshot.kind.descriptor();
        let patch = self.plan(desired, snapshot)?;

        if !patch.replacements().is_empty() {
            return Err(CoreError::validation(format!(
                "{} {} cannot change in place: {} (destroy and re-apply)",
                snapshot.kind,
                snapshot.id,
                patch.replacements().join(", ")
            )));
        }
        if patch.is_empty() {
            debug!(kind = %snapshot.kind, id = %snapshot.id, "no changes");
            return Ok(snapshot.clone());
        }

        let path = descriptor.record_path(&snapshot.id);
        info!(
            kind = %snapshot.kind,
            id = %snapshot.id,
            version = snapshot.object_version,
            fields = patch.changes().len(),
            "updating"
        );
        let record = match self.client.patch_record(&path, &patch).await {
            Ok(record) => record,
            Err(assetctl_api::Error::Api {
                status: 409 | 412,
                body,
            }) => {
                return Err(CoreError::ConcurrencyConflict {
                    kind: snapshot.kind.to_string(),
                    id: snapshot.id.clone(),
                    version: snapshot.object_version,
                    body,
                });
            }
            Err(e) => return Err(CoreError::from_api(Phase::Update, e)),
        };

        StateProjector::new(descriptor).updated(&record, snapshot, desired, &patch)
    }

    // ── Delete ───────────────────────────────────────────────────────

    /// Delete the resource. A 404 counts as already deleted.
    pub async fn delete(&self, snapshot: &ResourceSnapshot) -> Result<(), CoreError> {
        let path = snapshot.kind.descriptor().record_path(&snapshot.id);
        match self.client.delete_record(&path).await {
            Ok(()) => {
                info!(kind = %snapshot.kind, id = %snapshot.id, "deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(kind = %snapshot.kind, id = %snapshot.id, "already gone");
                Ok(())
            }
            Err(e) => Err(CoreError::from_api(Phase::Delete, e)),
        }
    }
}

fn config_error(err: assetctl_api::Error) -> CoreError {
    CoreError::Config {
        message: err.to_string(),
    }
}
