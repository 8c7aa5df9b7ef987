// ── UploadCoordinator ──
//
// Drives one transfer session through register → upload parts → finalize.
// The three phases run strictly in order. Parts fan out with bounded
// concurrency and report back by index, so completion tags always land on
// the part that produced them. A failure after Register leaves a resource
// that exists remotely but may lack its payload: the coordinator reports
// that as `Abandoned` and never attempts cleanup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use assetctl_api::types::{CompleteUploadRequest, Registration};
use assetctl_api::{AssetClient, StorageClient};
use futures_util::{StreamExt, stream};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chunk::{ByteRange, ChunkPlan, PART_SIZE, PartChecksum, compute_checksums, file_error, read_range};
use crate::error::{CoreError, Phase, ResultExt};
use crate::resource::{DesiredConfig, FilePolicy, FinalizeRoute, ResourceDescriptor, TrackedFile};
use crate::session::TransferSession;

// ── Options ──────────────────────────────────────────────────────────

/// Bounded retry for part PUTs.
///
/// The default is a single attempt: a failed part fails the session. Raising
/// `max_attempts` retries transport failures, throttling and 5xx responses
/// with capped exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 1
    }

    /// Delay before retry number `retry` (1-based).
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Maximum number of parts in flight.
    pub concurrency: usize,
    pub chunk_size: u64,
    pub retry: RetryPolicy,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            chunk_size: PART_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

// ── Progress ─────────────────────────────────────────────────────────

/// Receives transfer progress. All methods default to no-ops.
pub trait TransferObserver: Send + Sync {
    fn registered(&self, _resource_id: &str, _parts: usize, _total_bytes: u64) {}
    fn part_uploaded(&self, _part_number: u32, _bytes: u64) {}
    fn finalized(&self, _resource_id: &str) {}
}

pub struct NoopObserver;

impl TransferObserver for NoopObserver {}

// ── Prepared transfer ────────────────────────────────────────────────

/// A planned and checksummed payload, ready to register.
#[derive(Debug, Clone)]
pub struct PreparedTransfer {
    source: Option<PathBuf>,
    file_name: String,
    plan: ChunkPlan,
    checksums: Vec<PartChecksum>,
}

impl PreparedTransfer {
    /// Plan `path` into `chunk_size` parts and hash each part.
    pub async fn from_file(path: &Path, chunk_size: u64) -> Result<Self, CoreError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| file_error(path, e))?;
        if !meta.is_file() {
            return Err(CoreError::validation(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CoreError::validation(format!("{} has no usable file name", path.display()))
            })?
            .to_owned();

        let plan = ChunkPlan::plan(meta.len(), chunk_size)
            .map_err(|e| match e {
                CoreError::Validation { message } => CoreError::validation(format!(
                    "{}: {message}",
                    path.display()
                )),
                other => other,
            })?;
        let checksums = compute_checksums(path, &plan).await?;
        debug!(file = %path.display(), parts = plan.part_count(), "checksummed source file");

        Ok(Self {
            source: Some(path.to_path_buf()),
            file_name,
            plan,
            checksums,
        })
    }

    /// The transfer `desired` calls for: its source file, or a placeholder
    /// when the kind allows a missing file.
    pub async fn for_desired(desired: &DesiredConfig, chunk_size: u64) -> Result<Self, CoreError> {
        match (&desired.source, desired.kind.descriptor().file) {
            (Some(path), _) => Self::from_file(path, chunk_size).await,
            (None, FilePolicy::Optional { placeholder_name }) => {
                Ok(Self::placeholder(placeholder_name))
            }
            (None, FilePolicy::Required) => Err(CoreError::validation(format!(
                "a {} requires file_path",
                desired.kind
            ))),
        }
    }

    /// A payload-less transfer registered under `file_name`.
    pub fn placeholder(file_name: &str) -> Self {
        Self {
            source: None,
            file_name: file_name.to_owned(),
            plan: ChunkPlan::placeholder(),
            checksums: Vec::new(),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    pub fn checksums(&self) -> &[PartChecksum] {
        &self.checksums
    }

    pub fn tracked_file(&self) -> Option<TrackedFile> {
        self.source.as_ref().map(|path| TrackedFile {
            path: path.clone(),
            name: self.file_name.clone(),
            size: self.plan.total_size(),
        })
    }
}

// ── Coordinator ──────────────────────────────────────────────────────

pub struct TransferOutcome {
    pub registration: Registration,
    pub resource_id: String,
    pub session: TransferSession,
}

struct PartJob {
    index: usize,
    part_number: u32,
    url: String,
    range: ByteRange,
}

pub struct UploadCoordinator {
    client: Arc<AssetClient>,
    storage: StorageClient,
    options: UploadOptions,
    observer: Arc<dyn TransferObserver>,
}

impl UploadCoordinator {
    pub fn new(client: Arc<AssetClient>, storage: StorageClient, options: UploadOptions) -> Self {
        Self {
            client,
            storage,
            options,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn TransferObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Build a session for `transfer` and drive it to completion.
    pub async fn run(
        &self,
        descriptor: &ResourceDescriptor,
        metadata: Map<String, Value>,
        transfer: &PreparedTransfer,
        cancel: &CancellationToken,
    ) -> Result<TransferOutcome, CoreError> {
        let mut session = TransferSession::new(transfer.plan(), transfer.checksums().to_vec())?;
        let (registration, resource_id) = self
            .execute(&mut session, descriptor, metadata, transfer, cancel)
            .await?;
        Ok(TransferOutcome {
            registration,
            resource_id,
            session,
        })
    }

    /// Drive an idle `session` through the protocol.
    ///
    /// On error the session is left `Failed`. A placeholder session stops at
    /// `Registered`: there is nothing to upload or finalize.
    pub async fn execute(
        &self,
        session: &mut TransferSession,
        descriptor: &ResourceDescriptor,
        metadata: Map<String, Value>,
        transfer: &PreparedTransfer,
        cancel: &CancellationToken,
    ) -> Result<(Registration, String), CoreError> {
        let (registration, resource_id) = match self
            .register(session, descriptor, metadata, transfer, cancel)
            .await
        {
            Ok(registered) => registered,
            Err(e) => {
                session.fail();
                return Err(e);
            }
        };

        if session.is_placeholder() {
            info!(%resource_id, "registered without payload");
            return Ok((registration, resource_id));
        }

        match self
            .transfer(session, descriptor, &registration, &resource_id, transfer, cancel)
            .await
        {
            Ok(()) => Ok((registration, resource_id)),
            Err(source) => {
                session.fail();
                warn!(
                    %resource_id,
                    upload_id = %registration.upload_id,
                    error = %source,
                    "transfer abandoned after registration; remote resource may be incomplete"
                );
                Err(CoreError::Abandoned {
                    resource_id,
                    upload_id: registration.upload_id,
                    source: Box::new(source),
                })
            }
        }
    }

    async fn register(
        &self,
        session: &mut TransferSession,
        descriptor: &ResourceDescriptor,
        mut body: Map<String, Value>,
        transfer: &PreparedTransfer,
        cancel: &CancellationToken,
    ) -> Result<(Registration, String), CoreError> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled {
                phase: Phase::Register,
            });
        }

        body.insert("parts".into(), session.parts().len().into());
        body.insert("file_name".into(), transfer.file_name().into());
        if !session.is_placeholder() {
            body.insert("part_md5s".into(), session.checksums().into());
            if descriptor.declares_file_size {
                body.insert("file_size".into(), session.total_size().into());
            }
        }

        info!(
            kind = %descriptor.kind,
            parts = session.parts().len(),
            bytes = session.total_size(),
            "registering transfer"
        );
        let registration = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!(
                    kind = %descriptor.kind,
                    "registration dropped in flight; the service may have created the resource"
                );
                return Err(CoreError::Cancelled { phase: Phase::Register });
            }
            result = self.client.register(descriptor.collection, &body) => {
                result.during(Phase::Register)?
            }
        };

        let resource_id = registration
            .record
            .text(descriptor.id_field)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CoreError::MalformedResponse {
                phase: Phase::Register,
                message: format!("response has no {}", descriptor.id_field),
            })?
            .to_owned();

        if let Err(source) = session.register(
            registration.upload_id.clone(),
            registration.upload_urls.clone(),
        ) {
            warn!(
                %resource_id,
                upload_id = %registration.upload_id,
                error = %source,
                "registration rejected; remote resource left without payload"
            );
            return Err(CoreError::Abandoned {
                resource_id,
                upload_id: registration.upload_id,
                source: Box::new(source),
            });
        }

        self.observer
            .registered(&resource_id, session.parts().len(), session.total_size());
        Ok((registration, resource_id))
    }

    async fn transfer(
        &self,
        session: &mut TransferSession,
        descriptor: &ResourceDescriptor,
        registration: &Registration,
        resource_id: &str,
        transfer: &PreparedTransfer,
        cancel: &CancellationToken,
    ) -> Result<(), CoreError> {
        let (finalize_path, finalize_params) =
            finalize_endpoint(descriptor, resource_id, registration)?;
        let source = transfer
            .source()
            .ok_or_else(|| CoreError::Internal("transfer has no source file".into()))?;

        session.begin_upload()?;
        let jobs = session
            .parts()
            .iter()
            .map(|part| {
                let target = part.target().ok_or_else(|| {
                    CoreError::Internal(format!("part {} has no target", part.index() + 1))
                })?;
                Ok(PartJob {
                    index: part.index(),
                    part_number: target.part_number,
                    url: target.upload_url.clone(),
                    range: part.range(),
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        let mut uploads = stream::iter(jobs)
            .map(|job| self.upload_part(source, job, cancel))
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some(result) = uploads.next().await {
            let (index, tag) = result?;
            session.record_completion(index, tag)?;
        }
        session.complete_upload()?;

        let body = CompleteUploadRequest {
            parts: session.completed_parts()?,
            file_name: transfer.file_name().to_owned(),
        };
        info!(resource_id, parts = body.parts.len(), "finalizing transfer");
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(CoreError::Cancelled { phase: Phase::Finalize });
            }
            result = self.client.complete_upload(&finalize_path, &finalize_params, &body) => {
                result.during(Phase::Finalize)?;
            }
        }

        session.finalize()?;
        self.observer.finalized(resource_id);
        Ok(())
    }

    async fn upload_part(
        &self,
        source: &Path,
        job: PartJob,
        cancel: &CancellationToken,
    ) -> Result<(usize, String), CoreError> {
        let phase = Phase::UploadPart(job.part_number);
        let bytes = read_range(source, job.range).await?;
        let retry = &self.options.retry;
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CoreError::Cancelled { phase }),
                result = self.storage.put_part(job.part_number, &job.url, bytes.clone()) => result,
            };

            match result {
                Ok(tag) => {
                    debug!(part = job.part_number, attempt, "part uploaded");
                    self.observer.part_uploaded(job.part_number, job.range.len);
                    return Ok((job.index, tag));
                }
                Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                    let delay = retry.backoff(attempt);
                    warn!(
                        part = job.part_number,
                        attempt,
                        ?delay,
                        error = %e,
                        "part upload failed; retrying"
                    );
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => return Err(CoreError::Cancelled { phase }),
                        () = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(e) => return Err(CoreError::from_api(phase, e)),
            }
        }
    }
}

/// Completion path and query for the kind's finalize route.
fn finalize_endpoint(
    descriptor: &ResourceDescriptor,
    resource_id: &str,
    registration: &Registration,
) -> Result<(String, Vec<(&'static str, String)>), CoreError> {
    let collection = descriptor.collection;
    let upload_id = &registration.upload_id;
    match descriptor.finalize {
        FinalizeRoute::Versioned => {
            let version_id = registration
                .version_id
                .as_deref()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoreError::MalformedResponse {
                    phase: Phase::Register,
                    message: "response has no version_id".into(),
                })?;
            Ok((
                format!("{collection}/{resource_id}/version/{version_id}/complete_upload/{upload_id}"),
                Vec::new(),
            ))
        }
        FinalizeRoute::FileQuery => Ok((
            format!("{collection}/{resource_id}/file"),
            vec![("upload_id", upload_id.clone())],
        )),
    }
}
