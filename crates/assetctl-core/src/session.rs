// ── Transfer session state machine ──
//
//   Idle → Registered → Uploading → Uploaded → Finalized
//     └──────────┴───────────┴──────────┴──→ Failed
//
// Parts are fixed once checksummed. Registration attaches one upload target
// per part; the only later mutation is recording a part's completion tag.

use assetctl_api::types::{CompletedPart, UploadTarget};
use strum::Display;

use crate::chunk::{ByteRange, ChunkPlan, PartChecksum};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionState {
    Idle,
    Registered,
    Uploading,
    Uploaded,
    Finalized,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }
}

/// One chunk of the source file.
#[derive(Debug, Clone)]
pub struct Part {
    index: usize,
    range: ByteRange,
    checksum: Option<PartChecksum>,
    target: Option<UploadTarget>,
    completion_tag: Option<String>,
}

impl Part {
    /// Zero-based position in the session.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// `None` only for the placeholder part.
    pub fn checksum(&self) -> Option<&PartChecksum> {
        self.checksum.as_ref()
    }

    pub fn target(&self) -> Option<&UploadTarget> {
        self.target.as_ref()
    }

    pub fn completion_tag(&self) -> Option<&str> {
        self.completion_tag.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct TransferSession {
    total_size: u64,
    chunk_size: u64,
    parts: Vec<Part>,
    state: SessionState,
    upload_id: Option<String>,
}

impl TransferSession {
    /// Build an idle session from a plan and its per-range checksums.
    pub fn new(plan: &ChunkPlan, checksums: Vec<PartChecksum>) -> Result<Self, CoreError> {
        let checksums: Vec<Option<PartChecksum>> = if plan.is_placeholder() {
            vec![None; plan.part_count()]
        } else if checksums.len() == plan.part_count() {
            checksums.into_iter().map(Some).collect()
        } else {
            return Err(CoreError::Internal(format!(
                "{} checksums for {} parts",
                checksums.len(),
                plan.part_count()
            )));
        };

        let parts = plan
            .ranges()
            .iter()
            .zip(checksums)
            .enumerate()
            .map(|(index, (range, checksum))| Part {
                index,
                range: *range,
                checksum,
                target: None,
                completion_tag: None,
            })
            .collect();

        Ok(Self {
            total_size: plan.total_size(),
            chunk_size: plan.chunk_size(),
            parts,
            state: SessionState::Idle,
            upload_id: None,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    pub fn is_placeholder(&self) -> bool {
        self.total_size == 0
    }

    /// Checksums in part order, for the registration body.
    pub fn checksums(&self) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| p.checksum.as_ref().map(PartChecksum::as_str))
            .collect()
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// `Idle → Registered`. Targets are matched to parts by position.
    ///
    /// A target count that differs from the part count fails the session.
    pub fn register(
        &mut self,
        upload_id: String,
        targets: Vec<UploadTarget>,
    ) -> Result<(), CoreError> {
        self.guard(&[SessionState::Idle], SessionState::Registered)?;

        if targets.len() != self.parts.len() {
            self.state = SessionState::Failed;
            return Err(CoreError::ProtocolMismatch {
                expected: self.parts.len(),
                actual: targets.len(),
            });
        }

        for (part, target) in self.parts.iter_mut().zip(targets) {
            part.target = Some(target);
        }
        self.upload_id = Some(upload_id);
        self.state = SessionState::Registered;
        Ok(())
    }

    /// `Registered → Uploading`.
    pub fn begin_upload(&mut self) -> Result<(), CoreError> {
        self.guard(&[SessionState::Registered], SessionState::Uploading)?;
        self.state = SessionState::Uploading;
        Ok(())
    }

    /// Record the completion tag for the part at `index`. Each part takes
    /// exactly one tag.
    pub fn record_completion(&mut self, index: usize, tag: String) -> Result<(), CoreError> {
        if self.state != SessionState::Uploading {
            return Err(CoreError::Internal(format!(
                "completion recorded while session is {}",
                self.state
            )));
        }
        let part = self
            .parts
            .get_mut(index)
            .ok_or_else(|| CoreError::Internal(format!("no part at index {index}")))?;
        if part.completion_tag.is_some() {
            return Err(CoreError::Internal(format!(
                "part {} already has a completion tag",
                index + 1
            )));
        }
        part.completion_tag = Some(tag);
        Ok(())
    }

    /// `Uploading → Uploaded`, once every part carries a tag.
    pub fn complete_upload(&mut self) -> Result<(), CoreError> {
        self.guard(&[SessionState::Uploading], SessionState::Uploaded)?;
        if let Some(part) = self.parts.iter().find(|p| p.completion_tag.is_none()) {
            return Err(CoreError::Internal(format!(
                "part {} has no completion tag",
                part.index + 1
            )));
        }
        self.state = SessionState::Uploaded;
        Ok(())
    }

    /// `Uploaded → Finalized`.
    pub fn finalize(&mut self) -> Result<(), CoreError> {
        self.guard(&[SessionState::Uploaded], SessionState::Finalized)?;
        self.state = SessionState::Finalized;
        Ok(())
    }

    /// Any non-terminal state → `Failed`.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Failed;
        }
    }

    /// The finalize list: `(part number, tag)` in part order.
    ///
    /// Part numbers come from the issued targets.
    pub fn completed_parts(&self) -> Result<Vec<CompletedPart>, CoreError> {
        self.parts
            .iter()
            .map(|p| match (&p.target, &p.completion_tag) {
                (Some(target), Some(tag)) => Ok(CompletedPart {
                    part_number: target.part_number,
                    etag: tag.clone(),
                }),
                _ => Err(CoreError::Internal(format!(
                    "part {} is not complete",
                    p.index + 1
                ))),
            })
            .collect()
    }

    fn guard(&self, from: &[SessionState], to: SessionState) -> Result<(), CoreError> {
        if from.contains(&self.state) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: self.state,
                to,
            })
        }
    }
}
