// ── Chunk planning and per-part checksums ──
//
// A file of S bytes splits into N = ceil(S / C) contiguous ranges, each C
// bytes except the last. Each range gets an MD5 digest in padded base64,
// declared at registration so the storage endpoint can reject mismatched
// bytes. Digests are never re-checked locally after upload.

use std::fmt;
use std::io::SeekFrom;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use md5::{Digest, Md5};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::error::CoreError;

/// Default part size: 5 MiB.
pub const PART_SIZE: u64 = 5 * 1024 * 1024;

/// A half-open byte range `[offset, offset + len)` into the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub offset: u64,
    pub len: u64,
}

impl ByteRange {
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Ordered, gap-free ranges covering a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
    ranges: Vec<ByteRange>,
}

impl ChunkPlan {
    /// Split `total_size` bytes into `chunk_size` ranges.
    ///
    /// Both sizes must be positive: an empty file is rejected before any
    /// network call.
    pub fn plan(total_size: u64, chunk_size: u64) -> Result<Self, CoreError> {
        if chunk_size == 0 {
            return Err(CoreError::validation("chunk size must be greater than zero"));
        }
        if total_size == 0 {
            return Err(CoreError::validation("file is empty"));
        }

        let count = total_size.div_ceil(chunk_size);
        let ranges = (0..count)
            .map(|i| {
                let offset = i * chunk_size;
                ByteRange {
                    offset,
                    len: chunk_size.min(total_size - offset),
                }
            })
            .collect();

        Ok(Self {
            total_size,
            chunk_size,
            ranges,
        })
    }

    /// The one-part, zero-byte plan registered for resources without a file.
    pub fn placeholder() -> Self {
        Self {
            total_size: 0,
            chunk_size: PART_SIZE,
            ranges: vec![ByteRange { offset: 0, len: 0 }],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.total_size == 0
    }

    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    pub fn part_count(&self) -> usize {
        self.ranges.len()
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }
}

/// MD5 digest of one part, standard base64 with padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PartChecksum(String);

impl PartChecksum {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn checksum(data: &[u8]) -> PartChecksum {
    let digest = Md5::digest(data);
    PartChecksum(STANDARD.encode(digest))
}

/// Hash every range of `path` in order, holding one range in memory at a time.
pub async fn compute_checksums(
    path: &Path,
    plan: &ChunkPlan,
) -> Result<Vec<PartChecksum>, CoreError> {
    let mut file = open(path).await?;
    let mut buf = Vec::new();
    let mut sums = Vec::with_capacity(plan.part_count());

    for range in plan.ranges() {
        buf.resize(buffer_len(range)?, 0);
        file.seek(SeekFrom::Start(range.offset))
            .await
            .map_err(|e| file_error(path, e))?;
        file.read_exact(&mut buf)
            .await
            .map_err(|e| file_error(path, e))?;
        sums.push(checksum(&buf));
    }

    Ok(sums)
}

/// Read one range's bytes for upload.
pub async fn read_range(path: &Path, range: ByteRange) -> Result<Bytes, CoreError> {
    let mut file = open(path).await?;
    let mut buf = vec![0u8; buffer_len(&range)?];
    file.seek(SeekFrom::Start(range.offset))
        .await
        .map_err(|e| file_error(path, e))?;
    file.read_exact(&mut buf)
        .await
        .map_err(|e| file_error(path, e))?;
    Ok(Bytes::from(buf))
}

async fn open(path: &Path) -> Result<tokio::fs::File, CoreError> {
    tokio::fs::File::open(path)
        .await
        .map_err(|e| file_error(path, e))
}

fn buffer_len(range: &ByteRange) -> Result<usize, CoreError> {
    usize::try_from(range.len)
        .map_err(|_| CoreError::validation(format!("part of {} bytes is too large", range.len)))
}

pub(crate) fn file_error(path: &Path, source: std::io::Error) -> CoreError {
    CoreError::File {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn splits_with_short_last_part() {
        let plan = ChunkPlan::plan(12 * MIB, PART_SIZE).unwrap();
        assert_eq!(plan.part_count(), 3);
        assert_eq!(plan.ranges()[2], ByteRange {
            offset: 10 * MIB,
            len: 2 * MIB
        });
        assert_eq!(plan.ranges().iter().map(|r| r.len).sum::<u64>(), 12 * MIB);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let plan = ChunkPlan::plan(10 * MIB, PART_SIZE).unwrap();
        assert_eq!(plan.part_count(), 2);
        assert!(plan.ranges().iter().all(|r| r.len == PART_SIZE));
    }

    #[test]
    fn small_file_is_one_part() {
        let plan = ChunkPlan::plan(1, PART_SIZE).unwrap();
        assert_eq!(plan.ranges(), &[ByteRange { offset: 0, len: 1 }]);
    }

    #[test]
    fn ranges_are_contiguous() {
        let plan = ChunkPlan::plan(1000, 7).unwrap();
        assert_eq!(plan.part_count(), 143);
        for pair in plan.ranges().windows(2) {
            assert_eq!(pair[0].end(), pair[1].offset);
        }
        assert_eq!(plan.ranges().last().unwrap().end(), 1000);
    }

    #[test]
    fn rejects_zero_sizes() {
        assert!(matches!(
            ChunkPlan::plan(10, 0),
            Err(CoreError::Validation { .. })
        ));
        assert!(matches!(
            ChunkPlan::plan(0, PART_SIZE),
            Err(CoreError::Validation { message }) if message.contains("empty")
        ));
    }

    #[test]
    fn placeholder_is_one_empty_part() {
        let plan = ChunkPlan::placeholder();
        assert!(plan.is_placeholder());
        assert_eq!(plan.part_count(), 1);
        assert_eq!(plan.ranges()[0].len, 0);
    }

    #[test]
    fn checksum_is_padded_base64_md5() {
        assert_eq!(checksum(b"").as_str(), "1B2M2Y8AsgTpgAmY7PhCfg==");
        assert_eq!(checksum(b"hello").as_str(), "XUFAKrxLKna5cZ2REBfFkg==");
    }

    #[tokio::test]
    async fn checksums_cover_each_range() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abcdefghij").unwrap();

        let plan = ChunkPlan::plan(10, 4).unwrap();
        let sums = compute_checksums(file.path(), &plan).await.unwrap();

        assert_eq!(sums, vec![
            checksum(b"abcd"),
            checksum(b"efgh"),
            checksum(b"ij")
        ]);
        assert_eq!(sums[0].as_str(), "4vxxTEcn7pOV8yTNLn8zHw==");

        let tail = read_range(file.path(), plan.ranges()[2]).await.unwrap();
        assert_eq!(&tail[..], b"ij");
    }

    #[tokio::test]
    async fn missing_file_is_a_file_error() {
        let plan = ChunkPlan::plan(4, 4).unwrap();
        let err = compute_checksums(Path::new("/nonexistent/blob.bin"), &plan)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::File { .. }));
    }
}
