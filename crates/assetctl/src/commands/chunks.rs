//! `chunks`: offline part plan and checksums for a file.

use serde::Serialize;
use tabled::Tabled;

use assetctl_core::PreparedTransfer;

use crate::cli::{ChunksArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ChunkEntry {
    part_number: usize,
    offset: u64,
    length: u64,
    md5: String,
}

#[derive(Tabled)]
struct ChunkRow {
    #[tabled(rename = "Part")]
    part: usize,
    #[tabled(rename = "Offset")]
    offset: u64,
    #[tabled(rename = "Length")]
    length: String,
    #[tabled(rename = "MD5 (base64)")]
    md5: String,
}

impl From<&ChunkEntry> for ChunkRow {
    fn from(e: &ChunkEntry) -> Self {
        Self {
            part: e.part_number,
            offset: e.offset,
            length: bytesize::ByteSize::b(e.length).to_string(),
            md5: e.md5.clone(),
        }
    }
}

pub async fn handle(args: &ChunksArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let transfer = PreparedTransfer::from_file(&args.file, args.chunk_size).await?;

    let entries: Vec<ChunkEntry> = transfer
        .plan()
        .ranges()
        .iter()
        .zip(transfer.checksums())
        .enumerate()
        .map(|(i, (range, md5))| ChunkEntry {
            part_number: i + 1,
            offset: range.offset,
            length: range.len,
            md5: md5.to_string(),
        })
        .collect();

    let out = output::render_list(global.output, &entries, |e| ChunkRow::from(e), |e| {
        e.md5.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
