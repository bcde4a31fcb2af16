//! Persistence layer for subot-vector.
//!
//! An index is stored as a pair of files in one directory:
//! - `vectors.bin` - postcard-encoded header plus the raw vectors
//! - `metadata.jsonl` - one `{id, metadata}` record per vector, same order
//!
//! Each file is written to a temporary name and renamed into place. The
//! header carries the vector count, so a pair left half-written by a crash
//! is detected on load as a count mismatch.

use crate::distance::DistanceMetric;
use crate::error::{Error, Result};
use crate::index::FlatIndex;
use crate::types::{VectorEntry, VectorId, VectorMetadata};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// File holding the vectors.
pub const VECTORS_FILE: &str = "vectors.bin";
/// File holding per-vector metadata.
pub const METADATA_FILE: &str = "metadata.jsonl";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct VectorFile {
    format_version: u32,
    dimensions: u64,
    metric: String,
    count: u64,
    vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetadataRecord {
    id: VectorId,
    metadata: VectorMetadata,
}

/// Whether a complete-looking pair exists in `dir`.
pub fn exists(dir: &Path) -> bool {
    dir.join(VECTORS_FILE).is_file() && dir.join(METADATA_FILE).is_file()
}

/// Write `index` to `dir`, creating the directory if needed.
pub async fn save_index(dir: &Path, index: &FlatIndex) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let file = VectorFile {
        format_version: FORMAT_VERSION,
        dimensions: index.dimensions() as u64,
        metric: index.metric().name().to_string(),
        count: index.len() as u64,
        vectors: index.entries().iter().map(|e| e.vector.clone()).collect(),
    };
    let bytes = postcard::to_allocvec(&file)
        .map_err(|e| Error::Persistence(format!("Failed to encode vectors: {}", e)))?;

    let mut lines = String::new();
    for entry in index.entries() {
        let record = MetadataRecord {
            id: entry.id.clone(),
            metadata: entry.metadata.clone(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| Error::Persistence(format!("Failed to encode metadata: {}", e)))?;
        lines.push_str(&line);
        lines.push('\n');
    }

    write_atomic(&dir.join(VECTORS_FILE), &bytes).await?;
    write_atomic(&dir.join(METADATA_FILE), lines.as_bytes()).await?;

    info!(path = ?dir, count = index.len(), "Saved vector index");
    Ok(())
}

/// Read an index previously written by [`save_index`].
///
/// Returns [`Error::NotPersisted`] when neither file exists and
/// [`Error::Corrupt`] for anything else that does not add up.
pub async fn load_index(dir: &Path) -> Result<FlatIndex> {
    let vectors_path = dir.join(VECTORS_FILE);
    let metadata_path = dir.join(METADATA_FILE);

    match (vectors_path.is_file(), metadata_path.is_file()) {
        (false, false) => return Err(Error::NotPersisted(dir.display().to_string())),
        (true, false) => return Err(Error::Corrupt(format!("{} is missing", METADATA_FILE))),
        (false, true) => return Err(Error::Corrupt(format!("{} is missing", VECTORS_FILE))),
        (true, true) => {}
    }

    let bytes = tokio::fs::read(&vectors_path)
        .await
        .map_err(|e| Error::Corrupt(format!("Cannot read {}: {}", VECTORS_FILE, e)))?;
    let file: VectorFile = postcard::from_bytes(&bytes)
        .map_err(|e| Error::Corrupt(format!("Cannot decode {}: {}", VECTORS_FILE, e)))?;

    if file.format_version != FORMAT_VERSION {
        return Err(Error::Corrupt(format!(
            "Unsupported format version {}",
            file.format_version
        )));
    }
    if file.count as usize != file.vectors.len() {
        return Err(Error::Corrupt(format!(
            "Header declares {} vectors, found {}",
            file.count,
            file.vectors.len()
        )));
    }
    let metric: DistanceMetric = file.metric.parse().map_err(Error::Corrupt)?;

    let text = tokio::fs::read_to_string(&metadata_path)
        .await
        .map_err(|e| Error::Corrupt(format!("Cannot read {}: {}", METADATA_FILE, e)))?;
    let records = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            serde_json::from_str::<MetadataRecord>(line)
                .map_err(|e| Error::Corrupt(format!("{} line {}: {}", METADATA_FILE, n + 1, e)))
        })
        .collect::<Result<Vec<_>>>()?;

    if records.len() != file.vectors.len() {
        return Err(Error::Corrupt(format!(
            "{} vectors but {} metadata records",
            file.vectors.len(),
            records.len()
        )));
    }

    let entries = records
        .into_iter()
        .zip(file.vectors)
        .map(|(record, vector)| VectorEntry::new(record.id, vector, record.metadata));

    let index = FlatIndex::from_entries(file.dimensions as usize, metric, entries)
        .map_err(|e| Error::Corrupt(e.to_string()))?;

    debug!(path = ?dir, count = index.len(), "Loaded vector index");
    Ok(index)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
