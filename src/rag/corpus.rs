//! Corpus ingestion.
//!
//! A corpus is a directory of UTF-8 `.txt` files, one document per file,
//! with the file stem as document id. An optional `manifest.json` maps file
//! names to source URLs:
//!
//! ```json
//! { "it_department.txt": "https://scet.ac.in/it" }
//! ```
//!
//! Files written by the site scraper start with a `TITLE:` / `URL:` header;
//! the URL from that header is used when the manifest has no entry.

use crate::types::{Document, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of reading a corpus directory.
#[derive(Debug, Default)]
pub struct Corpus {
    /// Documents sorted by id.
    pub documents: Vec<Document>,
    /// Files that could not be read, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Read every `.txt` file in `dir`.
///
/// A missing directory yields an empty corpus. A missing or unparsable
/// manifest only costs the source URLs.
pub async fn load_corpus(dir: &Path, manifest_name: &str) -> Result<Corpus> {
    if !dir.is_dir() {
        warn!(path = ?dir, "Corpus directory does not exist");
        return Ok(Corpus::default());
    }

    let manifest = load_manifest(&dir.join(manifest_name)).await;

    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "txt") && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut corpus = Corpus::default();
    for path in paths {
        match read_document(&path, &manifest).await {
            Ok(doc) => corpus.documents.push(doc),
            Err(e) => {
                warn!(path = ?path, error = %e, "Skipping unreadable document");
                corpus.skipped.push((path, e.to_string()));
            }
        }
    }

    info!(
        documents = corpus.documents.len(),
        skipped = corpus.skipped.len(),
        "Loaded corpus"
    );
    Ok(corpus)
}

async fn load_manifest(path: &Path) -> HashMap<String, String> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = ?path, error = %e, "No manifest, citations will read 'unknown source'");
            return HashMap::new();
        }
    };

    match serde_json::from_str::<HashMap<String, String>>(&raw) {
        Ok(map) => map,
        Err(e) => {
            warn!(path = ?path, error = %e, "Unparsable manifest, ignoring it");
            HashMap::new()
        }
    }
}

async fn read_document(path: &Path, manifest: &HashMap<String, String>) -> Result<Document> {
    let text = tokio::fs::read_to_string(path).await?;
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let source_url = manifest
        .get(&file_name)
        .cloned()
        .or_else(|| header_url(&text));

    let ingested_at = tokio::fs::metadata(path)
        .await
        .ok()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(Utc::now);

    Ok(Document {
        id,
        text,
        source_url,
        ingested_at,
    })
}

/// `URL:` line from a scraper header in the first few lines.
fn header_url(text: &str) -> Option<String> {
    text.lines()
        .take(3)
        .find_map(|line| line.strip_prefix("URL:"))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}
