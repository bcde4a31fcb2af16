//! Document chunking.
//!
//! Splits a [`Document`] into [`Segment`]s of at most `max_chars` characters.
//! Splitting prefers semantic boundaries (blank lines, then line breaks,
//! sentences, words) and only cuts inside a word when nothing larger fits.
//! Neighbouring segments share up to `overlap_chars` characters.
//!
//! Leading and trailing whitespace of each piece is trimmed, so the offset
//! ranges cover every non-whitespace character of the document.

use crate::types::{AppError, Document, Result, Segment};
use crate::utils::toml_config::ChunkingConfig;
use text_splitter::{ChunkConfig, Characters, TextSplitter};

pub struct TextChunker {
    splitter: TextSplitter<Characters>,
    max_chars: usize,
    overlap_chars: usize,
}

impl TextChunker {
    /// Rejects `overlap_chars >= max_chars` and a zero `max_chars`.
    pub fn new(max_chars: usize, overlap_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(AppError::Config("chunk size must be > 0".to_string()));
        }
        if overlap_chars >= max_chars {
            return Err(AppError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap_chars, max_chars
            )));
        }

        let config = ChunkConfig::new(max_chars)
            .with_overlap(overlap_chars)
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            splitter: TextSplitter::new(config),
            max_chars,
            overlap_chars,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.max_chars, config.overlap_chars)
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Lazily split `doc`. Calling this again restarts from the beginning
    /// and yields the same segments.
    pub fn segments<'a>(&'a self, doc: &'a Document) -> Result<Segments<'a>> {
        if doc.text.trim().is_empty() {
            return Err(AppError::Chunking(format!(
                "document '{}' has no text",
                doc.id
            )));
        }

        Ok(Segments {
            inner: Box::new(self.splitter.chunk_indices(&doc.text)),
            doc,
            ordinal: 0,
        })
    }

    /// Eager form of [`segments`](Self::segments).
    pub fn chunk(&self, doc: &Document) -> Result<Vec<Segment>> {
        Ok(self.segments(doc)?.collect())
    }
}

/// Iterator over the segments of one document.
pub struct Segments<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    doc: &'a Document,
    ordinal: usize,
}

impl Iterator for Segments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        loop {
            let (start, text) = self.inner.next()?;
            if text.trim().is_empty() {
                continue;
            }

            let ordinal = self.ordinal;
            self.ordinal += 1;

            return Some(Segment {
                id: Segment::segment_id(&self.doc.id, ordinal),
                doc_id: self.doc.id.clone(),
                ordinal,
                text: text.to_string(),
                start,
                end: start + text.len(),
                source_url: self.doc.source_url.clone(),
            });
        }
    }
}
