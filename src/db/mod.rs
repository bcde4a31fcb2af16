//! Storage for embedded segments.
//!
//! [`segment_index::SegmentIndex`] wraps the `subot-vector` flat store and
//! keeps each segment's text and provenance next to its vector, so a hit
//! can be turned back into a citation without touching the corpus.

pub mod segment_index;

pub use segment_index::SegmentIndex;
