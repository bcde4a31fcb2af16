//! Retrieval pipeline: corpus ingestion, chunking, embedding, indexing and
//! local lookup.
//!
//! 1. [`corpus`] reads the crawler's text files and manifest
//! 2. [`chunker`] splits each document into overlapping segments
//! 3. [`embeddings`] turns segments and queries into vectors
//! 4. [`indexer`] builds, persists and restores the segment index
//! 5. [`retriever`] answers queries from the index

pub mod cache;
pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod indexer;
pub mod retriever;
