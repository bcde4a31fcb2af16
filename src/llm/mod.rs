//! LLM provider clients.
//!
//! - [`LLMClient`] - the text-in, text-out trait every provider implements
//! - [`Provider`] - runtime selection from the `[llm]` config section
//!
//! Enable providers via Cargo features:
//! - `ollama` - local Ollama server (default)
//! - `openai` - OpenAI API and compatible endpoints

pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{LLMClient, LLMClientFactory, Provider};
