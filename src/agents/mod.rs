//! Query pipeline stages.
//!
//! - [`router`] picks LOCAL, WEB or HYBRID retrieval per query
//! - [`assembler`] merges results into a bounded, cited context block
//! - [`synthesizer`] prompts the LLM and post-processes its answer
//! - [`orchestrator`] runs the stages in order for a session

pub mod assembler;
pub mod orchestrator;
pub mod router;
pub mod synthesizer;

pub use assembler::ContextAssembler;
pub use orchestrator::Assistant;
pub use router::{QueryRouter, RoutingOutcome};
pub use synthesizer::{AnswerSynthesizer, CANNOT_ANSWER_MESSAGE, FALLBACK_MESSAGE};
