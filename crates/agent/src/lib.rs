//! Intent classification against an external LLM.
//!
//! The only thing this crate exports to the rest of the system is a pure
//! boundary: free text in, validated [`rolobot_core::ActionDecision`] out.
//! The live client is swappable behind [`llm::LlmClient`], and everything
//! the model returns passes the core validation gate before any caller
//! can act on it.

pub mod llm;
pub mod prompt;
pub mod router;

pub use llm::{CompletionRequest, LlmClient, LlmError, OpenAiCompatClient, ScriptedLlmClient};
pub use router::{ClassifyError, IntentClassifier, IntentRouter};
