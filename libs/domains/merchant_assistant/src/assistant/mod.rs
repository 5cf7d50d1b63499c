//! The retrieval-augmented conversation pipeline

mod orchestrator;
pub mod prompts;

pub use orchestrator::{AssistantConfig, MerchantAssistant};
