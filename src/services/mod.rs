pub mod agents;
pub mod generator;
pub mod llm_service;
pub mod prompts;

pub use agents::{CategoryAgent, KeywordAgent, SubcategoryAgent};
pub use generator::TextGenerator;
pub use llm_service::LlmService;
