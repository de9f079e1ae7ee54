pub mod llm_client;

pub use llm_client::{ask_for, OpenAiClient, StructuredLlm, StructuredRequest};
