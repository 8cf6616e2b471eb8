//! LLM provider implementations

pub mod ollama;
pub mod openai;
