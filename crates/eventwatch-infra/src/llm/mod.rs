//! LLM-backed classifier and extractor.

pub mod openai;

pub use openai::OpenAiEventModel;
