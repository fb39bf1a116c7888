//! Answer generator adapters.

pub mod openai;

pub use openai::{OpenAiAnswerGenerator, OpenAiChatConfig};
