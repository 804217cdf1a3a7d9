//! # genie-content
//!
//! Content-generation provider implementations for Post Genie.
//!
//! `OpenAiProvider` talks to any OpenAI-compatible chat-completions API
//! and is the production backend; `MockProvider` returns a canned
//! bundle for tests and offline development. Both implement
//! `genie_core::ContentProvider`, so the server works with either
//! without code changes.

pub mod mock;
pub mod openai;

pub use mock::MockProvider;
pub use openai::{OpenAiConfig, OpenAiProvider};
