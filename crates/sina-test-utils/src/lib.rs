//! Test helpers shared across SINA crates.

pub mod llm;
pub mod runner;
pub mod store;

pub use llm::{FailingLLM, FixedLLM, RecordingChatLLM, ScriptedLLM};
pub use runner::RecordingRunner;
pub use store::{FailingStore, MemoryStore};
