//! Prompt module for LLM-based operations.

pub mod topic_labels;

pub use topic_labels::*;
