//! Storage abstraction and implementations for evalqc.
//!
//! This crate provides the data-access interface the quality engine reads
//! from, with a JSON-directory and an in-memory implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{EvaluationStore, StorageError, Result};
pub use json_storage::JsonStore;
pub use memory::MemoryStore;
