//! Storage module for the generation history
//!
//! A flat, string-keyed key-value layer. The history store only ever reads,
//! writes and removes whole buckets, so the trait stays synchronous.

mod kv;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
