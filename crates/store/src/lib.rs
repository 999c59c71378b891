//! Transactional translation store mapping git commits to changesets
//!
//! This crate provides:
//! - `TranslationStore`: a sled-backed, append-while-open mapping from git
//!   commit ids to changeset/manifest node pairs
//! - `ContentSource`: the seam through which changeset content is obtained
//! - The store error taxonomy, `MissingParentMetadata` included

pub mod error;
pub mod source;
pub mod store;

// Re-exports
pub use error::{Result, StoreError};
pub use source::{ContentSource, MemorySource};
pub use store::{Translated, TranslationStore};
