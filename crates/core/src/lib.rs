//! Core data model for git-to-Mercurial bundle generation
//!
//! This crate provides:
//! - 20-byte identifier types for git commits and Mercurial nodes
//! - Commit records as supplied by the commit source
//! - Changeset content, raw text assembly, and SHA-1 node derivation

pub mod changeset;
pub mod commit;
pub mod oid;

// Re-exports
pub use changeset::{Changeset, ChangesetContent, ChangesetExtra, RawChangeset};
pub use commit::CommitRecord;
pub use oid::{GitCommitId, HgChangesetId, HgManifestId, NULL_NODE};
