//! Error taxonomy for the translation store

use ferry_core::{GitCommitId, HgChangesetId};
use thiserror::Error;

/// Errors surfaced by [`crate::TranslationStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A parent of the commit being translated has no translation yet.
    ///
    /// This is the expected failure mode: callers decide whether to abort
    /// the whole bundle or skip the commit.
    #[error("parent {parent} of commit {commit} has no translation")]
    MissingParentMetadata {
        commit: GitCommitId,
        parent: GitCommitId,
    },

    /// The commit has more than two parents, which a changeset cannot
    /// represent.
    #[error("commit {commit} has {count} parents; changesets support at most two")]
    TooManyParents { commit: GitCommitId, count: usize },

    /// The store was already closed; a contract violation, not a runtime
    /// condition to recover from.
    #[error("translation store is closed")]
    Closed,

    /// A recorded translation no longer matches the recomputed node.
    #[error("recorded node {recorded} for commit {commit} does not match recomputed {computed}")]
    Corrupt {
        commit: GitCommitId,
        recorded: HgChangesetId,
        computed: HgChangesetId,
    },

    /// The content source failed to supply changeset content.
    #[error("content source failed for commit {commit}")]
    Content {
        commit: GitCommitId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("storage error")]
    Storage(#[from] sled::Error),

    #[error("serialization error")]
    Codec(#[from] bincode::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
