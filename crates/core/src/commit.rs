//! Commit records as supplied by the commit source

use crate::oid::GitCommitId;
use smallvec::SmallVec;

/// One entry of the commit source: a commit and its parents.
///
/// The commit source yields these in topological order, ancestors before
/// descendants, exactly once per bundle build. The record tolerates any
/// number of parents; whether a commit is representable as a Mercurial
/// changeset (at most two parents) is decided by the translation store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// The commit being translated
    pub id: GitCommitId,
    /// Parent commit ids, in commit order
    pub parents: SmallVec<[GitCommitId; 2]>,
}

impl CommitRecord {
    /// Create a new commit record
    pub fn new(id: GitCommitId, parents: impl IntoIterator<Item = GitCommitId>) -> Self {
        Self {
            id,
            parents: parents.into_iter().collect(),
        }
    }

    /// A record with no parents
    pub fn root(id: GitCommitId) -> Self {
        Self {
            id,
            parents: SmallVec::new(),
        }
    }
}
