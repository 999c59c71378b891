//! Content source seam
//!
//! The store computes node ids from changeset content, but where that
//! content comes from depends on the caller: git plumbing in the CLI, an
//! in-memory map in tests.

use std::collections::HashMap;

use ferry_core::{ChangesetContent, GitCommitId};

/// Supplies the raw material for building a changeset from a commit.
pub trait ContentSource {
    /// Changeset content (author, timestamp, files, description, extra)
    fn content(&self, commit: GitCommitId) -> anyhow::Result<ChangesetContent>;

    /// The content identity the manifest id derives from; for git sources
    /// this is the commit's tree id.
    fn manifest_seed(&self, commit: GitCommitId) -> anyhow::Result<[u8; 20]>;
}

/// In-memory content source.
#[derive(Debug, Default)]
pub struct MemorySource {
    commits: HashMap<GitCommitId, (ChangesetContent, [u8; 20])>,
}

impl MemorySource {
    /// An empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content and a manifest seed for a commit
    pub fn insert(&mut self, commit: GitCommitId, content: ChangesetContent, seed: [u8; 20]) {
        self.commits.insert(commit, (content, seed));
    }
}

impl ContentSource for MemorySource {
    fn content(&self, commit: GitCommitId) -> anyhow::Result<ChangesetContent> {
        self.commits
            .get(&commit)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| anyhow::anyhow!("no content registered for {}", commit))
    }

    fn manifest_seed(&self, commit: GitCommitId) -> anyhow::Result<[u8; 20]> {
        self.commits
            .get(&commit)
            .map(|(_, seed)| *seed)
            .ok_or_else(|| anyhow::anyhow!("no content registered for {}", commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source_lookup() {
        let commit = GitCommitId::from_bytes([1; 20]);
        let mut source = MemorySource::new();
        source.insert(commit, ChangesetContent::default(), [9; 20]);

        assert!(source.content(commit).is_ok());
        assert_eq!(source.manifest_seed(commit).unwrap(), [9; 20]);
    }

    #[test]
    fn test_memory_source_unknown_commit() {
        let source = MemorySource::new();
        assert!(source.content(GitCommitId::from_bytes([2; 20])).is_err());
    }
}
