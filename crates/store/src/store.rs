//! Sled-backed translation store
//!
//! One store instance represents one logical transaction: open it, resolve
//! commits while encoding, then close it exactly once, either committing the
//! pending additions to sled or discarding them. The store is not safe to
//! share across concurrent bundle builds; callers that need that must
//! serialize access externally.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ferry_core::{
    changeset::derive_manifest_id, Changeset, CommitRecord, GitCommitId, HgChangesetId,
    HgManifestId,
};

use crate::error::{Result, StoreError};
use crate::source::ContentSource;

/// A recorded translation: the changeset and manifest nodes for one commit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translated {
    /// Changeset node
    pub changeset: HgChangesetId,
    /// Manifest node
    pub manifest: HgManifestId,
}

/// Transactional mapping from git commit ids to changeset nodes.
///
/// The durable layer is a sled tree keyed by the 20 raw bytes of the commit
/// id. Additions made through [`resolve_or_create`](Self::resolve_or_create)
/// stay in a pending map until [`close`](Self::close) commits or discards
/// them. The mapping is append-only while open; `Closed` is terminal.
pub struct TranslationStore {
    db: sled::Db,
    /// Additions of the current transaction
    pending: BTreeMap<GitCommitId, Translated>,
    /// Raw changesets built during this transaction, for the encoder
    changesets: BTreeMap<HgChangesetId, Changeset>,
    closed: bool,
}

impl TranslationStore {
    /// Open or create a store at the given directory
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path.join("translations.db"))?;
        debug!(entries = db.len(), "opened translation store");
        Ok(Self {
            db,
            pending: BTreeMap::new(),
            changesets: BTreeMap::new(),
            closed: false,
        })
    }

    /// Look up an existing translation. Pure read, no side effect.
    pub fn lookup(&self, commit: GitCommitId) -> Result<Option<Translated>> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        if let Some(t) = self.pending.get(&commit) {
            return Ok(Some(*t));
        }
        match self.db.get(commit.as_bytes())? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Resolve a commit to its translation, creating one if needed.
    ///
    /// Creating requires every parent to already be translated; an unmapped
    /// parent fails with [`StoreError::MissingParentMetadata`] and leaves
    /// the mapping unchanged. New node ids are content-derived, so the same
    /// commit always resolves to the same translation.
    pub fn resolve_or_create(
        &mut self,
        record: &CommitRecord,
        source: &dyn ContentSource,
    ) -> Result<Translated> {
        if self.closed {
            return Err(StoreError::Closed);
        }

        if let Some(existing) = self.lookup(record.id)? {
            // The encoder needs the raw changeset text even for commits
            // translated by an earlier transaction; rebuild it and verify
            // the recorded node still matches.
            if !self.changesets.contains_key(&existing.changeset) {
                let changeset = self.build_changeset(record, source)?;
                if changeset.node != existing.changeset {
                    return Err(StoreError::Corrupt {
                        commit: record.id,
                        recorded: existing.changeset,
                        computed: changeset.node,
                    });
                }
                self.changesets.insert(changeset.node, changeset);
            }
            return Ok(existing);
        }

        let changeset = self.build_changeset(record, source)?;
        let translated = Translated {
            changeset: changeset.node,
            manifest: changeset.manifest,
        };
        debug!(
            commit = %record.id,
            node = %changeset.node,
            "created translation"
        );
        self.pending.insert(record.id, translated);
        self.changesets.insert(changeset.node, changeset);
        Ok(translated)
    }

    /// Raw changeset access for the encoder; covers changesets built during
    /// this transaction only.
    pub fn changeset(&self, node: HgChangesetId) -> Option<&Changeset> {
        self.changesets.get(&node)
    }

    /// Number of pending (uncommitted) translations
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Close the transaction. `commit = false` discards every pending
    /// addition; `commit = true` persists them durably. Closing twice is a
    /// programming error and fails fast with [`StoreError::Closed`].
    pub fn close(&mut self, commit: bool) -> Result<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        self.closed = true;

        if commit {
            // All-or-nothing: serialize everything first, then apply as one
            // batch, so a failure cannot leave a partial mapping behind.
            let mut batch = sled::Batch::default();
            for (id, translated) in &self.pending {
                batch.insert(&id.as_bytes()[..], bincode::serialize(translated)?);
            }
            self.db.apply_batch(batch)?;
            self.db.flush()?;
            let count = self.pending.len();
            self.pending.clear();
            info!(count, "committed translations");
        } else {
            let count = self.pending.len();
            self.pending.clear();
            self.changesets.clear();
            info!(count, "rolled back translations");
        }
        Ok(())
    }

    /// Whether the store has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for TranslationStore {
    fn drop(&mut self) {
        // A store dropped without an explicit close rolls back: pending
        // additions are never written to sled.
        if !self.closed && !self.pending.is_empty() {
            debug!(
                count = self.pending.len(),
                "translation store dropped without close; pending additions discarded"
            );
        }
    }
}

// Shared between create and verify paths.
impl TranslationStore {
    fn build_changeset(
        &self,
        record: &CommitRecord,
        source: &dyn ContentSource,
    ) -> Result<Changeset> {
        if record.parents.len() > 2 {
            return Err(StoreError::TooManyParents {
                commit: record.id,
                count: record.parents.len(),
            });
        }

        let mut parent_nodes = Vec::with_capacity(record.parents.len());
        let mut parent_manifests = [HgManifestId::null(); 2];
        for (i, parent) in record.parents.iter().enumerate() {
            let translated =
                self.lookup(*parent)?
                    .ok_or(StoreError::MissingParentMetadata {
                        commit: record.id,
                        parent: *parent,
                    })?;
            parent_nodes.push(translated.changeset);
            parent_manifests[i] = translated.manifest;
        }

        let content = source
            .content(record.id)
            .map_err(|e| StoreError::Content {
                commit: record.id,
                source: e.into(),
            })?;
        let seed = source
            .manifest_seed(record.id)
            .map_err(|e| StoreError::Content {
                commit: record.id,
                source: e.into(),
            })?;

        let manifest = derive_manifest_id(parent_manifests[0], parent_manifests[1], &seed);
        Ok(Changeset::new(&parent_nodes, manifest, &content))
    }
}
