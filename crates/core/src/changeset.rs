//! Changeset content model, raw text assembly, and node derivation
//!
//! A Mercurial changeset is a small text blob:
//!
//! ```text
//! <manifest hex>\n
//! <author>\n
//! <timestamp> <utcoffset>[ <extra>]
//! [\n<file>]*
//! \n\n<description>
//! ```
//!
//! Its node id is the SHA-1 of the two parent nodes (in sorted byte order)
//! followed by that text. All text fields are opaque byte strings; nothing
//! here decodes or re-encodes them, so non-UTF-8 commit messages survive
//! untouched.

use std::collections::BTreeMap;

use sha1::{Digest, Sha1};

use crate::oid::{HgChangesetId, HgManifestId};

/// Opaque key/value metadata attached to a changeset (the `extra` field).
///
/// Keys are kept sorted so rendering is deterministic. Values and keys are
/// escaped the way the target format requires (`\0`, `\n`, `\r`, `\\`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangesetExtra {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl ChangesetExtra {
    /// An empty extra map
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key to a value, replacing any previous value
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as `key:value` pairs joined by NUL, with escaping applied
    pub fn dump_into(&self, out: &mut Vec<u8>) {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(b'\0');
            }
            escape_into(key, out);
            out.push(b':');
            escape_into(value, out);
        }
    }
}

fn escape_into(data: &[u8], out: &mut Vec<u8>) {
    for &b in data {
        match b {
            b'\0' => out.extend_from_slice(b"\\0"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            _ => out.push(b),
        }
    }
}

/// The raw material a changeset is built from.
///
/// Supplied by a content source for each commit being translated. All byte
/// fields are treated as opaque.
#[derive(Debug, Clone, Default)]
pub struct ChangesetContent {
    /// Author line, `Name <email>` by convention
    pub author: Vec<u8>,
    /// Seconds since the epoch
    pub timestamp: i64,
    /// Seconds west of UTC (the target format's sign convention)
    pub utcoffset: i32,
    /// Extra metadata
    pub extra: ChangesetExtra,
    /// Paths touched by this changeset
    pub files: Vec<Vec<u8>>,
    /// Commit description
    pub description: Vec<u8>,
}

/// The serialized changeset text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChangeset(Vec<u8>);

impl RawChangeset {
    /// Assemble the changeset text from a manifest id and content
    pub fn new(manifest: HgManifestId, content: &ChangesetContent) -> Self {
        let mut text = Vec::new();
        text.extend_from_slice(manifest.to_hex().as_bytes());
        text.push(b'\n');
        text.extend_from_slice(&content.author);
        text.push(b'\n');
        text.extend_from_slice(content.timestamp.to_string().as_bytes());
        text.push(b' ');
        text.extend_from_slice(content.utcoffset.to_string().as_bytes());
        if !content.extra.is_empty() {
            text.push(b' ');
            content.extra.dump_into(&mut text);
        }
        let mut files: Vec<&[u8]> = content.files.iter().map(|f| f.as_slice()).collect();
        files.sort();
        for f in files {
            text.push(b'\n');
            text.extend_from_slice(f);
        }
        text.extend_from_slice(b"\n\n");
        text.extend_from_slice(&content.description);
        Self(text)
    }

    /// The serialized bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the text is empty (never true for an assembled changeset)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Compute a changeset node from its parents and serialized text.
///
/// The parents are hashed in sorted byte order, absent parents as the null
/// node, so the result does not depend on parent ordering. Identical parents
/// and text always produce the same node.
pub fn changeset_node(
    p1: HgChangesetId,
    p2: HgChangesetId,
    raw: &RawChangeset,
) -> HgChangesetId {
    let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
    let mut hasher = Sha1::new();
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    hasher.update(raw.as_bytes());
    HgChangesetId::from_bytes(hasher.finalize().into())
}

/// Derive a manifest node from parent manifests and a content seed.
///
/// The seed is the content identity of the tree the manifest describes (the
/// git tree id when translating from git). Same derivation shape as
/// [`changeset_node`]: sorted parents, then content.
pub fn derive_manifest_id(p1: HgManifestId, p2: HgManifestId, seed: &[u8; 20]) -> HgManifestId {
    let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
    let mut hasher = Sha1::new();
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    hasher.update(seed);
    HgManifestId::from_bytes(hasher.finalize().into())
}

/// A fully-built changeset, ready for encoding.
#[derive(Debug, Clone)]
pub struct Changeset {
    /// Content-derived node id
    pub node: HgChangesetId,
    /// Parent nodes, null-filled when absent
    pub parents: [HgChangesetId; 2],
    /// Manifest node
    pub manifest: HgManifestId,
    /// Serialized changeset text
    pub raw: RawChangeset,
}

impl Changeset {
    /// Build a changeset from at most two parent nodes, a manifest, and
    /// content. The node id is computed here and never changes afterwards.
    pub fn new(
        parents: &[HgChangesetId],
        manifest: HgManifestId,
        content: &ChangesetContent,
    ) -> Self {
        debug_assert!(parents.len() <= 2);
        let p1 = parents.first().copied().unwrap_or_else(HgChangesetId::null);
        let p2 = parents.get(1).copied().unwrap_or_else(HgChangesetId::null);
        let raw = RawChangeset::new(manifest, content);
        let node = changeset_node(p1, p2, &raw);
        Self {
            node,
            parents: [p1, p2],
            manifest,
            raw,
        }
    }
}
