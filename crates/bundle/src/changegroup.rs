//! Changegroup stream encoding
//!
//! A changegroup is a sequence of length-prefixed chunks. Every length word
//! is big-endian and counts itself; a zero word delimits a group. The stream
//! layout here is: one chunk per changeset in input order, a delimiter, an
//! empty manifest group, and a final delimiter ending the (empty) file
//! section.
//!
//! Chunk payloads carry the node, both parent slots (zero-filled when
//! absent), the explicit delta base for `02`, the linknode, and a delta.
//! Every delta replaces its whole base with the full changeset text. For
//! `02` the base is explicitly the null (empty) text; for `01` the base is
//! implicit — the previous chunk's text, empty for the first chunk — so the
//! delta's end offset must cover the previous text's length.

use bytes::{BufMut, Bytes, BytesMut};

use ferry_core::{Changeset, NULL_NODE};

use crate::caps::CgVersion;

/// Append one length-prefixed chunk.
pub fn write_chunk(out: &mut BytesMut, payload: &[u8]) {
    out.put_u32(payload.len() as u32 + 4);
    out.put_slice(payload);
}

/// Append a group delimiter (zero-length chunk).
pub fn write_delimiter(out: &mut BytesMut) {
    out.put_u32(0);
}

/// Builds the changegroup stream for one bundle.
pub struct ChangegroupBuilder {
    version: CgVersion,
    out: BytesMut,
    changesets: usize,
    /// Length of the previous chunk's text, the implicit `01` delta base
    prev_len: usize,
}

impl ChangegroupBuilder {
    /// Start a stream in the given sub-format
    pub fn new(version: CgVersion) -> Self {
        Self {
            version,
            out: BytesMut::new(),
            changesets: 0,
            prev_len: 0,
        }
    }

    /// Append one changeset chunk. Callers supply changesets in commit
    /// order; nothing is re-sorted here.
    pub fn add_changeset(&mut self, changeset: &Changeset) {
        let raw = changeset.raw.as_bytes();
        let mut payload = BytesMut::with_capacity(raw.len() + 112);

        payload.put_slice(changeset.node.as_bytes());
        payload.put_slice(changeset.parents[0].as_bytes());
        payload.put_slice(changeset.parents[1].as_bytes());
        let base_len = match self.version {
            // Implicit delta base: the previous chunk's text.
            CgVersion::V01 => self.prev_len,
            CgVersion::V02 => {
                // Explicit delta base: the empty (null) text.
                payload.put_slice(&NULL_NODE);
                0
            }
        };
        // Changelog chunks link to themselves.
        payload.put_slice(changeset.node.as_bytes());

        // Single patch op replacing the whole base with the full text.
        payload.put_u32(0);
        payload.put_u32(base_len as u32);
        payload.put_u32(raw.len() as u32);
        payload.put_slice(raw);

        write_chunk(&mut self.out, &payload);
        self.changesets += 1;
        self.prev_len = raw.len();
    }

    /// Number of changesets appended so far
    pub fn len(&self) -> usize {
        self.changesets
    }

    /// Whether no changesets have been appended
    pub fn is_empty(&self) -> bool {
        self.changesets == 0
    }

    /// Terminate the stream: close the changeset group, emit an empty
    /// manifest group, and end the file section.
    pub fn finish(mut self) -> Bytes {
        write_delimiter(&mut self.out);
        write_delimiter(&mut self.out);
        write_delimiter(&mut self.out);
        self.out.freeze()
    }
}
