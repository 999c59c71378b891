//! The versioned bundle container
//!
//! Version 1 is the bare changegroup stream. Version 2 wraps payloads in the
//! `HG20` container: a magic header with percent-encoded stream parameters
//! (the capability declaration), then framed parts. Each part carries a
//! header (type name, part id, params) and a chunked, zero-terminated
//! payload; a zero-length header ends the bundle.

use bytes::{BufMut, Bytes, BytesMut};
use percent_encoding::{percent_encode, NON_ALPHANUMERIC};

use crate::caps::{CapabilitySet, CgVersion, PartKind};

/// The version-2 container magic.
pub const BUNDLE2_MAGIC: &[u8; 4] = b"HG20";

/// Target bundle format version.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BundleVersion {
    /// Raw changegroup stream, no framing header
    V1,
    /// `HG20` container with capability declaration and framed parts
    V2,
}

impl std::fmt::Display for BundleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleVersion::V1 => f.write_str("1"),
            BundleVersion::V2 => f.write_str("2"),
        }
    }
}

/// One framed payload of a bundle. Immutable after creation.
#[derive(Debug, Clone)]
pub struct BundlePart {
    kind: PartKind,
    sub_version: CgVersion,
    payload: Bytes,
}

impl BundlePart {
    /// Create a part from an encoded payload
    pub fn new(kind: PartKind, sub_version: CgVersion, payload: Bytes) -> Self {
        Self {
            kind,
            sub_version,
            payload,
        }
    }

    /// Part kind
    pub fn kind(&self) -> PartKind {
        self.kind
    }

    /// Sub-format version of the payload
    pub fn sub_version(&self) -> CgVersion {
        self.sub_version
    }

    /// Encoded payload bytes
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// A fully-encoded bundle, ready to be written.
#[derive(Debug, Clone)]
pub struct Bundle {
    version: BundleVersion,
    caps: CapabilitySet,
    parts: Vec<BundlePart>,
}

impl Bundle {
    /// Assemble a bundle from its parts; part order is preserved verbatim
    pub fn new(version: BundleVersion, caps: CapabilitySet, parts: Vec<BundlePart>) -> Self {
        Self {
            version,
            caps,
            parts,
        }
    }

    /// Declared format version
    pub fn version(&self) -> BundleVersion {
        self.version
    }

    /// Embedded capability set
    pub fn caps(&self) -> &CapabilitySet {
        &self.caps
    }

    /// Parts in processing order
    pub fn parts(&self) -> &[BundlePart] {
        &self.parts
    }

    /// Serialize the whole bundle
    pub fn to_bytes(&self) -> Bytes {
        match self.version {
            BundleVersion::V1 => {
                let mut out = BytesMut::new();
                for part in &self.parts {
                    out.put_slice(part.payload());
                }
                out.freeze()
            }
            BundleVersion::V2 => {
                let mut out = BytesMut::new();
                out.put_slice(BUNDLE2_MAGIC);
                let params = stream_params(&self.caps);
                out.put_u32(params.len() as u32);
                out.put_slice(&params);
                for (id, part) in self.parts.iter().enumerate() {
                    write_part(&mut out, id as u32, part);
                }
                // Zero header length: end of parts.
                out.put_u32(0);
                out.freeze()
            }
        }
    }
}

/// Render the stream parameters: the capability blob percent-encoded as a
/// `capabilities=` parameter.
fn stream_params(caps: &CapabilitySet) -> Vec<u8> {
    let blob = caps.encode_blob();
    if blob.is_empty() {
        return Vec::new();
    }
    let mut params = b"capabilities=".to_vec();
    params.extend(percent_encode(&blob, NON_ALPHANUMERIC).to_string().into_bytes());
    params
}

fn write_part(out: &mut BytesMut, id: u32, part: &BundlePart) {
    let kind = part.kind().as_str().as_bytes();
    let key = b"version";
    let value = part.sub_version().as_str().as_bytes();

    let mut header = BytesMut::new();
    header.put_u8(kind.len() as u8);
    header.put_slice(kind);
    header.put_u32(id);
    // One mandatory param (the sub-format version), no advisory params.
    header.put_u8(1);
    header.put_u8(0);
    header.put_u8(key.len() as u8);
    header.put_u8(value.len() as u8);
    header.put_slice(key);
    header.put_slice(value);

    out.put_u32(header.len() as u32);
    out.put_slice(&header);

    // Chunked payload, zero-terminated; chunk sizes exclude the size word.
    if !part.payload().is_empty() {
        out.put_u32(part.payload().len() as u32);
        out.put_slice(part.payload());
    }
    out.put_u32(0);
}
