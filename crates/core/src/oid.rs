//! 20-byte identifier types for git commits and Mercurial nodes

use serde::{Deserialize, Serialize};

/// The all-zero node, used for absent parents.
pub const NULL_NODE: [u8; 20] = [0; 20];

macro_rules! oid_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name([u8; 20]);

        impl $name {
            /// Create from raw bytes
            pub const fn from_bytes(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }

            /// The all-zero id
            pub const fn null() -> Self {
                Self(NULL_NODE)
            }

            /// Whether this is the all-zero id
            pub fn is_null(&self) -> bool {
                self.0 == NULL_NODE
            }

            /// Get the id as a byte slice
            pub fn as_bytes(&self) -> &[u8; 20] {
                &self.0
            }

            /// Convert to a 40-character lowercase hex string
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from a 40-character hex string
            pub fn from_hex(s: &str) -> anyhow::Result<Self> {
                if s.len() != 40 {
                    anyhow::bail!(
                        "Invalid hex length: expected 40 characters, got {}",
                        s.len()
                    );
                }
                let mut bytes = [0u8; 20];
                hex::decode_to_slice(s, &mut bytes)?;
                Ok(Self(bytes))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.to_hex())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }
    };
}

oid_type! {
    /// A git commit id (SHA-1 of the commit object)
    GitCommitId
}

oid_type! {
    /// A Mercurial changeset node, derived from parents + changeset text
    HgChangesetId
}

oid_type! {
    /// A Mercurial manifest node
    HgManifestId
}
