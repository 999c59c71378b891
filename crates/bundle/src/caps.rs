//! Capability sets: which part kinds and sub-formats a bundle declares
//!
//! The set is static per bundle version, never negotiated with a live peer:
//! version 1 declares nothing, version 2 declares the `HG20` container
//! marker plus `changegroup: [01, 02]`.

use std::collections::BTreeMap;

use crate::error::{BundleError, Result};

/// The container presence marker declared by version-2 bundles.
pub const CONTAINER_MARKER: &str = "HG20";

/// Kinds of parts a bundle can carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PartKind {
    /// A changegroup stream
    Changegroup,
}

impl PartKind {
    /// Wire name of the part kind
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Changegroup => "changegroup",
        }
    }
}

impl std::fmt::Display for PartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Changegroup sub-format versions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CgVersion {
    /// `01`: implicit delta bases
    V01,
    /// `02`: explicit delta bases
    V02,
}

impl CgVersion {
    /// Wire name of the sub-format
    pub fn as_str(&self) -> &'static str {
        match self {
            CgVersion::V01 => "01",
            CgVersion::V02 => "02",
        }
    }
}

impl std::fmt::Display for CgVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated mapping of part kinds to their supported sub-formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    /// Whether the set declares the version-2 container itself
    container: bool,
    entries: BTreeMap<PartKind, Vec<CgVersion>>,
}

impl CapabilitySet {
    /// The empty set, used for version-1 bundles
    pub fn empty() -> Self {
        Self {
            container: false,
            entries: BTreeMap::new(),
        }
    }

    /// The fixed default for version-2 bundles: the container marker plus
    /// `changegroup: [01, 02]`
    pub fn v2_default() -> Self {
        Self {
            container: true,
            entries: BTreeMap::from([(PartKind::Changegroup, vec![CgVersion::V01, CgVersion::V02])]),
        }
    }

    /// Build a set from explicit entries, validating at construction:
    /// every kind must carry a non-empty, strictly ascending version list.
    pub fn new(
        container: bool,
        entries: impl IntoIterator<Item = (PartKind, Vec<CgVersion>)>,
    ) -> Result<Self> {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();
        for (kind, versions) in &entries {
            if versions.is_empty() {
                return Err(BundleError::InvalidCapabilities(format!(
                    "{kind} declares no sub-format versions"
                )));
            }
            if !versions.windows(2).all(|w| w[0] < w[1]) {
                return Err(BundleError::InvalidCapabilities(format!(
                    "{kind} versions must be strictly ascending"
                )));
            }
        }
        Ok(Self { container, entries })
    }

    /// Whether the set declares nothing at all
    pub fn is_empty(&self) -> bool {
        !self.container && self.entries.is_empty()
    }

    /// Declared sub-formats for a kind
    pub fn versions(&self, kind: PartKind) -> Option<&[CgVersion]> {
        self.entries.get(&kind).map(|v| v.as_slice())
    }

    /// The newest declared sub-format for a kind
    pub fn newest(&self, kind: PartKind) -> Option<CgVersion> {
        self.entries.get(&kind).and_then(|v| v.last().copied())
    }

    /// Render the capability blob embedded in the version-2 stream header:
    /// one line per capability, `kind=v1,v2` for kinds with versions.
    pub fn encode_blob(&self) -> Vec<u8> {
        let mut lines = Vec::new();
        if self.container {
            lines.push(CONTAINER_MARKER.to_string());
        }
        for (kind, versions) in &self.entries {
            let versions = versions
                .iter()
                .map(CgVersion::as_str)
                .collect::<Vec<_>>()
                .join(",");
            lines.push(format!("{kind}={versions}"));
        }
        lines.join("\n").into_bytes()
    }
}
