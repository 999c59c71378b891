//! Bundle encoding pipeline
//!
//! `encode` turns an ordered commit sequence into a `Bundle`; `create_bundle`
//! runs the whole pipeline and writes the result atomically. The commit
//! source must supply ancestors before descendants; nothing here re-sorts.

use std::path::Path;

use tracing::{debug, info};

use ferry_core::CommitRecord;
use ferry_store::{ContentSource, TranslationStore};

use crate::bundle2::{Bundle, BundlePart, BundleVersion};
use crate::caps::{CapabilitySet, CgVersion, PartKind};
use crate::changegroup::ChangegroupBuilder;
use crate::error::{BundleError, Result};
use crate::writer::BundleWriter;

/// What a bundle build produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    /// Zero commits were supplied; no file was written. This is a success.
    Empty,
    /// A bundle was written with this many changesets.
    Written { changesets: usize },
}

/// Pick the changegroup sub-format for a version/capability pair, and check
/// the pair is coherent.
fn negotiate(version: BundleVersion, caps: &CapabilitySet) -> Result<CgVersion> {
    match version {
        BundleVersion::V1 => {
            if !caps.is_empty() {
                return Err(BundleError::InvalidCapabilities(
                    "version-1 bundles declare no capabilities".into(),
                ));
            }
            Ok(CgVersion::V01)
        }
        BundleVersion::V2 => caps.newest(PartKind::Changegroup).ok_or_else(|| {
            BundleError::InvalidCapabilities(
                "version-2 bundles require a changegroup capability".into(),
            )
        }),
    }
}

/// Encode an ordered commit sequence into a bundle.
///
/// Every commit is resolved through the store in input order, so part
/// content order equals input order. Empty input is a documented no-op and
/// returns `Ok(None)`.
pub fn encode(
    commits: &[CommitRecord],
    store: &mut TranslationStore,
    source: &dyn ContentSource,
    version: BundleVersion,
    caps: CapabilitySet,
) -> Result<Option<Bundle>> {
    let sub_version = negotiate(version, &caps)?;

    if commits.is_empty() {
        debug!("empty commit range, nothing to encode");
        return Ok(None);
    }

    let mut builder = ChangegroupBuilder::new(sub_version);
    for record in commits {
        let translated = store.resolve_or_create(record, source)?;
        let changeset = store.changeset(translated.changeset).ok_or_else(|| {
            BundleError::Encoding(format!(
                "changeset {} missing from store after resolve",
                translated.changeset
            ))
        })?;
        builder.add_changeset(changeset);
    }
    debug!(changesets = builder.len(), %sub_version, "encoded changegroup");

    let part = BundlePart::new(PartKind::Changegroup, sub_version, builder.finish());
    Ok(Some(Bundle::new(version, caps, vec![part])))
}

/// Build a bundle for `commits` and write it to `path`.
///
/// On any failure the store is rolled back before the error propagates and
/// no file is left at the destination. On success the store is left open;
/// the caller owns the transaction boundary and decides whether to commit
/// or roll back.
pub fn create_bundle(
    store: &mut TranslationStore,
    source: &dyn ContentSource,
    commits: &[CommitRecord],
    version: BundleVersion,
    path: &Path,
) -> Result<BundleOutcome> {
    let caps = match version {
        BundleVersion::V1 => CapabilitySet::empty(),
        BundleVersion::V2 => CapabilitySet::v2_default(),
    };

    let result = build_and_write(store, source, commits, version, caps, path);
    if result.is_err() && !store.is_closed() {
        // Rollback before surfacing; a second failure here cannot mask the
        // original error.
        let _ = store.close(false);
    }
    result
}

fn build_and_write(
    store: &mut TranslationStore,
    source: &dyn ContentSource,
    commits: &[CommitRecord],
    version: BundleVersion,
    caps: CapabilitySet,
    path: &Path,
) -> Result<BundleOutcome> {
    let bundle = match encode(commits, store, source, version, caps)? {
        Some(bundle) => bundle,
        None => return Ok(BundleOutcome::Empty),
    };

    let mut writer = BundleWriter::create(path)?;
    writer.write_all(&bundle.to_bytes())?;
    writer.finalize()?;

    info!(
        changesets = commits.len(),
        %version,
        path = %path.display(),
        "wrote bundle"
    );
    Ok(BundleOutcome::Written {
        changesets: commits.len(),
    })
}
