//! Create a Mercurial bundle from a git revision range

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use ferry_bundle::{create_bundle, BundleOutcome, BundleVersion};
use ferry_store::TranslationStore;

use crate::git::{self, GitContentSource};

pub fn run(version: u8, path: &Path, revs: &[String]) -> Result<()> {
    // 1. Resolve the revision range into ordered commit records
    let commits = git::rev_list(revs).context("Failed to list commits")?;
    if commits.is_empty() {
        // Nothing resolved is a success, distinct from translation failure.
        println!("{}", "Nothing to bundle.".dimmed());
        return Ok(());
    }

    // 2. Open the translation store for this build
    let store_dir = git::git_dir()?.join("hgferry");
    std::fs::create_dir_all(&store_dir)
        .with_context(|| format!("Failed to create {}", store_dir.display()))?;
    let mut store = TranslationStore::open(&store_dir).context("Failed to open store")?;

    // 3. Encode and write the bundle
    let version = match version {
        1 => BundleVersion::V1,
        _ => BundleVersion::V2,
    };
    let source = GitContentSource::new();
    let result = create_bundle(&mut store, &source, &commits, version, path);

    // 4. Bundle builds are non-cumulative: roll back even on success
    if !store.is_closed() {
        store.close(false)?;
    }

    match result.context("Failed to create bundle")? {
        BundleOutcome::Empty => {
            println!("{}", "Nothing to bundle.".dimmed());
        }
        BundleOutcome::Written { changesets } => {
            println!(
                "{} Wrote {} changeset(s) to {}",
                "✓".green(),
                changesets.to_string().green(),
                path.display().to_string().yellow()
            );
        }
    }

    Ok(())
}
