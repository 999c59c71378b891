//! git plumbing adapters
//!
//! The commit source (`rev_list`) and the changeset content source are both
//! thin wrappers over git plumbing commands run in the current repository.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};

use ferry_core::{ChangesetContent, ChangesetExtra, CommitRecord, GitCommitId};
use ferry_store::ContentSource;

fn git(args: &[&str]) -> Result<Vec<u8>> {
    let output = Command::new("git")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run git {}", args.first().unwrap_or(&"")))?;
    if !output.status.success() {
        bail!(
            "git {} failed: {}",
            args.first().unwrap_or(&""),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.stdout)
}

/// The repository's git directory
pub fn git_dir() -> Result<PathBuf> {
    let out = git(&["rev-parse", "--absolute-git-dir"])?;
    let path = String::from_utf8(out).context("Non-UTF-8 git directory path")?;
    Ok(PathBuf::from(path.trim()))
}

/// Resolve a revision range into ordered commit records: topologically
/// sorted, ancestors first, full history, one record per commit.
pub fn rev_list(revs: &[String]) -> Result<Vec<CommitRecord>> {
    let mut args = vec![
        "rev-list",
        "--topo-order",
        "--full-history",
        "--parents",
        "--reverse",
    ];
    args.extend(revs.iter().map(|r| r.as_str()));
    let stdout = git(&args)?;
    parse_rev_list(&stdout)
}

fn parse_rev_list(stdout: &[u8]) -> Result<Vec<CommitRecord>> {
    let text = std::str::from_utf8(stdout).context("Non-UTF-8 rev-list output")?;
    let mut records = Vec::new();
    for line in text.lines() {
        let mut ids = line.split_whitespace();
        let id = match ids.next() {
            Some(id) => GitCommitId::from_hex(id)?,
            None => continue,
        };
        let parents = ids
            .map(GitCommitId::from_hex)
            .collect::<Result<Vec<_>>>()?;
        records.push(CommitRecord::new(id, parents));
    }
    Ok(records)
}

/// Changeset content backed by git plumbing.
#[derive(Debug, Default)]
pub struct GitContentSource;

impl GitContentSource {
    pub fn new() -> Self {
        Self
    }
}

impl ContentSource for GitContentSource {
    fn content(&self, commit: GitCommitId) -> Result<ChangesetContent> {
        // NUL-separated fields so the message stays opaque bytes.
        let format = "--format=%an <%ae>%x00%at%x00%ai%x00%cn <%ce>%x00%ct%x00%ci%x00%B";
        let id = commit.to_hex();
        let stdout = git(&["log", "-1", format, id.as_str()])?;

        let fields: Vec<&[u8]> = stdout.splitn(7, |&b| b == b'\0').collect();
        if fields.len() != 7 {
            bail!("Unexpected git log output for {}", commit);
        }
        let author = fields[0].to_vec();
        let timestamp: i64 = std::str::from_utf8(fields[1])?
            .trim()
            .parse()
            .context("Invalid author timestamp")?;
        let utcoffset = parse_utcoffset(fields[2])?;

        let mut extra = ChangesetExtra::new();
        let committer = fields[3];
        if committer != author.as_slice() {
            let ct: i64 = std::str::from_utf8(fields[4])?
                .trim()
                .parse()
                .context("Invalid committer timestamp")?;
            let coffset = parse_utcoffset(fields[5])?;
            let mut value = committer.to_vec();
            value.extend_from_slice(format!(" {ct} {coffset}").as_bytes());
            extra.set(b"committer".as_slice(), value);
        }

        let mut description = fields[6].to_vec();
        // git log appends a newline after the body.
        while description.last() == Some(&b'\n') {
            description.pop();
        }

        let files = changed_files(&id)?;

        Ok(ChangesetContent {
            author,
            timestamp,
            utcoffset,
            extra,
            files,
            description,
        })
    }

    fn manifest_seed(&self, commit: GitCommitId) -> Result<[u8; 20]> {
        let spec = format!("{}^{{tree}}", commit.to_hex());
        let out = git(&["rev-parse", spec.as_str()])?;
        let hex = std::str::from_utf8(&out)?.trim();
        let mut seed = [0u8; 20];
        hex::decode_to_slice(hex, &mut seed).context("Invalid tree id")?;
        Ok(seed)
    }
}

fn changed_files(id: &str) -> Result<Vec<Vec<u8>>> {
    let stdout = git(&[
        "diff-tree",
        "-r",
        "--root",
        "--no-commit-id",
        "--name-only",
        "-z",
        id,
    ])?;
    Ok(stdout
        .split(|&b| b == b'\0')
        .filter(|f| !f.is_empty())
        .map(|f| f.to_vec())
        .collect())
}

/// Convert a git `±HHMM` timezone to seconds west of UTC, the target
/// format's sign convention.
fn parse_utcoffset(date: &[u8]) -> Result<i32> {
    let date = std::str::from_utf8(date).context("Non-UTF-8 date")?;
    let tz = date
        .split_whitespace()
        .last()
        .context("Missing timezone in date")?
        .as_bytes();
    // Byte-wise so a multibyte token stays on the error path.
    if tz.len() != 5 || !tz[1..].iter().all(|b| b.is_ascii_digit()) {
        bail!(
            "Unexpected timezone format: {}",
            String::from_utf8_lossy(tz)
        );
    }
    let sign = match tz[0] {
        b'+' => 1i32,
        b'-' => -1i32,
        _ => bail!(
            "Unexpected timezone format: {}",
            String::from_utf8_lossy(tz)
        ),
    };
    let digit = |b: u8| i32::from(b - b'0');
    let hours = digit(tz[1]) * 10 + digit(tz[2]);
    let minutes = digit(tz[3]) * 10 + digit(tz[4]);
    let east = sign * (hours * 3600 + minutes * 60);
    Ok(-east)
}
