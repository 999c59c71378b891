//! Atomic bundle output
//!
//! Bytes are staged in a temporary file next to the destination and the
//! destination is only ever created by an atomic rename after a successful
//! flush. A writer dropped without `finalize` removes its temp file, so a
//! failed run leaves no partial output and never touches an existing file
//! at the destination.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{BundleError, Result};

/// Streams bundle bytes to a destination path, all-or-nothing.
pub struct BundleWriter {
    temp: NamedTempFile,
    dest: PathBuf,
}

impl BundleWriter {
    /// Open a writer targeting `dest`. The temp file lives in the same
    /// directory so the final rename stays on one filesystem.
    pub fn create(dest: &Path) -> Result<Self> {
        let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
        let temp = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new_in(".")?,
        };
        Ok(Self {
            temp,
            dest: dest.to_path_buf(),
        })
    }

    /// Append bytes to the staged output
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.temp.write_all(data)?;
        Ok(())
    }

    /// Flush and atomically move the staged file to the destination
    pub fn finalize(mut self) -> Result<()> {
        self.temp.flush()?;
        self.temp
            .persist(&self.dest)
            .map_err(|e| BundleError::Io(e.error))?;
        debug!(path = %self.dest.display(), "finalized bundle file");
        Ok(())
    }
}
