//! Atomic file operations for cache persistence.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

/// Write data to a file atomically using temp file + rename.
///
/// The temp file is created next to the target so the rename never crosses
/// a filesystem boundary. Readers observe either the old content or the new
/// content, never a partial write.
pub fn atomic_write<P: AsRef<Path>>(path: P, data: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".inkube-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(data)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), bytes = data.len(), "Atomic write completed");
    Ok(())
}
