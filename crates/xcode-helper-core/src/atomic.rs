//! Write-to-temp-then-rename helper shared by the graph store and the
//! link-state record.

use std::{io, io::Write, path::Path};

use tempfile::NamedTempFile;

/// Replace `path` with `contents` so readers observe either the old or the
/// new file, never a truncated one.
pub fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
