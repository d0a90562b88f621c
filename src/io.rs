//! File helpers moving whole documents between disk and the arena.
//!
//! These are the only operations in the crate that touch the filesystem.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::arena::{Arena, BufferId, SizeClass};
use crate::error::{PooldocError, Result};

/// Reads a whole file into a new buffer.
///
/// # Errors
/// `OutOfCapacity` if the file is larger than the largest size class or the
/// fitting class is exhausted; `Io` on filesystem errors.
pub fn load_file(arena: &mut Arena, path: impl AsRef<Path>) -> Result<BufferId> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let len = usize::try_from(file.metadata()?.len()).unwrap_or(usize::MAX);
    if len > SizeClass::MAX_CAPACITY {
        return Err(PooldocError::OutOfCapacity {
            requested: len,
            detail: format!("{} exceeds the largest size class", path.display()),
        });
    }
    let buf = arena.buffer_alloc(len)?;
    let read = {
        let slot = arena.slot_mut(buf)?;
        file.read_exact(&mut slot[..len])
    };
    if let Err(e) = read {
        arena.buffer_free(buf)?;
        return Err(e.into());
    }
    arena.set_buffer_len(buf, len)?;
    tracing::debug!(path = %path.display(), bytes = len, "loaded file");
    Ok(buf)
}

/// Writes the content of `buf` to `path`, truncating any existing file.
pub fn store_file(arena: &Arena, buf: BufferId, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = arena.buffer_bytes(buf)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "stored file");
    Ok(())
}
