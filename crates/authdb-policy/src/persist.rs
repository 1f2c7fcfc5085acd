//! Whole-file replacement of the policy.
//!
//! New content goes to a temporary file next to the target, picks up the
//! target's permissions, is synced, then renamed over the target. Readers see
//! either the old file or the new one, never a partial write.
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::{PolicyError, Result};

const REPLACEMENT_PREFIX: &str = ".authdb";
const REPLACEMENT_SUFFIX: &str = ".tmp";

/// Replaces the file at `path` with `content`.
///
/// Symlinks are resolved first so the link itself stays in place.
pub fn write_policy(path: &Path, content: &str) -> Result<()> {
    let target = fs::canonicalize(path).map_err(PolicyError::io(path))?;
    let parent = target.parent().unwrap_or_else(|| Path::new("/"));
    let permissions = fs::metadata(&target)
        .map_err(PolicyError::io(&target))?
        .permissions();

    let mut tmp = tempfile::Builder::new()
        .prefix(REPLACEMENT_PREFIX)
        .suffix(REPLACEMENT_SUFFIX)
        .tempfile_in(parent)
        .map_err(PolicyError::io(parent))?;
    tmp.write_all(content.as_bytes())
        .map_err(PolicyError::io(tmp.path()))?;
    fs::set_permissions(tmp.path(), permissions).map_err(PolicyError::io(tmp.path()))?;
    tmp.as_file()
        .sync_all()
        .map_err(PolicyError::io(tmp.path()))?;

    tmp.persist(&target)
        .map_err(|e| PolicyError::io(&target)(e.error))?;

    if let Err(e) = fsync_parent_dir(parent) {
        debug!(dir = %parent.display(), error = %e, "parent directory fsync failed");
    }
    info!(path = %target.display(), bytes = content.len(), "replaced policy file");
    Ok(())
}

fn fsync_parent_dir(dir: &Path) -> std::io::Result<()> {
    fs::File::open(dir)?.sync_all()
}
