//! Safe tar.gz extraction
//!
//! Unpacks a source archive into a fresh build directory. Entry names
//! are strictly allow-listed: everything must live under the single
//! expected top-level directory, and that prefix is stripped on the way
//! out. Anything else aborts the extraction as a security fault, even
//! if the name looks harmless. Link entries get the same treatment:
//! their targets must stay inside the tree, and no write ever steps
//! through a symlinked directory.

use crate::error::{MultisslError, MultisslResult};
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Component, Path};
use tar::EntryType;
use tracing::{debug, info};

/// Extract `archive` into `dest`. The caller must have created `dest`
/// fresh; stale contents are its problem, escaped paths are ours.
pub fn extract(archive: &Path, expected_top: &str, dest: &Path) -> MultisslResult<()> {
    let file = fs::File::open(archive)
        .map_err(|e| MultisslError::io(format!("opening {}", archive.display()), e))?;
    let mut tar = tar::Archive::new(GzDecoder::new(file));

    info!("Unpacking {} to {}", archive.display(), dest.display());

    let mut count = 0usize;
    for entry in tar.entries().map_err(|e| archive_err(archive, e))? {
        let mut entry = entry.map_err(|e| archive_err(archive, e))?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();

        let Some(rel) = strip_entry_name(&name, expected_top)? else {
            // root sentinel, nothing to write
            continue;
        };

        ensure_parent_dirs(dest, Path::new(&rel))?;

        let kind = entry.header().entry_type();
        if kind == EntryType::Symlink || kind == EntryType::Link {
            let target = entry
                .link_name()
                .map_err(|e| archive_err(archive, e))?
                .ok_or_else(|| MultisslError::ArchiveInvalid {
                    archive: archive.to_path_buf(),
                    reason: format!("link entry {name} has no target"),
                })?;
            if link_escapes(Path::new(&rel), &target) {
                return Err(MultisslError::PathTraversal { entry: name });
            }
        }

        entry
            .unpack(dest.join(&rel))
            .map_err(|e| archive_err(archive, e))?;
        count += 1;
    }

    debug!("Unpacked {count} entries");
    Ok(())
}

/// Validate one entry name against the expected top-level directory.
///
/// Returns `None` for the root sentinel itself, `Ok(Some(rel))` with
/// the prefix (and any leading separators) stripped for accepted
/// entries, and `PathTraversalError` for everything else.
fn strip_entry_name(name: &str, expected_top: &str) -> MultisslResult<Option<String>> {
    if name.trim_end_matches('/') == expected_top {
        return Ok(None);
    }

    let rest = name
        .strip_prefix(expected_top)
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(|| MultisslError::PathTraversal {
            entry: name.to_string(),
        })?;

    let rel = rest.trim_start_matches('/');
    if rel.is_empty() {
        return Ok(None);
    }

    // The prefix check alone still admits "top/../evil"
    let escapes = Path::new(rel)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
    if escapes {
        return Err(MultisslError::PathTraversal {
            entry: name.to_string(),
        });
    }

    Ok(Some(rel.to_string()))
}

/// Create the directories above `rel` inside `dest`, one component at
/// a time. Anything already present that is not a plain directory is
/// rejected: a symlink planted by an earlier entry must never redirect
/// a later write out of `dest`.
fn ensure_parent_dirs(dest: &Path, rel: &Path) -> MultisslResult<()> {
    let Some(parent) = rel.parent() else {
        return Ok(());
    };
    let mut dir = dest.to_path_buf();
    for comp in parent.components() {
        dir.push(comp);
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(MultisslError::PathTraversal {
                    entry: rel.display().to_string(),
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                fs::create_dir(&dir)
                    .map_err(|e| MultisslError::io(format!("creating {}", dir.display()), e))?;
            }
            Err(e) => {
                return Err(MultisslError::io(format!("inspecting {}", dir.display()), e));
            }
        }
    }
    Ok(())
}

/// A link target may point elsewhere in the tree, but never above the
/// destination root. Absolute targets are rejected outright; relative
/// ones are walked lexically from the entry's own directory.
fn link_escapes(rel: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return true;
    }
    let mut depth = rel.parent().map_or(0, |p| p.components().count() as i64);
    for comp in target.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            _ => return true,
        }
    }
    false
}

fn archive_err(archive: &Path, e: std::io::Error) -> MultisslError {
    MultisslError::ArchiveInvalid {
        archive: archive.to_path_buf(),
        reason: e.to_string(),
    }
}
