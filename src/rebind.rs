//! Runtime rebinder
//!
//! Forces the dependent runtime to treat one install prefix as the
//! authoritative library: touch every source file that uses the
//! library API, purge stale compiled artifacts so nothing gets
//! relinked, then rebuild under a search-path environment overlay.
//! The overlay is applied per child process only; this process's own
//! environment is never mutated.

use crate::config::RuntimeConfig;
use crate::error::{MultisslError, MultisslResult};
use crate::layout::CacheLayout;
use crate::proc::{command_in, display_argv};
use std::path::Path;
use std::process::Stdio;
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Rebuild the runtime's native modules against this layout's install.
pub async fn rebind(
    layout: &CacheLayout,
    runtime: &RuntimeConfig,
    base_dir: &Path,
) -> MultisslResult<()> {
    touch_sources(base_dir, &runtime.module_files)?;

    let build_tree = base_dir.join(&runtime.build_tree);
    let purged = purge_artifacts(&build_tree, &runtime.artifact_prefixes)?;
    debug!("Purged {purged} stale artifacts from {}", build_tree.display());

    info!("Rebuilding runtime modules against {}", layout.install_dir().display());

    let status = command_in(&runtime.build, base_dir)
        .envs(overlay_env(layout))
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| MultisslError::command_failed(display_argv(&runtime.build), e))?;

    if !status.success() {
        return Err(MultisslError::RebindFailure {
            status: status.to_string(),
        });
    }
    Ok(())
}

/// Search-path overlay pointing the runtime's build at one install:
/// header search, library search, and the run-time linker path.
pub fn overlay_env(layout: &CacheLayout) -> Vec<(String, String)> {
    let include = layout.include_dir();
    let lib = layout.lib_dir();
    vec![
        ("CPPFLAGS".to_string(), format!("-I{}", include.display())),
        ("LDFLAGS".to_string(), format!("-L{}", lib.display())),
        ("LD_RUN_PATH".to_string(), lib.display().to_string()),
    ]
}

/// Bump the mtime of every source file known to reference the library
/// API so the runtime's incremental build recompiles them.
fn touch_sources(base_dir: &Path, files: &[String]) -> MultisslResult<()> {
    for name in files {
        let path = base_dir.join(name);
        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| MultisslError::io(format!("touching {}", path.display()), e))?;
        file.set_modified(SystemTime::now())
            .map_err(|e| MultisslError::io(format!("touching {}", path.display()), e))?;
    }
    Ok(())
}

/// Delete every file under `tree` whose filename starts with one of the
/// affected native-module prefixes. Returns the number removed. A
/// missing tree is fine; the runtime simply has not built yet.
pub fn purge_artifacts(tree: &Path, prefixes: &[String]) -> MultisslResult<usize> {
    if !tree.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in WalkDir::new(tree) {
        let entry = entry.map_err(|e| {
            MultisslError::io(
                format!("walking {}", tree.display()),
                std::io::Error::other(e),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if prefixes.iter().any(|p| name.starts_with(p.as_str())) {
            debug!("Removing stale artifact {}", entry.path().display());
            std::fs::remove_file(entry.path())
                .map_err(|e| MultisslError::io(format!("removing {}", entry.path().display()), e))?;
            removed += 1;
        }
    }
    Ok(removed)
}
