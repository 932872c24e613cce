//! Library builder and installation verifier
//!
//! Runs the library's own configure/compile/install sequence into a
//! version-scoped prefix, then checks that the installed binary reports
//! the version we asked for. The build tree is ephemeral; the install
//! prefix is the cache.

use crate::error::{MultisslError, MultisslResult};
use crate::extract;
use crate::layout::{CacheLayout, VersionSpec};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Configure script shipped at the top of both families' tarballs.
const CONFIGURE_SCRIPT: &str = "config";

/// Unpack the cached archive into a fresh build directory, run
/// configure/make/install into the install prefix, then delete the
/// build directory. The caller has already ensured the source archive
/// exists and that no usable install is present.
pub async fn build_from_source(spec: &VersionSpec, layout: &CacheLayout) -> MultisslResult<()> {
    let build_dir = layout.build_dir().to_path_buf();
    fresh_dir(&build_dir)?;

    {
        let layout = layout.clone();
        tokio::task::spawn_blocking(move || {
            extract::extract(
                layout.archive_path(),
                layout.source_dir_name(),
                layout.build_dir(),
            )
        })
        .await
        .map_err(|e| MultisslError::io("extract task panicked", std::io::Error::other(e)))??;
    }

    info!("Running build in {}", build_dir.display());

    let mut configure = vec![
        "shared".to_string(),
        format!("--prefix={}", layout.install_dir().display()),
    ];
    configure.extend(spec.extra_args.iter().cloned());

    let script = build_dir.join(CONFIGURE_SCRIPT);
    run_step("configure", &script, &configure, &build_dir).await?;

    // Historical releases of both libraries have build systems that are
    // not reliably parallel-safe, so compile and install single-job.
    run_step("make", Path::new("make"), &["-j1".to_string()], &build_dir).await?;
    run_step(
        "make install",
        Path::new("make"),
        &["-j1".to_string(), "install".to_string()],
        &build_dir,
    )
    .await?;

    tokio::fs::remove_dir_all(&build_dir)
        .await
        .map_err(|e| MultisslError::io(format!("removing {}", build_dir.display()), e))?;

    Ok(())
}

/// Ask the installed binary for its version and require the requested
/// version string to appear in the report. Returns the reported string.
/// A mismatch leaves the install in place for inspection.
pub async fn verify_install(spec: &VersionSpec, layout: &CacheLayout) -> MultisslResult<String> {
    let bin = layout.bin_path();
    debug!("Probing {} version", bin.display());

    let output = Command::new(&bin)
        .arg("version")
        .env("LD_LIBRARY_PATH", layout.lib_dir())
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MultisslError::command_failed(bin.display().to_string(), e))?;

    if !output.status.success() {
        return Err(MultisslError::BuildFailure {
            step: "version probe".to_string(),
            status: output.status.to_string(),
        });
    }

    let reported = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !version_matches(&reported, &spec.version) {
        return Err(MultisslError::VersionMismatch {
            requested: spec.version.clone(),
            reported,
        });
    }

    Ok(reported)
}

/// The requested version must be a substring of the reported banner,
/// e.g. "1.1.0e" matches "OpenSSL 1.1.0e  25 Jan 2017".
pub fn version_matches(reported: &str, requested: &str) -> bool {
    reported.contains(requested)
}

/// Recreate a directory, destroying any stale contents.
fn fresh_dir(dir: &Path) -> MultisslResult<()> {
    if dir.is_dir() {
        std::fs::remove_dir_all(dir)
            .map_err(|e| MultisslError::io(format!("removing {}", dir.display()), e))?;
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| MultisslError::io(format!("creating {}", dir.display()), e))
}

/// Run one external build step with inherited stdio, failing on a
/// nonzero exit.
async fn run_step(step: &str, program: &Path, args: &[String], cwd: &Path) -> MultisslResult<()> {
    // The child chdirs into `cwd` before exec, so a relative script
    // path must be pinned to our cwd first. Bare names stay on PATH.
    let program = if program.is_relative() && program.components().nth(1).is_some() {
        std::path::absolute(program)
            .map_err(|e| MultisslError::io(format!("resolving {}", program.display()), e))?
    } else {
        program.to_path_buf()
    };

    debug!("Running {} {:?} in {}", program.display(), args, cwd.display());

    let status = Command::new(&program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| MultisslError::command_failed(program.display().to_string(), e))?;

    if !status.success() {
        return Err(MultisslError::BuildFailure {
            step: step.to_string(),
            status: status.to_string(),
        });
    }
    Ok(())
}
