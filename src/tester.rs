//! Test runner
//!
//! After a rebind, three checks in increasing depth: can the rebuilt
//! native modules load at all, does the runtime report the library
//! version we just bound it to, and does the test suite pass. The
//! first two catch build/link and dynamic-linker problems that a green
//! compile would hide; only the last one is allowed to fail without
//! aborting the version.

use crate::build::version_matches;
use crate::config::RuntimeConfig;
use crate::error::{MultisslError, MultisslResult};
use crate::layout::{CacheLayout, VersionSpec};
use crate::proc::{command_in, display_argv};
use std::path::Path;
use std::process::Stdio;
use tracing::{debug, info};

/// Import smoke test: load the rebuilt native modules. A failure here
/// signals a broken build or link, not a failing test.
pub async fn check_imports(runtime: &RuntimeConfig, base_dir: &Path) -> MultisslResult<()> {
    debug!("Import check: {}", display_argv(&runtime.import_check));

    let output = command_in(&runtime.import_check, base_dir)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MultisslError::command_failed(display_argv(&runtime.import_check), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MultisslError::ImportCheckFailure {
            reason: stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Ask the runtime which library version it linked against and require
/// the requested version as a substring. This catches a misdirected
/// dynamic-linker search path that a successful compile would not.
pub async fn check_runtime_version(
    spec: &VersionSpec,
    layout: &CacheLayout,
    runtime: &RuntimeConfig,
    base_dir: &Path,
) -> MultisslResult<String> {
    debug!("Version probe: {}", display_argv(&runtime.version_probe));

    let output = command_in(&runtime.version_probe, base_dir)
        .env("LD_LIBRARY_PATH", layout.lib_dir())
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MultisslError::command_failed(display_argv(&runtime.version_probe), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MultisslError::ImportCheckFailure {
            reason: stderr.trim().to_string(),
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

/// Run the runtime's test command with pass-through args, streaming
/// output straight to the operator. Only the exit status is consulted.
pub async fn run_tests(
    runtime: &RuntimeConfig,
    base_dir: &Path,
    test_args: &[String],
) -> MultisslResult<()> {
    info!("Running {} {}", display_argv(&runtime.test), test_args.join(" "));

    let status = command_in(&runtime.test, base_dir)
        .args(test_args)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| MultisslError::command_failed(display_argv(&runtime.test), e))?;

    if !status.success() {
        return Err(MultisslError::TestFailure {
            status: status.to_string(),
        });
    }
    Ok(())
}
