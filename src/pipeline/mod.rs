//! Pipeline orchestrator
//!
//! Drives every declared version through fetch, build, verify, rebind
//! and test, in two phases: all installations first, so build breakage
//! surfaces before the runtime is ever rebound, then rebind-and-test
//! per surviving version. Errors are caught at the per-version
//! boundary; the batch always runs to the end and reports every
//! version's own outcome.

use crate::build;
use crate::config::Config;
use crate::error::{MultisslError, MultisslResult};
use crate::fetch;
use crate::layout::{CacheLayout, VersionSpec};
use crate::rebind;
use crate::tester;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Per-version progress through the pipeline. Terminal states are
/// `Tested`, or any earlier stage paired with a recorded error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Pending,
    Sourced,
    Installed,
    Verified,
    Rebound,
    Tested,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Sourced => "sourced",
            Stage::Installed => "installed",
            Stage::Verified => "verified",
            Stage::Rebound => "rebound",
            Stage::Tested => "tested",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run state for one version during this invocation. Never persisted;
/// the filesystem itself is the only durable record.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildRecord {
    pub source_cached: bool,
    pub already_installed: bool,
    pub freshly_built: bool,
}

/// One version's final outcome.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub family: String,
    pub version: String,
    pub ok: bool,
    pub stage: Stage,
    /// Name of the stage that failed, if any
    pub failed_stage: Option<String>,
    pub error: Option<String>,
    /// Reported library version, once known
    pub summary: Option<String>,
    /// Whether an existing install was reused
    pub cache_hit: bool,
}

impl PipelineResult {
    pub fn label(&self) -> String {
        format!("{}-{}", self.family, self.version)
    }
}

/// Outcomes for the whole batch.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub results: Vec<PipelineResult>,
    pub elapsed_secs: f64,
}

impl BatchReport {
    pub fn any_failed(&self) -> bool {
        self.results.iter().any(|r| !r.ok)
    }

    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.ok).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }
}

struct Entry {
    spec: VersionSpec,
    layout: CacheLayout,
    record: BuildRecord,
    stage: Stage,
    attempt: &'static str,
    error: Option<MultisslError>,
    summary: Option<String>,
}

impl Entry {
    fn fail(&mut self, err: MultisslError) {
        if err.is_security_fault() {
            // surfaced in full, not summarized: a traversal attempt in
            // a source archive is never a transient condition
            error!("[{}] security fault during {}: {}", self.spec.label(), self.attempt, err);
        } else {
            warn!("[{}] {} failed: {}", self.spec.label(), self.attempt, err);
        }
        self.error = Some(err);
    }

    fn into_result(self) -> PipelineResult {
        PipelineResult {
            family: self.spec.family.to_string(),
            version: self.spec.version.clone(),
            ok: self.error.is_none(),
            stage: self.stage,
            failed_stage: self.error.as_ref().map(|_| self.attempt.to_string()),
            error: self.error.map(|e| e.to_string()),
            summary: self.summary,
            cache_hit: self.record.already_installed,
        }
    }
}

/// Sequences the whole batch. One external process at a time, no
/// timeouts: this is an operator-invoked batch job.
pub struct Pipeline<'a> {
    config: &'a Config,
    /// Runtime build directory; collaborator commands run here
    base_dir: PathBuf,
    /// Root for archives, build trees and install prefixes
    cache_root: PathBuf,
    build_only: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, base_dir: PathBuf, cache_root: PathBuf, build_only: bool) -> Self {
        Self {
            config,
            base_dir,
            cache_root,
            build_only,
        }
    }

    /// Drive all specs to a terminal state and report.
    pub async fn run(
        &self,
        specs: Vec<VersionSpec>,
        test_args: &[String],
    ) -> MultisslResult<BatchReport> {
        if specs.is_empty() {
            return Err(MultisslError::NoVersions);
        }

        let start = Instant::now();
        let mut entries: Vec<Entry> = specs
            .into_iter()
            .map(|spec| {
                let layout =
                    CacheLayout::new(&self.cache_root, self.config.family(spec.family), &spec);
                Entry {
                    spec,
                    layout,
                    record: BuildRecord::default(),
                    stage: Stage::Pending,
                    attempt: "source",
                    error: None,
                    summary: None,
                }
            })
            .collect();

        // Phase one: every install, so build failures surface before
        // the runtime is rebound even once.
        for entry in entries.iter_mut() {
            if let Err(err) = self.install_one(entry).await {
                entry.fail(err);
            }
        }

        // Phase two: rebind and test each survivor in turn.
        if !self.build_only {
            for entry in entries.iter_mut().filter(|e| e.stage == Stage::Verified) {
                if let Err(err) = self.test_one(entry, test_args).await {
                    entry.fail(err);
                }
            }
        }

        Ok(BatchReport {
            results: entries.into_iter().map(Entry::into_result).collect(),
            elapsed_secs: start.elapsed().as_secs_f64(),
        })
    }

    async fn install_one(&self, entry: &mut Entry) -> MultisslResult<()> {
        entry.record.already_installed = entry.layout.is_installed();

        if entry.record.already_installed {
            info!(
                "[{}] already installed at {}",
                entry.spec.label(),
                entry.layout.install_dir().display()
            );
            entry.stage = Stage::Installed;
        } else {
            entry.attempt = "source";
            entry.record.source_cached = entry.layout.has_source();
            let layout = entry.layout.clone();
            tokio::task::spawn_blocking(move || fetch::ensure_source(&layout))
                .await
                .map_err(|e| MultisslError::io("fetch task panicked", std::io::Error::other(e)))??;
            entry.stage = Stage::Sourced;

            entry.attempt = "build";
            build::build_from_source(&entry.spec, &entry.layout).await?;
            entry.record.freshly_built = true;
            entry.stage = Stage::Installed;
        }

        // always re-verified, even on a cache hit: a corrupted cache
        // must not silently pass
        entry.attempt = "verify";
        let reported = build::verify_install(&entry.spec, &entry.layout).await?;
        info!("[{}] verified: {}", entry.spec.label(), reported);
        entry.summary = Some(reported);
        entry.stage = Stage::Verified;
        Ok(())
    }

    async fn test_one(&self, entry: &mut Entry, test_args: &[String]) -> MultisslResult<()> {
        entry.attempt = "rebind";
        rebind::rebind(&entry.layout, &self.config.runtime, &self.base_dir).await?;
        entry.stage = Stage::Rebound;

        entry.attempt = "import";
        tester::check_imports(&self.config.runtime, &self.base_dir).await?;

        entry.attempt = "version-check";
        let reported = tester::check_runtime_version(
            &entry.spec,
            &entry.layout,
            &self.config.runtime,
            &self.base_dir,
        )
        .await?;
        entry.summary = Some(reported);

        entry.attempt = "test";
        tester::run_tests(&self.config.runtime, &self.base_dir, test_args).await?;
        entry.stage = Stage::Tested;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Family;

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Pending.to_string(), "pending");
        assert_eq!(Stage::Tested.to_string(), "tested");
        assert!(Stage::Pending < Stage::Sourced);
        assert!(Stage::Rebound < Stage::Tested);
    }

    #[test]
    fn report_counts() {
        let ok = PipelineResult {
            family: "openssl".into(),
            version: "1.0.2".into(),
            ok: true,
            stage: Stage::Tested,
            failed_stage: None,
            error: None,
            summary: Some("OpenSSL 1.0.2".into()),
            cache_hit: true,
        };
        let mut bad = ok.clone();
        bad.ok = false;
        bad.stage = Stage::Sourced;
        bad.failed_stage = Some("build".into());

        let report = BatchReport {
            results: vec![ok, bad],
            elapsed_secs: 1.0,
        };
        assert!(report.any_failed());
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn result_serializes_for_json_output() {
        let result = PipelineResult {
            family: "libressl".into(),
            version: "2.4.2".into(),
            ok: false,
            stage: Stage::Installed,
            failed_stage: Some("verify".into()),
            error: Some("mismatch".into()),
            summary: None,
            cache_hit: false,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"stage\":\"installed\""));
        assert!(json.contains("\"failed_stage\":\"verify\""));
        assert_eq!(result.label(), "libressl-2.4.2");
    }

    #[cfg(unix)]
    mod end_to_end {
        use super::*;
        use crate::config::{Config, RuntimeConfig};
        use crate::layout::CacheLayout;
        use std::path::Path;
        use tempfile::TempDir;

        fn install_fake_binary(root: &Path, config: &Config, spec: &VersionSpec, banner: &str) {
            use std::os::unix::fs::PermissionsExt;
            let layout = CacheLayout::new(root, config.family(spec.family), spec);
            let bin = layout.bin_path();
            std::fs::create_dir_all(bin.parent().unwrap()).unwrap();
            std::fs::write(&bin, format!("#!/bin/sh\necho \"{banner}\"\n")).unwrap();
            std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn stub_runtime(probe_banner: &str) -> RuntimeConfig {
            RuntimeConfig {
                build: vec!["true".into()],
                import_check: vec!["true".into()],
                version_probe: vec!["sh".into(), "-c".into(), format!("echo '{probe_banner}'")],
                test: vec!["true".into()],
                module_files: vec![],
                ..RuntimeConfig::default()
            }
        }

        #[tokio::test]
        async fn batch_continues_after_a_failure() {
            let temp = TempDir::new().unwrap();
            let mut config = Config::default();
            config.runtime = stub_runtime("OpenSSL 1.0.2h  3 May 2016");

            // version A's cached install reports the wrong banner,
            // version B's is healthy
            let bad = VersionSpec::new(Family::Openssl, "1.1.0");
            let good = VersionSpec::new(Family::Openssl, "1.0.2h");
            install_fake_binary(temp.path(), &config, &bad, "OpenSSL 9.9.9");
            install_fake_binary(temp.path(), &config, &good, "OpenSSL 1.0.2h  3 May 2016");

            let pipeline = Pipeline::new(
                &config,
                temp.path().to_path_buf(),
                temp.path().to_path_buf(),
                false,
            );
            let report = pipeline
                .run(vec![bad, good], &[])
                .await
                .unwrap();

            assert_eq!(report.results.len(), 2);
            let a = &report.results[0];
            assert!(!a.ok);
            assert_eq!(a.failed_stage.as_deref(), Some("verify"));

            // B still reached its own terminal state
            let b = &report.results[1];
            assert!(b.ok);
            assert_eq!(b.stage, Stage::Tested);
            assert_eq!(b.summary.as_deref(), Some("OpenSSL 1.0.2h  3 May 2016"));
            assert!(report.any_failed());
        }

        #[tokio::test]
        async fn cached_install_skips_fetch_and_build() {
            let temp = TempDir::new().unwrap();
            let mut config = Config::default();
            config.runtime = stub_runtime("OpenSSL 1.0.2h  3 May 2016");
            // a fetch attempt would fail against this URL; success
            // proves the cache was trusted
            config.families.openssl.url_template =
                "http://127.0.0.1:1/openssl-{version}.tar.gz".into();

            let spec = VersionSpec::new(Family::Openssl, "1.0.2h");
            install_fake_binary(temp.path(), &config, &spec, "OpenSSL 1.0.2h  3 May 2016");

            let pipeline = Pipeline::new(
                &config,
                temp.path().to_path_buf(),
                temp.path().to_path_buf(),
                false,
            );
            let report = pipeline.run(vec![spec], &[]).await.unwrap();

            let r = &report.results[0];
            assert!(r.ok);
            assert!(r.cache_hit);
            assert_eq!(r.stage, Stage::Tested);
        }

        #[tokio::test]
        async fn build_only_stops_after_verify() {
            let temp = TempDir::new().unwrap();
            let mut config = Config::default();
            // test phase commands would all fail; build-only must not
            // reach them
            config.runtime = RuntimeConfig {
                build: vec!["false".into()],
                import_check: vec!["false".into()],
                version_probe: vec!["false".into()],
                test: vec!["false".into()],
                module_files: vec![],
                ..RuntimeConfig::default()
            };

            let spec = VersionSpec::new(Family::Openssl, "1.0.2h");
            install_fake_binary(temp.path(), &config, &spec, "OpenSSL 1.0.2h  3 May 2016");

            let pipeline = Pipeline::new(
                &config,
                temp.path().to_path_buf(),
                temp.path().to_path_buf(),
                true,
            );
            let report = pipeline.run(vec![spec], &[]).await.unwrap();

            let r = &report.results[0];
            assert!(r.ok);
            assert_eq!(r.stage, Stage::Verified);
        }

        #[tokio::test]
        async fn empty_batch_is_an_error() {
            let temp = TempDir::new().unwrap();
            let config = Config::default();
            let pipeline = Pipeline::new(
                &config,
                temp.path().to_path_buf(),
                temp.path().to_path_buf(),
                false,
            );
            let err = pipeline.run(vec![], &[]).await.unwrap_err();
            assert!(matches!(err, MultisslError::NoVersions));
        }
    }
}
