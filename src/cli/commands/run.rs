//! Run command - drive the build-and-test batch

use crate::cli::args::{OutputFormat, RunArgs};
use crate::config::{Config, Family, RuntimeConfig};
use crate::error::{MultisslError, MultisslResult};
use crate::layout::VersionSpec;
use crate::pipeline::{BatchReport, Pipeline};
use crate::proc::resolve_program;
use console::style;
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;

/// Execute the run command. The process exit status reflects whether
/// any version failed.
pub async fn execute(
    args: RunArgs,
    config: &Config,
    base_dir: &Path,
    config_path: &Path,
) -> MultisslResult<ExitCode> {
    check_runtime(&config.runtime, base_dir, config_path)?;

    let specs = select_specs(&args, config);
    debug!("Selected {} version(s)", specs.len());

    // A relative cache root means relative build dirs, which would not
    // survive the chdir into them.
    let cache_root = match &config.cache.root {
        Some(root) => std::path::absolute(root)
            .map_err(|e| MultisslError::io(format!("resolving cache root {}", root.display()), e))?,
        None => base_dir.to_path_buf(),
    };

    let test_args = if args.test_args.is_empty() {
        config.runtime.default_test_args.clone()
    } else {
        args.test_args.clone()
    };

    let pipeline = Pipeline::new(
        config,
        base_dir.to_path_buf(),
        cache_root,
        args.build_only,
    );
    let report = pipeline.run(specs, &test_args).await?;

    print_report(&report, args.format)?;

    if report.any_failed() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Turn the CLI selection (or the configured defaults) into specs, in
/// declaration order: all OpenSSL versions first, then LibreSSL.
fn select_specs(args: &RunArgs, config: &Config) -> Vec<VersionSpec> {
    let mut specs = Vec::new();
    for family in Family::ALL {
        let family_cfg = config.family(family);
        let selected = match family {
            Family::Openssl => &args.openssl,
            Family::Libressl => &args.libressl,
        };
        let versions = if selected.is_empty() && args.openssl.is_empty() && args.libressl.is_empty()
        {
            // nothing selected at all: fall back to the configured lists
            &family_cfg.versions
        } else {
            selected
        };
        for version in versions {
            specs.push(
                VersionSpec::new(family, version.clone())
                    .with_extra_args(family_cfg.extra_args_for(version))
                    .with_install_root(args.install_root.clone()),
            );
        }
    }
    specs
}

/// The runtime collaborators are opaque commands, but an obviously
/// missing runtime deserves a clear error before hours of builds.
fn check_runtime(
    runtime: &RuntimeConfig,
    base_dir: &Path,
    config_path: &Path,
) -> MultisslResult<()> {
    for (name, argv) in [
        ("runtime.build", &runtime.build),
        ("runtime.import_check", &runtime.import_check),
        ("runtime.version_probe", &runtime.version_probe),
        ("runtime.test", &runtime.test),
    ] {
        if argv.is_empty() {
            return Err(MultisslError::ConfigInvalid {
                path: config_path.to_path_buf(),
                reason: format!("{name} must not be empty"),
            });
        }
    }

    let program = &runtime.build[0];
    let resolved = resolve_program(program, base_dir);
    // bare names like "make" are left to PATH lookup
    if program.contains('/') && !resolved.exists() {
        return Err(MultisslError::RuntimeNotFound {
            command: program.clone(),
            base_dir: base_dir.to_path_buf(),
        });
    }
    Ok(())
}

fn print_report(report: &BatchReport, format: OutputFormat) -> MultisslResult<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Plain => {
            for r in &report.results {
                let outcome = if r.ok { "ok" } else { "failed" };
                println!("{} {}", r.label(), outcome);
            }
        }
        OutputFormat::Table => {
            println!();
            for r in &report.results {
                let label = format!("{:<18}", r.label());
                if r.ok {
                    let mut detail = r.summary.clone().unwrap_or_default();
                    if r.cache_hit {
                        detail.push_str(" (cached install)");
                    }
                    println!("  {} {} {}", style("[OK]").green(), label, detail.trim());
                } else {
                    let stage = r.failed_stage.as_deref().unwrap_or("unknown");
                    let error = r.error.as_deref().unwrap_or("");
                    println!(
                        "  {} {} {}: {}",
                        style("[FAIL]").red(),
                        label,
                        style(stage).yellow(),
                        error
                    );
                }
            }
            println!();
            let verdict = format!(
                "{} version(s): {} passed, {} failed in {:.1}s",
                report.results.len(),
                report.passed(),
                report.failed(),
                report.elapsed_secs
            );
            if report.any_failed() {
                println!("{}", style(verdict).red().bold());
            } else {
                println!("{}", style(verdict).green().bold());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run_args(argv: &[&str]) -> RunArgs {
        let mut full = vec!["run"];
        full.extend_from_slice(argv);
        RunArgs::parse_from(full)
    }

    #[test]
    fn defaults_select_both_configured_families() {
        let config = Config::default();
        let specs = select_specs(&run_args(&[]), &config);
        let openssl = specs.iter().filter(|s| s.family == Family::Openssl).count();
        let libressl = specs.iter().filter(|s| s.family == Family::Libressl).count();
        assert_eq!(openssl, config.families.openssl.versions.len());
        assert_eq!(libressl, config.families.libressl.versions.len());
        // openssl versions come first
        assert_eq!(specs[0].family, Family::Openssl);
    }

    #[test]
    fn explicit_selection_disables_other_family_defaults() {
        let config = Config::default();
        let specs = select_specs(&run_args(&["--openssl", "1.1.0"]), &config);
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].version, "1.1.0");
    }

    #[test]
    fn extra_args_come_from_family_config() {
        let config = Config::default();
        let specs = select_specs(&run_args(&["--openssl", "0.9.8l"]), &config);
        assert_eq!(specs[0].extra_args, vec!["no-asm"]);
    }

    #[test]
    fn missing_relative_runtime_is_rejected() {
        let runtime = RuntimeConfig::default();
        let temp = tempfile::TempDir::new().unwrap();
        let err = check_runtime(&runtime, temp.path(), Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, MultisslError::RuntimeNotFound { .. }));
    }

    #[test]
    fn empty_runtime_command_is_invalid() {
        let mut runtime = RuntimeConfig::default();
        runtime.test = vec![];
        let temp = tempfile::TempDir::new().unwrap();
        let err = check_runtime(&runtime, temp.path(), Path::new("config.toml")).unwrap_err();
        assert!(matches!(err, MultisslError::ConfigInvalid { .. }));
    }

    #[test]
    fn bare_program_names_skip_existence_check() {
        let mut runtime = RuntimeConfig::default();
        runtime.build = vec!["make".to_string()];
        let temp = tempfile::TempDir::new().unwrap();
        check_runtime(&runtime, temp.path(), Path::new("config.toml")).unwrap();
    }
}
