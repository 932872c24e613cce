//! List command - show what the cache already holds

use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::{Config, Family};
use crate::error::{MultisslError, MultisslResult};
use console::style;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use tokio::fs;

/// One install prefix found under the cache root.
#[derive(Debug, Serialize)]
struct InstallEntry {
    family: String,
    version: String,
    /// True when the prefix holds a runnable library binary, i.e. a
    /// run would cache-skip this version
    complete: bool,
}

#[derive(Debug, Serialize)]
struct CacheListing {
    archives: Vec<String>,
    installs: Vec<InstallEntry>,
}

/// Execute the list command
pub async fn execute(args: ListArgs, config: &Config, base_dir: &Path) -> MultisslResult<ExitCode> {
    let root = config
        .cache
        .root
        .clone()
        .unwrap_or_else(|| base_dir.to_path_buf());

    let listing = scan(config, &root).await?;

    match args.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Plain => {
            for archive in &listing.archives {
                println!("archive {archive}");
            }
            for install in &listing.installs {
                let state = if install.complete { "complete" } else { "partial" };
                println!("install {}-{} {}", install.family, install.version, state);
            }
        }
        OutputFormat::Table => {
            if listing.archives.is_empty() && listing.installs.is_empty() {
                println!("Cache at {} is empty", root.display());
                return Ok(ExitCode::SUCCESS);
            }
            println!("Cache root: {}", root.display());
            if !listing.archives.is_empty() {
                println!("\nCached archives:");
                for archive in &listing.archives {
                    println!("  {archive}");
                }
            }
            if !listing.installs.is_empty() {
                println!("\nInstallations:");
                for install in &listing.installs {
                    let marker = if install.complete {
                        style("[OK]").green()
                    } else {
                        style("[PARTIAL]").yellow()
                    };
                    println!("  {} {}-{}", marker, install.family, install.version);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn scan(config: &Config, root: &Path) -> MultisslResult<CacheListing> {
    let mut archives = Vec::new();
    let src_dir = root.join("src");
    if src_dir.is_dir() {
        let mut entries = fs::read_dir(&src_dir)
            .await
            .map_err(|e| MultisslError::io(format!("reading {}", src_dir.display()), e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MultisslError::io("reading cache entry", e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".tar.gz") {
                archives.push(name);
            }
        }
    }
    archives.sort();

    let mut installs = Vec::new();
    for family in Family::ALL {
        let family_dir = root.join(family.as_str());
        if !family_dir.is_dir() {
            continue;
        }
        let binary = &config.family(family).binary;
        let mut entries = fs::read_dir(&family_dir)
            .await
            .map_err(|e| MultisslError::io(format!("reading {}", family_dir.display()), e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MultisslError::io("reading install entry", e))?
        {
            if !entry.path().is_dir() {
                continue;
            }
            let version = entry.file_name().to_string_lossy().into_owned();
            let complete = entry.path().join("bin").join(binary).is_file();
            installs.push(InstallEntry {
                family: family.to_string(),
                version,
                complete,
            });
        }
    }
    installs.sort_by(|a, b| (&a.family, &a.version).cmp(&(&b.family, &b.version)));

    Ok(CacheListing { archives, installs })
}
