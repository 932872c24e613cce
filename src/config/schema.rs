//! Configuration schema for multissl
//!
//! Configuration is stored at `~/.config/multissl/config.toml`. Every
//! field has a built-in default matching the stock CPython setup, so an
//! empty (or missing) file is a fully working configuration.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// The TLS library families the pipeline knows how to build.
///
/// The two families differ only in data (URL and naming templates),
/// never in behavior, so each maps to a [`FamilyConfig`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Openssl,
    Libressl,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::Openssl, Family::Libressl];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Openssl => "openssl",
            Family::Libressl => "libressl",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache settings
    pub cache: CacheConfig,

    /// Runtime collaborator commands
    pub runtime: RuntimeConfig,

    /// Per-family build data
    pub families: FamiliesConfig,
}

impl Config {
    /// Look up the data record for a family.
    pub fn family(&self, family: Family) -> &FamilyConfig {
        match family {
            Family::Openssl => &self.families.openssl,
            Family::Libressl => &self.families.libressl,
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory for archives, build trees and install prefixes.
    /// Defaults to the runtime build directory passed on the CLI.
    pub root: Option<PathBuf>,
}

/// Commands used to drive the dependent runtime. All of them are opaque
/// collaborators: only their exit status is consulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Command that rebuilds the runtime's native extension modules
    pub build: Vec<String>,

    /// Command that imports the rebuilt native modules (smoke test)
    pub import_check: Vec<String>,

    /// Command that prints the library version the runtime linked against
    pub version_probe: Vec<String>,

    /// Test-suite command; selection args are appended
    pub test: Vec<String>,

    /// Test args used when none are given on the command line
    pub default_test_args: Vec<String>,

    /// Source files that reference the library API; touched before each
    /// rebuild so the incremental build recompiles them
    pub module_files: Vec<String>,

    /// Filename prefixes of the native-module build artifacts that must
    /// be purged so nothing stale gets relinked
    pub artifact_prefixes: Vec<String>,

    /// Runtime build output tree, relative to the base directory
    pub build_tree: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            build: vec!["./python".into(), "setup.py".into(), "build".into()],
            import_check: vec![
                "./python".into(),
                "-c".into(),
                "import _ssl; import _hashlib".into(),
            ],
            version_probe: vec![
                "./python".into(),
                "-c".into(),
                "import ssl; print(ssl.OPENSSL_VERSION)".into(),
            ],
            test: vec!["./python".into(), "-m".into(), "test".into()],
            default_test_args: vec![
                "-unetwork".into(),
                "-v".into(),
                "test_ssl".into(),
                "test_hashlib".into(),
            ],
            module_files: vec![
                "Modules/_ssl.c".into(),
                "Modules/socketmodule.c".into(),
                "Modules/_hashopenssl.c".into(),
            ],
            artifact_prefixes: vec!["_ssl".into(), "_hashlib".into()],
            build_tree: "build".into(),
        }
    }
}

/// Per-family configuration container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FamiliesConfig {
    pub openssl: FamilyConfig,
    pub libressl: FamilyConfig,
}

impl Default for FamiliesConfig {
    fn default() -> Self {
        Self {
            openssl: FamilyConfig::openssl(),
            libressl: FamilyConfig::libressl(),
        }
    }
}

/// Data record describing how to obtain and name one library family.
/// `{version}` in the templates is replaced with the version string.
///
/// A family section in the config file replaces the whole record;
/// field-level fallback would silently mix one family's defaults into
/// the other's override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    /// Download URL template
    pub url_template: String,

    /// Archive filename template
    pub archive_template: String,

    /// Top-level directory name inside the archive (also used for the
    /// ephemeral build directory)
    pub dir_template: String,

    /// Name of the installed CLI binary under the prefix's `bin/`
    pub binary: String,

    /// Versions built when none are selected on the command line
    pub versions: Vec<String>,

    /// Extra configure arguments for specific versions
    #[serde(default)]
    pub extra_args: HashMap<String, Vec<String>>,
}

impl FamilyConfig {
    pub fn openssl() -> Self {
        // Some ancient releases miscompile their assembler sources on
        // modern toolchains; build those without asm.
        let mut extra_args = HashMap::new();
        for version in ["0.9.8i", "0.9.8k", "0.9.8l"] {
            extra_args.insert(version.to_string(), vec!["no-asm".to_string()]);
        }
        Self {
            url_template: "https://www.openssl.org/source/openssl-{version}.tar.gz".into(),
            archive_template: "openssl-{version}.tar.gz".into(),
            dir_template: "openssl-{version}".into(),
            binary: "openssl".into(),
            versions: vec![
                "0.9.8zc".into(),
                "0.9.8zh".into(),
                "1.0.1t".into(),
                "1.0.2".into(),
                "1.0.2h".into(),
                "1.1.0".into(),
            ],
            extra_args,
        }
    }

    pub fn libressl() -> Self {
        Self {
            url_template: "https://ftp.openbsd.org/pub/OpenBSD/LibreSSL/libressl-{version}.tar.gz"
                .into(),
            archive_template: "libressl-{version}.tar.gz".into(),
            dir_template: "libressl-{version}".into(),
            binary: "openssl".into(),
            versions: vec!["2.3.0".into(), "2.4.2".into()],
            extra_args: HashMap::new(),
        }
    }

    /// Expand a `{version}` template.
    pub fn expand(template: &str, version: &str) -> String {
        template.replace("{version}", version)
    }

    /// Extra configure args declared for a version, if any.
    pub fn extra_args_for(&self, version: &str) -> Vec<String> {
        self.extra_args.get(version).cloned().unwrap_or_default()
    }
}
