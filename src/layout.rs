//! Deterministic cache layout
//!
//! Every path the pipeline touches for one library version is derived
//! here, up front, from the cache root and the family's naming
//! templates. Nothing else in the crate builds paths by hand, which is
//! what keeps two versions of the same family from ever colliding.

use crate::config::{Family, FamilyConfig};
use std::path::{Path, PathBuf};

/// One buildable unit: a library family at an exact version.
/// Immutable once constructed.
#[derive(Debug, Clone)]
pub struct VersionSpec {
    pub family: Family,
    pub version: String,
    /// Extra arguments appended to the configure step
    pub extra_args: Vec<String>,
    /// Overrides the default `<root>/<family>` install root
    pub install_root: Option<PathBuf>,
}

impl VersionSpec {
    pub fn new(family: Family, version: impl Into<String>) -> Self {
        Self {
            family,
            version: version.into(),
            extra_args: Vec::new(),
            install_root: None,
        }
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_install_root(mut self, root: Option<PathBuf>) -> Self {
        self.install_root = root;
        self
    }

    /// Display label, e.g. `openssl-1.0.2h`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.family, self.version)
    }
}

/// All on-disk locations for one [`VersionSpec`]: a pure function of
/// (root, family config, spec) with no lifecycle of its own.
#[derive(Debug, Clone)]
pub struct CacheLayout {
    url: String,
    archive_path: PathBuf,
    build_dir: PathBuf,
    source_dir_name: String,
    install_dir: PathBuf,
    binary: String,
}

impl CacheLayout {
    pub fn new(root: &Path, family: &FamilyConfig, spec: &VersionSpec) -> Self {
        let src_root = root.join("src");
        let source_dir_name = FamilyConfig::expand(&family.dir_template, &spec.version);
        let install_root = spec
            .install_root
            .clone()
            .unwrap_or_else(|| root.join(spec.family.as_str()));

        Self {
            url: FamilyConfig::expand(&family.url_template, &spec.version),
            archive_path: src_root.join(FamilyConfig::expand(&family.archive_template, &spec.version)),
            build_dir: src_root.join(&source_dir_name),
            source_dir_name,
            install_dir: install_root.join(&spec.version),
            binary: family.binary.clone(),
        }
    }

    /// Download URL for the source archive.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Cached archive file: `<root>/src/<family>-<version>.tar.gz`.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Ephemeral build directory, removed after a successful install.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Expected top-level directory inside the archive.
    pub fn source_dir_name(&self) -> &str {
        &self.source_dir_name
    }

    /// Install prefix: `<root>/<family>/<version>/`.
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn include_dir(&self) -> PathBuf {
        self.install_dir.join("include")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.install_dir.join("lib")
    }

    /// Installed CLI binary, e.g. `<prefix>/bin/openssl`. Its presence
    /// is the sole "already built" signal.
    pub fn bin_path(&self) -> PathBuf {
        self.install_dir.join("bin").join(&self.binary)
    }

    pub fn is_installed(&self) -> bool {
        self.bin_path().is_file()
    }

    pub fn has_source(&self) -> bool {
        self.archive_path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn layout_for(version: &str) -> CacheLayout {
        let config = Config::default();
        let spec = VersionSpec::new(Family::Openssl, version);
        CacheLayout::new(Path::new("/cache"), config.family(Family::Openssl), &spec)
    }

    #[test]
    fn paths_are_version_scoped() {
        let layout = layout_for("1.0.2");
        assert_eq!(
            layout.archive_path(),
            Path::new("/cache/src/openssl-1.0.2.tar.gz")
        );
        assert_eq!(layout.build_dir(), Path::new("/cache/src/openssl-1.0.2"));
        assert_eq!(layout.install_dir(), Path::new("/cache/openssl/1.0.2"));
        assert_eq!(layout.bin_path(), Path::new("/cache/openssl/1.0.2/bin/openssl"));
        assert_eq!(layout.url(), "https://www.openssl.org/source/openssl-1.0.2.tar.gz");
    }

    #[test]
    fn two_versions_never_collide() {
        let a = layout_for("1.0.2");
        let b = layout_for("1.1.0");
        assert_ne!(a.archive_path(), b.archive_path());
        assert_ne!(a.build_dir(), b.build_dir());
        assert_ne!(a.install_dir(), b.install_dir());
        assert_ne!(a.include_dir(), b.include_dir());
        assert_ne!(a.lib_dir(), b.lib_dir());
        assert_ne!(a.bin_path(), b.bin_path());
    }

    #[test]
    fn families_have_separate_roots() {
        let config = Config::default();
        let spec = VersionSpec::new(Family::Libressl, "2.4.2");
        let layout = CacheLayout::new(Path::new("/cache"), config.family(Family::Libressl), &spec);
        assert_eq!(layout.install_dir(), Path::new("/cache/libressl/2.4.2"));
        assert_eq!(layout.source_dir_name(), "libressl-2.4.2");
    }

    #[test]
    fn install_root_override() {
        let config = Config::default();
        let spec = VersionSpec::new(Family::Openssl, "1.1.0")
            .with_install_root(Some(PathBuf::from("/opt/ssl")));
        let layout = CacheLayout::new(Path::new("/cache"), config.family(Family::Openssl), &spec);
        assert_eq!(layout.install_dir(), Path::new("/opt/ssl/1.1.0"));
        // archives and build trees stay under the shared cache root
        assert_eq!(layout.build_dir(), Path::new("/cache/src/openssl-1.1.0"));
    }
}
