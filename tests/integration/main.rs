//! Integration tests for the multissl CLI

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    /// A multissl command sandboxed into a temp directory so tests never
    /// touch the user's real config or cache.
    fn multissl(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("multissl");
        cmd.env("MULTISSL_CONFIG", temp.path().join("config.toml"))
            .env("MULTISSL_BASE_DIR", temp.path());
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        multissl(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("OpenSSL and LibreSSL"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        multissl(&temp)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("multissl"));
    }

    #[test]
    fn run_help_describes_passthrough() {
        let temp = TempDir::new().unwrap();
        multissl(&temp)
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--build-only"));
    }

    #[test]
    fn config_path_prints_location() {
        let temp = TempDir::new().unwrap();
        multissl(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_uses_defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        multissl(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[runtime]"))
            .stdout(predicate::str::contains("[families.openssl]"));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        multissl(&temp).args(["config", "init"]).assert().success();
        assert!(temp.path().join("config.toml").exists());

        // second init without --force refuses
        multissl(&temp)
            .args(["config", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn list_reports_empty_cache() {
        let temp = TempDir::new().unwrap();
        multissl(&temp)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("is empty"));
    }

    #[test]
    fn list_json_is_valid() {
        let temp = TempDir::new().unwrap();
        let output = multissl(&temp)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert!(parsed["archives"].is_array());
        assert!(parsed["installs"].is_array());
    }

    #[test]
    fn run_fails_fast_without_runtime() {
        // the default runtime command is ./python, which does not exist
        // in an empty base directory
        let temp = TempDir::new().unwrap();
        multissl(&temp)
            .args(["run", "--openssl", "1.0.2h"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn relative_base_dir_is_anchored_to_cwd() {
        // a relative base dir is resolved against the invocation cwd,
        // so the error names the real directory, not "."
        let temp = TempDir::new().unwrap();
        let resolved = temp.path().canonicalize().unwrap();
        let mut cmd = cargo_bin_cmd!("multissl");
        cmd.current_dir(&temp)
            .env("MULTISSL_CONFIG", temp.path().join("config.toml"))
            .env("MULTISSL_BASE_DIR", ".");
        cmd.args(["run", "--openssl", "1.0.2h"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found"))
            .stderr(predicate::str::contains(resolved.to_str().unwrap()));
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "runtime = \"nope\"").unwrap();
        multissl(&temp)
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }
}
