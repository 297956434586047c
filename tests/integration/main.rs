//! Integration tests for tuxcache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn tuxcache() -> Command {
        let mut cmd = cargo_bin_cmd!("tuxcache");
        for var in [
            "GITHUB_TOKEN",
            "GITHUB_WORKFLOW",
            "REPO_SCOPED_PAT",
            "MOCK",
            "GITHUB_ENV",
            "TUXCACHE_CONFIG",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Update invocation that fails before contacting GitHub
    fn offline_update(dir: &TempDir) -> Command {
        let mut cmd = tuxcache();
        cmd.current_dir(dir.path())
            .env("GITHUB_WORKFLOW", "mainline (clang-19)")
            .env("REPO_SCOPED_PAT", "not-a-real-token")
            .args(["--config", "absent.toml", "update"]);
        cmd
    }

    #[test]
    fn help_displays() {
        tuxcache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Build-result cache"));
    }

    #[test]
    fn version_displays() {
        tuxcache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tuxcache"));
    }

    #[test]
    fn key_maps_workflow_name() {
        tuxcache()
            .args(["key", "Foo Bar (clang-19)"])
            .assert()
            .success()
            .stdout("_FOOBARCLANG19\n");
    }

    #[test]
    fn check_without_token_fails() {
        tuxcache()
            .args(["check", "-w", "mainline (clang-19)", "-o", "x", "-r", "master"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--github-token"));
    }

    #[test]
    fn update_requires_workflow_name() {
        tuxcache()
            .env("REPO_SCOPED_PAT", "x")
            .arg("update")
            .assert()
            .failure()
            .stderr(predicate::str::contains("--workflow-name"));
    }

    #[test]
    fn update_missing_builds_file_fails() {
        let dir = TempDir::new().unwrap();
        offline_update(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unable to find builds.json"));
    }

    #[test]
    fn update_reads_mock_file_in_mock_mode() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("builds.json"), "{}").unwrap();
        offline_update(&dir)
            .env("MOCK", "1")
            .assert()
            .failure()
            .stderr(predicate::str::contains("mock.builds.json"));
    }

    #[test]
    fn any_mock_value_enables_mock_mode() {
        for value in ["0", ""] {
            let dir = TempDir::new().unwrap();
            std::fs::write(dir.path().join("builds.json"), "{}").unwrap();
            offline_update(&dir)
                .env("MOCK", value)
                .assert()
                .failure()
                .stderr(predicate::str::contains("mock.builds.json"));
        }
    }

    #[test]
    fn update_empty_builds_file_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("builds.json"), "").unwrap();
        offline_update(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("zero sized"));
    }

    #[test]
    fn update_empty_batch_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("builds.json"), r#"{"builds": {}}"#).unwrap();
        offline_update(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("No builds present"));
    }

    #[test]
    fn update_without_metadata_fails() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("builds.json"),
            r#"{"builds": {"a": {"tuxbuild_status": "complete", "build_status": "pass"}}}"#,
        )
        .unwrap();
        offline_update(&dir)
            .assert()
            .failure()
            .stderr(predicate::str::contains("suitable git sha"));
    }

    #[test]
    fn config_path() {
        tuxcache()
            .args(["--config", "/tmp/tuxcache-test/config.toml", "config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        tuxcache()
            .current_dir(dir.path())
            .args(["--config", "absent.toml", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[github]"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.toml"), "[github\n").unwrap();
        tuxcache()
            .current_dir(dir.path())
            .args(["--config", "bad.toml", "config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn unusable_config_value_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cfg.toml"), "[general]\nlog_format = \"yaml\"\n").unwrap();
        tuxcache()
            .current_dir(dir.path())
            .args(["--config", "cfg.toml", "config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("log_format"));
    }
}
