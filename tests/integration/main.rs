//! Integration tests for cvmfs-volume

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn cvmfs_volume() -> Command {
        let mut cmd = cargo_bin_cmd!("cvmfs-volume");
        cmd.env_remove("CVMFS_VOLUME_CONFIG").env_remove("RUST_LOG");
        cmd
    }

    /// Config pointing every path into `root`
    fn write_config(root: &Path) -> std::path::PathBuf {
        let path = root.join("config.toml");
        let content = format!(
            "[mount]\nmountpoint = \"{}\"\n\n[plugin]\nsocket = \"{}\"\nstate_file = \"{}\"\n",
            root.join("cvmfs").display(),
            root.join("cvmfs.sock").display(),
            root.join("docker.cache").display(),
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        cvmfs_volume()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("CernVM-FS"));
    }

    #[test]
    fn version_displays() {
        cvmfs_volume()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cvmfs-volume"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_applies_overrides() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .args(["--mountpoint", "/mnt/cvmfs", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[mount]"))
            .stdout(predicate::str::contains("/mnt/cvmfs"));
    }

    #[test]
    fn missing_explicit_config() {
        let dir = TempDir::new().unwrap();

        cvmfs_volume()
            .arg("--config")
            .arg(dir.path().join("absent.toml"))
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"));
    }

    #[test]
    fn init_reports_success() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"status":"Success"}"#));
    }

    #[test]
    fn attach_without_repository() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .arg("attach")
            .assert()
            .failure()
            .stdout(predicate::str::contains(
                r#"{"status":"Failure","message":"no repository given"}"#,
            ));
    }

    #[test]
    fn attach_with_malformed_options() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .args(["attach", "not-json"])
            .assert()
            .failure()
            .stdout(predicate::str::contains(r#""status":"Failure""#));
    }

    #[test]
    fn detach_without_volume() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .arg("detach")
            .assert()
            .failure()
            .stdout(predicate::str::contains("no repository given"));
    }

    #[test]
    fn unmount_without_directory() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .arg("unmount")
            .assert()
            .failure()
            .stdout(predicate::str::contains("no repository given"));
    }

    #[test]
    fn list_empty() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn list_reads_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        std::fs::write(
            dir.path().join("docker.cache"),
            r#"{"alice.cern.ch@trunk":{"path":"/cvmfs/alice.cern.ch/trunk","referenceCount":2}}"#,
        )
        .unwrap();

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("alice.cern.ch@trunk"));

        cvmfs_volume()
            .arg("--config")
            .arg(&config)
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""referenceCount": 2"#));
    }
}

mod driver_tests {
    use cvmfs_volume::config::MountConfig;
    use cvmfs_volume::controller::RepoController;
    use cvmfs_volume::driver::VolumeDriver;
    use cvmfs_volume::mount::RecordingMounter;
    use cvmfs_volume::registry::VolumeRegistry;
    use cvmfs_volume::VolumeError;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn settings(root: &Path) -> MountConfig {
        let base = root.join("default.conf");
        std::fs::write(&base, "CVMFS_HTTP_PROXY=DIRECT\n").unwrap();
        MountConfig {
            mountpoint: root.join("cvmfs"),
            config_dir: root.join("etc"),
            cache_root: root.join("cache"),
            base_configs: vec![base],
            service_uid: None,
        }
    }

    async fn driver(root: &Path, mounter: Arc<RecordingMounter>) -> VolumeDriver {
        VolumeDriver::new(
            RepoController::new(&settings(root), mounter),
            VolumeRegistry::open(root.join("docker.cache")).await,
        )
    }

    #[tokio::test]
    async fn pinned_hash_config_is_generated() {
        let dir = TempDir::new().unwrap();
        let driver = driver(dir.path(), Arc::new(RecordingMounter::new())).await;

        driver.mount("alice.cern.ch#abcd1234").await.unwrap();

        let config =
            std::fs::read_to_string(dir.path().join("etc/alice.cern.ch-abcd1234")).unwrap();
        assert!(config.starts_with("CVMFS_HTTP_PROXY=DIRECT\n"));
        assert!(config.contains("CVMFS_ROOT_HASH=abcd1234"));
        assert!(config.contains("CVMFS_AUTO_UPDATE=no"));
        assert!(dir.path().join("cache/alice.cern.ch/abcd1234/shared").is_dir());
    }

    #[tokio::test]
    async fn registry_survives_restart() {
        let dir = TempDir::new().unwrap();
        let mounter = Arc::new(RecordingMounter::new());

        {
            let driver = driver(dir.path(), mounter.clone()).await;
            driver.mount("cms.cern.ch@prod").await.unwrap();
            driver.mount("cms.cern.ch@prod").await.unwrap();
            driver.unmount("cms.cern.ch@prod").await.unwrap();
        }

        let driver = driver(dir.path(), mounter.clone()).await;
        let record = driver.get("cms.cern.ch@prod").await.unwrap();
        assert_eq!(record.reference_count, 1);
        assert_eq!(record.path, dir.path().join("cvmfs/cms.cern.ch/prod"));

        // still mounted from before the restart, so no second mount
        driver.mount("cms.cern.ch@prod").await.unwrap();
        assert_eq!(mounter.mount_calls(), 1);
    }

    #[tokio::test]
    async fn remove_then_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let driver = driver(dir.path(), Arc::new(RecordingMounter::new())).await;

        driver.mount("atlas.cern.ch").await.unwrap();
        driver.remove("atlas.cern.ch@trunk").await.unwrap();

        assert!(matches!(
            driver.path("atlas.cern.ch").await,
            Err(VolumeError::VolumeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn many_volumes_share_one_mount() {
        let dir = TempDir::new().unwrap();
        let mounter = Arc::new(RecordingMounter::new());
        let driver = Arc::new(driver(dir.path(), mounter.clone()).await);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let driver = driver.clone();
                tokio::spawn(async move { driver.mount("lhcb.cern.ch").await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(mounter.mount_calls(), 1);
        assert_eq!(
            driver.get("lhcb.cern.ch").await.unwrap().reference_count,
            16
        );
    }
}
