//! Shared test harness for integration tests.
//!
//! [`TestHarness`] writes a config into a temp dir whose tool paths all point
//! at a stub executable that just sleeps, then builds a [`PipelineController`]
//! over it. Nothing binds a socket or needs the real encoder.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use ristbond::config::{Config, ConfigStore, DEFAULT_CONFIG};
use ristbond::pipeline::PipelineController;
use ristbond::server::{create_router, AppContext};
use ristbond_process::Supervisor;
use tempfile::TempDir;

const STUB_SCRIPT: &str = "#!/bin/sh\nexec sleep 600\n";

pub struct TestHarness {
    pub dir: TempDir,
    pub controller: Arc<PipelineController>,
}

impl TestHarness {
    /// Four enabled paths, relay on, per-path shape.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Start from the default document and let the test adjust it.
    pub fn with_config(edit: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let stub = write_stub(dir.path());

        let mut config = Config::from_yaml(DEFAULT_CONFIG).expect("default config parses");
        config.tools.ffmpeg_path = Some(stub.clone());
        config.tools.ristsender_path = Some(stub.clone());
        config.tools.mediamtx_path = Some(stub);
        config.mediamtx.config_path = dir.path().join("mediamtx.yml");
        config.logging.log_dir = dir.path().join("logs");
        config.supervisor.grace_secs = 1;
        edit(&mut config);

        let store = ConfigStore::new(dir.path().join("config.yml"));
        store.save(&config).expect("failed to save test config");

        let supervisor = Supervisor::new(&config.logging.log_dir)
            .with_grace(Duration::from_secs(config.supervisor.grace_secs));
        let controller = Arc::new(PipelineController::new(store, supervisor));

        Self { dir, controller }
    }

    pub fn router(&self) -> Router {
        create_router(AppContext::new(self.controller.clone()))
    }

    /// The config as currently persisted.
    pub fn stored(&self) -> Config {
        self.controller.store().load().expect("stored config loads")
    }

    pub fn stored_text(&self) -> String {
        self.controller.store().load_text().expect("stored config reads")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    pub fn log_text(&self, name: &str) -> String {
        std::fs::read_to_string(self.log_dir().join(format!("{name}.log"))).unwrap_or_default()
    }

    /// Every pid the supervisor has recorded in `name`'s log, oldest first.
    pub fn logged_pids(&self, name: &str) -> Vec<u32> {
        self.log_text(name)
            .lines()
            .filter_map(|line| line.strip_prefix("[PID] "))
            .filter_map(|pid| pid.trim().parse().ok())
            .collect()
    }
}

/// Whether `pid` still names a live process.
pub fn pid_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

fn write_stub(dir: &Path) -> PathBuf {
    let path = dir.join("stub-tool");
    std::fs::write(&path, STUB_SCRIPT).expect("failed to write stub");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod stub");
    path
}
