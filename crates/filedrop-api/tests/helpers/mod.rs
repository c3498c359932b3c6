//! Test helpers: build the application over a temporary storage root.
//!
//! Run from workspace root: `cargo test -p filedrop-api`.

pub mod fixtures;

use axum_test::TestServer;
use filedrop_api::setup::build_app;
use filedrop_api::AppState;
use filedrop_core::{Config, FileServiceConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub upload_dir: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Names of the regular files in the storage root, sorted.
    pub fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .expect("read upload dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Wait for every scheduled post-processing task to finish.
    pub async fn drain_post_processing(&self) {
        self.state.drain_post_processing().await;
    }
}

/// Setup test app with default limits and an isolated storage root.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app, letting the caller adjust the configuration first.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut FileServiceConfig)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let upload_dir = temp_dir.path().join("uploads");

    let mut service = FileServiceConfig {
        upload_dir: upload_dir.clone(),
        ..FileServiceConfig::default()
    };
    service.base.static_dir = None;
    customize(&mut service);

    let (state, router) = build_app(Config::new(service))
        .await
        .expect("Failed to build app");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        upload_dir,
        _temp_dir: temp_dir,
    }
}
