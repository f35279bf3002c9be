#![allow(dead_code)]

use cmdgen_cli::auth::BrowserLauncher;
use cmdgen_cli::cli::App;
use cmdgen_cli::config::ConfigPaths;
use cmdgen_cli::constants;
use cmdgen_cli::engine::context::InputStream;
use cmdgen_cli::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Initialize the rustls crypto provider before any tests run.
/// This runs once per test binary when `test_helpers` is included.
#[ctor::ctor]
fn init_crypto_provider() {
    cmdgen_cli::engine::http::install_crypto_provider();
}

mockall::mock! {
    pub Browser {}

    impl BrowserLauncher for Browser {
        fn open(&self, url: &str) -> std::io::Result<()>;
    }
}

/// Bucket operations as the service describes them, without the plugin
/// commands that replace them.
pub const ORCHESTRATOR_DEFINITION: &str = r"openapi: 3.0.1
info:
  title: Orchestrator
  version: '1.0'
servers:
  - url: https://cloud.example.com/{organization}/{tenant}/orchestrator_
paths:
  /odata/Buckets({key}):
    get:
      tags:
        - Buckets
      summary: Gets a single bucket
      operationId: Buckets_GetById
      parameters:
        - name: key
          in: path
          required: true
          schema:
            type: integer
        - name: X-UIPATH-OrganizationUnitId
          in: header
          required: true
          schema:
            type: integer
        - name: expand
          in: query
          schema:
            type: string
      responses:
        '200':
          description: Success
  /odata/Buckets:
    post:
      tags:
        - Buckets
      summary: Creates a bucket
      operationId: Buckets_Post
      requestBody:
        content:
          application/json:
            schema:
              type: object
              required:
                - Name
              properties:
                Name:
                  type: string
                Tags:
                  type: array
                  items:
                    type: string
      responses:
        '201':
          description: Created
  /odata/Buckets/internal:
    get:
      tags:
        - Buckets
      operationId: Buckets_Internal
      responses:
        '200':
          description: Success
";

/// A configuration directory with definitions and profiles
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let env = Self {
            dir: TempDir::new().unwrap(),
        };
        std::fs::create_dir_all(env.definitions()).unwrap();
        env
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn definitions(&self) -> PathBuf {
        self.path().join(constants::DEFINITIONS_DIR)
    }

    pub fn cache(&self) -> PathBuf {
        self.path().join(constants::AUTH_CACHE_DIR)
    }

    pub fn with_definition(self, name: &str, content: &str) -> Self {
        std::fs::write(self.definitions().join(format!("{name}.yaml")), content).unwrap();
        self
    }

    pub fn with_config(self, yaml: &str) -> Self {
        std::fs::write(self.path().join(constants::CONFIG_FILE_NAME), yaml).unwrap();
        self
    }

    pub fn with_plugins(self, yaml: &str) -> Self {
        std::fs::write(self.path().join(constants::PLUGINS_FILE_NAME), yaml).unwrap();
        self
    }

    /// A default profile pointing every definition at `uri`
    pub fn with_profile(self, uri: &str, extra: &str) -> Self {
        self.with_config(&format!(
            "profiles:\n- name: default\n  organization: my-org\n  tenant: my-tenant\n  uri: {uri}\n{extra}"
        ))
    }

    pub fn app(&self) -> App {
        self.app_with_browser(MockBrowser::new())
    }

    pub fn app_with_browser(&self, browser: MockBrowser) -> App {
        App::new(ConfigPaths::in_dir(self.path()), Arc::new(browser))
            .unwrap()
            .with_env(|_| None)
    }
}

/// Runs `args` in-process and returns the result and everything written
pub async fn run(app: &App, args: &[&str], input: Option<InputStream>) -> (Result<(), Error>, Vec<u8>) {
    let mut out = Vec::new();
    let result = app.run(args, input, &mut out).await;
    (result, out)
}

pub async fn run_text(app: &App, args: &[&str]) -> (Result<(), Error>, String) {
    let (result, out) = run(app, args, None).await;
    (result, String::from_utf8(out).unwrap())
}
