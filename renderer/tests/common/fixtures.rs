//! Fake worker processes and renderer doubles
//!
//! The fake workers are small shell scripts speaking the line protocol.
//! Every script appends its PID to a log file on startup, so tests can
//! observe process starts and restarts from the outside.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::TempDir;

use renderer::config::{LifetimeConfig, ProcessConfig, TimeoutConfig};
use renderer::traits::Renderer;
use renderer::types::{RenderRequest, RenderResponse, RenderStatus};

/// Replies success with a tiny payload to every request; exits on `exit`.
pub const ECHO_WORKER: &str = r#"while IFS= read -r line; do
  if [ "$line" = "exit" ]; then
    exit 0
  fi
  printf '%s\n' '{"status":"success","loadTime":12,"paintTime":3,"base64":"aGVsbG8=","format":"PNG"}'
done"#;

/// Emits a line that is not JSON for every request.
pub const GARBAGE_WORKER: &str = r#"while IFS= read -r line; do
  if [ "$line" = "exit" ]; then
    exit 0
  fi
  echo 'this is not valid json'
done"#;

/// Accepts requests but never replies.
pub const SLEEPY_WORKER: &str = r#"while IFS= read -r line; do
  if [ "$line" = "exit" ]; then
    exit 0
  fi
  sleep 3600
done"#;

/// Writes a diagnostic line to stderr before replying without an error
/// field.
pub const STDERR_WORKER: &str = r#"while IFS= read -r line; do
  if [ "$line" = "exit" ]; then
    exit 0
  fi
  echo 'console noise from the worker' >&2
  sleep 0.1
  printf '%s\n' '{"status":"success","loadTime":5,"base64":"aGVsbG8=","format":"PNG"}'
done"#;

pub struct FakeWorker {
    // holds the scripts on disk for the duration of the test
    _dir: TempDir,
    pub script: PathBuf,
    pub pid_log: PathBuf,
}

impl FakeWorker {
    /// Write `body` as an executable worker script.
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let pid_log = dir.path().join("pids.log");
        let script = dir.path().join("worker.sh");

        let contents = format!(
            "#!/bin/sh\necho $$ >> \"{}\"\n{}\n",
            pid_log.display(),
            body
        );
        fs::write(&script, contents).expect("write worker script");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(&script).expect("script metadata").permissions();
            permissions.set_mode(0o755);
            fs::set_permissions(&script, permissions).expect("chmod worker script");
        }

        Self {
            _dir: dir,
            script,
            pid_log,
        }
    }

    /// Remove the execute bit so spawning fails.
    pub fn make_unexecutable(&self) {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut permissions = fs::metadata(&self.script)
                .expect("script metadata")
                .permissions();
            permissions.set_mode(0o644);
            fs::set_permissions(&self.script, permissions).expect("chmod worker script");
        }
    }

    /// PIDs of every worker instance started so far, in start order.
    pub fn spawned_pids(&self) -> Vec<u32> {
        match fs::read_to_string(&self.pid_log) {
            Ok(contents) => contents
                .lines()
                .filter_map(|line| line.trim().parse().ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Session configuration pointing at this worker, with short phase
    /// deadlines so timeout tests stay fast.
    pub fn config(&self) -> ProcessConfig {
        ProcessConfig {
            executable: self.script.clone(),
            timeouts: TimeoutConfig {
                initial_page_load: 0.5,
                page_load: 0.2,
                render_response: 0.3,
                initial_render_response: 0.5,
                process_startup: 5.0,
            },
            ..Default::default()
        }
    }
}

/// Call counters observable after the renderer has been handed to a
/// supervisor.
#[derive(Clone, Default)]
pub struct CallCounts {
    renders: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl CallCounts {
    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// Renderer double that records calls and always succeeds.
pub struct RecordingRenderer {
    config: LifetimeConfig,
    counts: CallCounts,
}

impl RecordingRenderer {
    pub fn new(config: LifetimeConfig) -> (Self, CallCounts) {
        let counts = CallCounts::default();
        (
            Self {
                config,
                counts: counts.clone(),
            },
            counts,
        )
    }
}

#[async_trait::async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, request: &RenderRequest) -> RenderResponse {
        self.counts.renders.fetch_add(1, Ordering::SeqCst);
        RenderResponse {
            url: request.url.clone(),
            status: RenderStatus::Success,
            load_time_ms: Some(1),
            paint_time_ms: Some(1),
            image: Some(b"recorded".to_vec()),
            format: request.format,
            error: None,
        }
    }

    async fn shutdown(&self, _timeout: Option<std::time::Duration>) {
        self.counts.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn lifetime_config(&self) -> LifetimeConfig {
        self.config
    }
}
