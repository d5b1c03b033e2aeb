//! Worker-process IPC session
//!
//! Owns at most one worker process at a time and speaks the line-oriented
//! JSON protocol with it over the process's standard streams. The session
//! starts the worker lazily on the first render call, bounds every phase of
//! the exchange with [`TimedCall`], and reacts to crashes, malformed output,
//! and timeouts. After any shutdown or crash the session is back in its
//! initial no-process state and the next render starts a fresh worker.

use std::io;
use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::config::{LifetimeConfig, ProcessConfig};
use crate::error::{RendererError, RendererResult};
use crate::protocol::{self, WorkerRequest, WorkerResponse, EXIT_SENTINEL};
use crate::timed::{TimedCall, TimedMutex};
use crate::traits::Renderer;
use crate::types::{RenderRequest, RenderResponse, RenderStatus};

/// Grace period between the exit sentinel and a forced kill.
const GRACEFUL_EXIT_WAIT: Duration = Duration::from_secs(1);

/// A live worker process and its protocol streams. Exclusively owned by one
/// session and touched only under the communication lock.
struct Worker {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: mpsc::UnboundedReceiver<String>,
    rendered: bool,
}

impl Worker {
    async fn launch(config: &ProcessConfig) -> RendererResult<Self> {
        let mut command = Command::new(&config.executable);
        command
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|error| {
            RendererError::startup(format!(
                "failed to launch {}: {error}",
                config.executable.display()
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RendererError::startup("worker stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RendererError::startup("worker stdout unavailable"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RendererError::startup("worker stderr unavailable"))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: spawn_stderr_drain(stderr),
            rendered: false,
        })
    }

    /// Write one request line and read one response line. Both directions
    /// share the caller's deadline; an EOF on stdout means the worker died.
    async fn exchange(&mut self, line: &str) -> io::Result<String> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;

        let mut response = String::new();
        let read = self.stdout.read_line(&mut response).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "worker closed its output stream",
            ));
        }
        Ok(response.trim_end().to_string())
    }

    /// Collect whatever diagnostics the worker has written to stderr so
    /// far, without blocking.
    fn drain_stderr(&mut self) -> Option<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.stderr.try_recv() {
            lines.push(line);
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Forward worker stderr into an unbounded channel so the pipe never fills
/// and the session can drain accumulated output opportunistically.
fn spawn_stderr_drain(stderr: ChildStderr) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

struct Session {
    worker: Option<Worker>,
}

/// Renderer backed by a local worker process.
pub struct ProcessRenderer {
    config: ProcessConfig,
    session: TimedMutex<Session>,

    /// PID of the live worker, readable without the communication lock.
    /// This is the handle the double-tap shutdown path uses when the lock
    /// cannot be acquired in time.
    worker_pid: Arc<StdMutex<Option<u32>>>,
}

impl ProcessRenderer {
    /// Validates the configuration and constructs the session in its
    /// no-process state; the worker itself starts lazily on first render.
    pub fn new(config: ProcessConfig) -> RendererResult<Self> {
        if config.executable.as_os_str().is_empty() {
            return Err(RendererError::configuration(
                "no worker executable configured",
            ));
        }
        if !config.executable.is_file() {
            return Err(RendererError::configuration(format!(
                "can't locate worker executable: {}",
                config.executable.display()
            )));
        }

        let seconds = [
            config.timeouts.initial_page_load,
            config.timeouts.page_load,
            config.timeouts.render_response,
            config.timeouts.initial_render_response,
            config.timeouts.process_startup,
            config.lifetime.idle_shutdown_sec,
            config.lifetime.max_lifetime_sec,
        ];
        if seconds.iter().any(|value| !value.is_finite() || *value <= 0.0) {
            return Err(RendererError::configuration(
                "timeout and lifetime values must be positive seconds",
            ));
        }

        Ok(Self {
            config,
            session: TimedMutex::new(Session { worker: None }),
            worker_pid: Arc::new(StdMutex::new(None)),
        })
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    fn store_pid(&self, pid: Option<u32>) {
        let mut slot = self
            .worker_pid
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = pid;
    }

    async fn start_worker(&self) -> RendererResult<Worker> {
        let config = self.config.clone();
        let startup = self.config.timeouts.process_startup();

        match TimedCall::new()
            .join_on_timeout(true)
            .spawn(startup, async move { Worker::launch(&config).await })
            .await
        {
            Ok(launched) => launched,
            Err(error) => Err(RendererError::startup(error.to_string())),
        }
    }

    async fn render_locked(&self, session: &mut Session, request: &RenderRequest) -> RenderResponse {
        if session.worker.is_none() {
            match self.start_worker().await {
                Ok(worker) => {
                    tracing::debug!(pid = ?worker.child.id(), "worker process started");
                    self.store_pid(worker.child.id());
                    session.worker = Some(worker);
                }
                Err(error) => {
                    tracing::warn!(%error, "worker startup failed");
                    return RenderResponse::failure(request, error);
                }
            }
        }

        let Some(worker) = session.worker.as_mut() else {
            return RenderResponse::failure(request, RendererError::startup("worker unavailable"));
        };

        let first_render = !worker.rendered;
        worker.rendered = true;

        let timeouts = &self.config.timeouts;
        let page_load = request
            .page_load_timeout
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or_else(|| {
                if first_render {
                    timeouts.initial_page_load()
                } else {
                    timeouts.page_load()
                }
            });
        let response_budget = if first_render {
            timeouts.initial_render_response()
        } else {
            timeouts.render_response()
        };

        let wire = WorkerRequest::assemble(request, page_load, &self.config);
        let line = match serde_json::to_string(&wire) {
            Ok(line) => line,
            Err(error) => return RenderResponse::failure(request, RendererError::from(error)),
        };

        let outcome = TimedCall::new()
            .run(page_load + response_budget, worker.exchange(&line))
            .await;
        let diagnostics = worker.drain_stderr();

        match outcome {
            Ok(Ok(raw)) => self.interpret_line(session, request, raw, diagnostics).await,
            Ok(Err(io_error)) => {
                // Broken pipe, EOF, or another stream fault: the worker is
                // gone or unusable. Discard it so no half-alive handle
                // remains reachable.
                tracing::warn!(%io_error, url = %request.url, "worker stream failed; discarding process");
                self.discard_worker(session).await;

                let mut message = RendererError::Io(io_error).to_string();
                if let Some(diag) = diagnostics {
                    message.push_str("\nWorker stderr: ");
                    message.push_str(&diag);
                }
                RenderResponse::failure(request, message)
            }
            Err(_) => {
                // The worker may still be usable; a single exchange timeout
                // does not force a restart.
                tracing::warn!(url = %request.url, "render request timed out");
                RenderResponse::failure(request, RendererError::RenderTimeout)
            }
        }
    }

    async fn interpret_line(
        &self,
        session: &mut Session,
        request: &RenderRequest,
        raw: String,
        diagnostics: Option<String>,
    ) -> RenderResponse {
        let parsed: WorkerResponse = match serde_json::from_str(&raw) {
            Ok(parsed) => parsed,
            Err(parse_error) => {
                // Unparseable output means the protocol stream can no
                // longer be trusted; terminate and surface the raw line.
                tracing::warn!(%parse_error, "worker emitted an unparseable response line; discarding process");
                self.discard_worker(session).await;
                return RenderResponse::failure(
                    request,
                    RendererError::protocol(parse_error.to_string(), raw),
                );
            }
        };

        let image = match parsed.base64.as_deref().map(protocol::decode_base64).transpose() {
            Ok(image) => image,
            Err(decode_error) => {
                tracing::warn!(%decode_error, "worker image payload is not valid base64; discarding process");
                self.discard_worker(session).await;
                return RenderResponse::failure(
                    request,
                    RendererError::protocol(
                        format!("invalid base64 image payload: {decode_error}"),
                        raw,
                    ),
                );
            }
        };

        let status = RenderStatus::from_wire(parsed.status.as_deref());

        RenderResponse {
            url: request.url.clone(),
            status,
            load_time_ms: parsed.load_time,
            paint_time_ms: parsed.paint_time,
            image: if status == RenderStatus::Fail { None } else { image },
            format: request.format,
            error: parsed.error.or(diagnostics),
        }
    }

    async fn discard_worker(&self, session: &mut Session) {
        if let Some(mut worker) = session.worker.take() {
            self.store_pid(None);
            let _ = worker.child.kill().await;
        }
    }

    async fn shutdown_locked(&self, session: &mut Session) {
        let Some(mut worker) = session.worker.take() else {
            return;
        };
        self.store_pid(None);

        // Ask the worker to exit on its own, then enforce.
        let _ = worker.stdin.write_all(EXIT_SENTINEL.as_bytes()).await;
        let _ = worker.stdin.write_all(b"\n").await;
        let _ = worker.stdin.flush().await;

        match TimedCall::new().run(GRACEFUL_EXIT_WAIT, worker.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "worker exited"),
            Ok(Err(error)) => {
                tracing::warn!(%error, "waiting for worker exit failed; killing");
                let _ = worker.child.kill().await;
            }
            Err(_) => {
                tracing::debug!("worker ignored exit request; killing");
                let _ = worker.child.kill().await;
            }
        }
    }

    /// Forced kill without the communication lock. An in-flight render will
    /// observe the resulting pipe failure and report it as a fail response.
    fn double_tap(&self) {
        let pid = self
            .worker_pid
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(pid) = pid else {
            return;
        };

        tracing::warn!(pid, "communication lock busy during shutdown; force-killing worker");
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
    }
}

#[async_trait::async_trait]
impl Renderer for ProcessRenderer {
    async fn render(&self, request: &RenderRequest) -> RenderResponse {
        let mut session = self.session.lock().await;
        self.render_locked(&mut session, request).await
    }

    async fn shutdown(&self, timeout: Option<Duration>) {
        let guard = match timeout {
            Some(limit) => self.session.lock_timeout(limit).await,
            None => Some(self.session.lock().await),
        };
        match guard {
            Some(mut session) => self.shutdown_locked(&mut session).await,
            None => self.double_tap(),
        }
    }

    fn lifetime_config(&self) -> LifetimeConfig {
        self.config.lifetime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn construction_rejects_missing_executable() {
        let config = ProcessConfig::default();
        let error = ProcessRenderer::new(config).err().expect("must fail");
        assert!(matches!(error, RendererError::Configuration { .. }));
    }

    #[test]
    fn construction_rejects_nonexistent_executable() {
        let config = ProcessConfig {
            executable: PathBuf::from("/nonexistent/render-worker"),
            ..Default::default()
        };
        let error = ProcessRenderer::new(config).err().expect("must fail");
        match error {
            RendererError::Configuration { message } => {
                assert!(message.contains("/nonexistent/render-worker"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn construction_rejects_non_positive_timeouts() {
        let mut config = ProcessConfig {
            executable: std::env::current_exe().expect("test binary path"),
            ..Default::default()
        };
        config.timeouts.page_load = 0.0;
        assert!(ProcessRenderer::new(config).is_err());
    }

    #[tokio::test]
    async fn shutdown_without_process_is_a_noop() {
        let renderer = test_renderer();
        renderer.shutdown(None).await;
        renderer.shutdown(Some(Duration::from_millis(100))).await;
    }

    fn test_renderer() -> ProcessRenderer {
        // any file on disk satisfies construction; nothing is spawned until
        // the first render call
        let config = ProcessConfig {
            executable: std::env::current_exe().expect("test binary path"),
            ..Default::default()
        };
        ProcessRenderer::new(config).expect("construction")
    }
}
