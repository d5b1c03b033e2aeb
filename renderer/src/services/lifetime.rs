//! Lifecycle supervisor wrapping any renderer
//!
//! Worker processes accumulate unbounded in-process state over time (cache
//! bloat, memory leaks). The supervisor bounds that growth by shutting the
//! wrapped renderer down once it has been idle past a threshold or alive
//! past a maximum age; the next render call transparently brings a fresh
//! one up. For long or continual operation, always wrap the renderer in a
//! `Lifetime`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::LifetimeConfig;
use crate::timed::{TimedCall, TimedMutex};
use crate::traits::Renderer;
use crate::types::{RenderRequest, RenderResponse};

/// Activity bookkeeping shared between the render path and the monitor.
/// Touched only under the supervisor's lock. Both timestamps reset to
/// `None` atomically on eviction or shutdown.
struct ActivityState {
    last_render_time: Option<Instant>,
    first_render_time: Option<Instant>,
    running: bool,
}

/// Wraps a [`Renderer`] and evicts it on idle or age deadlines.
///
/// Each instance owns its own lock, wake primitive, and monitor task;
/// nothing is shared across supervisor instances.
pub struct Lifetime<R: Renderer> {
    delegate: Arc<R>,
    config: LifetimeConfig,
    state: TimedMutex<ActivityState>,
    wake: Arc<Notify>,
    monitor: TimedMutex<Option<JoinHandle<()>>>,
}

impl<R: Renderer + 'static> Lifetime<R> {
    /// Wrap `delegate`, taking the lifecycle thresholds from its
    /// configuration.
    pub fn new(delegate: R) -> Self {
        let config = delegate.lifetime_config();
        Self {
            delegate: Arc::new(delegate),
            config,
            state: TimedMutex::new(ActivityState {
                last_render_time: None,
                first_render_time: None,
                running: false,
            }),
            wake: Arc::new(Notify::new()),
            monitor: TimedMutex::new(None),
        }
    }

    async fn stamp_activity(&self) {
        let start_monitor = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            state.last_render_time = Some(now);
            if state.first_render_time.is_none() {
                state.first_render_time = Some(now);
            }
            if state.running {
                false
            } else {
                state.running = true;
                true
            }
        };

        if start_monitor {
            let handle = tokio::spawn(monitor_loop(
                self.state.clone(),
                Arc::clone(&self.wake),
                Arc::clone(&self.delegate),
                self.config,
            ));
            *self.monitor.lock().await = Some(handle);
        } else {
            // an active monitor re-computes its sleep from the new stamp
            self.wake.notify_one();
        }
    }
}

/// Background eviction loop; one per supervisor while it is active.
///
/// Sleeps until the nearer of the idle and age deadlines, interruptibly:
/// a new render call or an external shutdown wakes it early. On eviction
/// it clears the activity state, shuts the delegate down, and exits; the
/// next render call restarts it.
async fn monitor_loop<R: Renderer>(
    state: TimedMutex<ActivityState>,
    wake: Arc<Notify>,
    delegate: Arc<R>,
    config: LifetimeConfig,
) {
    loop {
        let now = Instant::now();
        let mut sleep_for: Option<Duration> = None;
        let mut evict_reason: Option<&'static str> = None;

        {
            let mut state = state.lock().await;
            if !state.running {
                break;
            }

            if let Some(last) = state.last_render_time {
                let idle_deadline = last + config.idle_shutdown();
                if now >= idle_deadline {
                    evict_reason = Some("idle");
                } else {
                    sleep_for = Some(idle_deadline - now);
                }
            }

            if evict_reason.is_none() {
                if let Some(first) = state.first_render_time {
                    let age_deadline = first + config.max_lifetime();
                    if now >= age_deadline {
                        evict_reason = Some("max lifetime");
                    } else {
                        let until_age = age_deadline - now;
                        sleep_for = Some(match sleep_for {
                            Some(until_idle) => until_idle.min(until_age),
                            None => until_age,
                        });
                    }
                }
            }

            if evict_reason.is_some() {
                state.last_render_time = None;
                state.first_render_time = None;
                state.running = false;
            }
        }

        if let Some(reason) = evict_reason {
            tracing::info!(reason, "shutting down renderer");
            delegate.shutdown(None).await;
            break;
        }

        match sleep_for {
            Some(delta) => {
                tokio::select! {
                    _ = time::sleep(delta) => {}
                    _ = wake.notified() => {}
                }
            }
            // no activity recorded yet; wait until something happens
            None => wake.notified().await,
        }
    }
}

#[async_trait::async_trait]
impl<R: Renderer + 'static> Renderer for Lifetime<R> {
    async fn render(&self, request: &RenderRequest) -> RenderResponse {
        // Only the bookkeeping happens under the lock; the delegate call
        // itself must not block the monitor's evaluation.
        self.stamp_activity().await;
        self.delegate.render(request).await
    }

    async fn shutdown(&self, timeout: Option<Duration>) {
        {
            let mut state = self.state.lock().await;
            state.running = false;
            state.last_render_time = None;
            state.first_render_time = None;
        }
        self.wake.notify_one();

        let handle = self.monitor.lock().await.take();
        if let Some(mut handle) = handle {
            match timeout {
                Some(limit) => {
                    if TimedCall::new().run(limit, &mut handle).await.is_err() {
                        tracing::warn!("lifetime monitor did not stop in time; aborting it");
                        handle.abort();
                    }
                }
                None => {
                    let _ = handle.await;
                }
            }
        }

        self.delegate.shutdown(timeout).await;
    }

    fn lifetime_config(&self) -> LifetimeConfig {
        self.config
    }
}
