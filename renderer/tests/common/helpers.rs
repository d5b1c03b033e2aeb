//! Small assertion helpers for timing-sensitive tests

use std::time::{Duration, Instant};

use tokio::time::sleep;

/// Poll `condition` until it holds or `deadline` passes.
pub async fn wait_for(description: &str, deadline: Duration, mut condition: impl FnMut() -> bool) {
    let started = Instant::now();
    while started.elapsed() < deadline {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {description}");
}
