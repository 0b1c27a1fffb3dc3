//!
//! src/rate_limit.rs
//!
//! Minimum-interval gate placed in front of every call to a rate limited
//! provider. Waits are measured from the previous permitted call, the
//! first call through a fresh gate never waits
//!

use std::time::Duration;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    jitter: Option<(Duration, Duration)>,
    state: Mutex<GateState>
}

#[derive(Debug)]
struct GateState {
    last: Option<Instant>,
    rng: SmallRng
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            jitter: None,
            state: Mutex::new(GateState { last: None, rng: SmallRng::from_entropy() })
        }
    }

    /// Adds a uniform random pause in [min, max] whenever the gate has to wait
    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        if max >= min {
            self.jitter = Some((min, max));
        }
        self
    }

    pub fn min_interval(&self) -> Duration { self.min_interval }

    /// Sleeps out whatever remains of the interval since the last call,
    /// then stamps the current time as the last permitted call
    pub async fn wait_if_needed(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let mut pause = self.min_interval - elapsed;
                if let Some((lo, hi)) = self.jitter {
                    let extra = state.rng.gen_range(lo.as_millis()..=hi.as_millis()) as u64;
                    pause += Duration::from_millis(extra);
                }
                debug!(pause_ms = pause.as_millis() as u64, "rate_gate.wait");
                sleep(pause).await;
            }
        }
        state.last = Some(Instant::now());
    }
}
