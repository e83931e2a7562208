use std::time::{Duration, Instant};

/// Time-based throttle deciding which captured frames reach the uploader.
#[derive(Clone, Debug)]
pub struct FrameGate {
    interval: Duration,
    last_forwarded: Option<Instant>,
}

impl FrameGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_forwarded: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_forwarded(&self) -> Option<Instant> {
        self.last_forwarded
    }

    /// Returns true and records `at` when the frame should be forwarded.
    /// The first frame is always admitted. Timestamps earlier than the
    /// marker count as zero elapsed time.
    pub fn admit(&mut self, at: Instant) -> bool {
        let eligible = match self.last_forwarded {
            None => true,
            Some(last) => at.saturating_duration_since(last) >= self.interval,
        };
        if eligible {
            self.last_forwarded = Some(at);
        }
        eligible
    }
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_FRAME_INTERVAL)
    }
}
