use std::sync::{Arc, Mutex, PoisonError};

use crate::types::DepthSample;

/// Latest-value slot for depth maps, shared between the depth producer and
/// the frame consumer. Cloning shares the slot.
#[derive(Clone, Debug, Default)]
pub struct DepthCache {
    latest: Arc<Mutex<Option<Arc<DepthSample>>>>,
}

impl DepthCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held sample unconditionally.
    pub fn update(&self, sample: DepthSample) {
        let sample = Arc::new(sample);
        let mut slot = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(sample);
    }

    pub fn current(&self) -> Option<Arc<DepthSample>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
