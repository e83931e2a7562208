use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};

use crate::{
    config::Config,
    error::{ErrorKind, SessionError},
    overlay::OverlayView,
    pipeline::{
        CaptureSource, DepthCache, FrameGate, PoseBackend, UploadJob, UploadOutcome,
        start_upload_worker,
    },
    types::{DepthSample, Frame},
};

const FRAME_QUEUE: usize = 1;
const DEPTH_QUEUE: usize = 1;
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

/// Result of draining completions on the UI thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub applied: usize,
    pub failed: Vec<ErrorKind>,
    pub discarded: usize,
}

/// Wires capture, throttling, depth caching and uploads together.
///
/// Capture and network work happen on background threads; results only reach
/// an [`OverlayView`] through [`Session::pump`], which the owner calls from
/// its UI thread.
pub struct Session {
    config: Config,
    backend: Arc<dyn PoseBackend>,
    capture: Box<dyn CaptureSource>,
    state: SessionState,
    active: Arc<AtomicBool>,
    depth: DepthCache,
    outcome_rx: Option<Receiver<UploadOutcome>>,
    consumers: Vec<thread::JoinHandle<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Session {
    pub fn new(
        config: Config,
        backend: impl PoseBackend + 'static,
        capture: impl CaptureSource + 'static,
    ) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            capture: Box::new(capture),
            state: SessionState::Idle,
            active: Arc::new(AtomicBool::new(false)),
            depth: DepthCache::new(),
            outcome_rx: None,
            consumers: Vec::new(),
            worker: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn depth_cache(&self) -> &DepthCache {
        &self.depth
    }

    /// Opens the capture device and spawns the consumers. A missing device
    /// leaves the session `Idle` and returns `DeviceUnavailable`.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Running => return Err(SessionError::AlreadyStarted),
            SessionState::Stopped => return Err(SessionError::Stopped),
            SessionState::Idle => {}
        }

        let (frame_tx, frame_rx) = bounded(FRAME_QUEUE);
        let (depth_tx, depth_rx) = bounded(DEPTH_QUEUE);
        if let Err(err) = self.capture.start(frame_tx, depth_tx) {
            log::error!("session failed to start: {err}");
            return Err(err);
        }

        self.active.store(true, Ordering::SeqCst);

        let (job_tx, job_rx) = unbounded();
        let (outcome_tx, outcome_rx) = unbounded();
        self.worker = Some(start_upload_worker(self.backend.clone(), job_rx, outcome_tx));
        self.outcome_rx = Some(outcome_rx);

        let gate = FrameGate::new(self.config.frame_interval());
        self.consumers.push(spawn_frame_consumer(
            frame_rx,
            gate,
            self.depth.clone(),
            job_tx,
            self.active.clone(),
        ));
        self.consumers.push(spawn_depth_consumer(
            depth_rx,
            self.depth.clone(),
            self.active.clone(),
        ));

        self.state = SessionState::Running;
        log::info!(
            "session running: endpoint {} every {:?}",
            self.config.endpoint(),
            self.config.frame_interval()
        );
        Ok(())
    }

    /// Applies finished uploads to `view`. Call from the UI thread only.
    /// Failures leave the view untouched; outcomes that arrive after
    /// [`Session::stop`] are discarded.
    pub fn pump(&self, view: &mut OverlayView) -> PumpReport {
        let mut report = PumpReport::default();
        let Some(outcome_rx) = &self.outcome_rx else {
            return report;
        };

        for outcome in outcome_rx.try_iter() {
            if !self.active.load(Ordering::SeqCst) {
                log::debug!("discarding upload result that arrived after stop");
                report.discarded += 1;
                continue;
            }
            match outcome.result {
                Ok(skeleton) => {
                    log::info!(
                        "skeleton updated {:?} after capture (upload {:?}): {}",
                        outcome.captured_at.elapsed(),
                        outcome.elapsed,
                        skeleton.summary_text()
                    );
                    view.apply(skeleton);
                    report.applied += 1;
                }
                Err(err) => {
                    log::warn!("keeping previous overlay ({}): {err}", err.kind());
                    report.failed.push(err.kind());
                }
            }
        }

        report
    }

    /// Tears down capture and consumers. In-flight uploads are not cancelled;
    /// their results are dropped by the next [`Session::pump`].
    pub fn stop(&mut self) {
        if self.state == SessionState::Stopped {
            return;
        }
        let was_running = self.state == SessionState::Running;
        self.active.store(false, Ordering::SeqCst);
        self.state = SessionState::Stopped;

        if was_running {
            self.capture.stop();
        }
        for handle in self.consumers.drain(..) {
            if handle.join().is_err() {
                log::error!("capture consumer panicked");
            }
        }
        // The worker exits on its own once its job queue closes.
        self.worker.take();
        self.depth.clear();
        log::info!("session stopped");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_frame_consumer(
    frame_rx: Receiver<Frame>,
    mut gate: FrameGate,
    depth: DepthCache,
    job_tx: Sender<UploadJob>,
    active: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        log::debug!("frame consumer admitting one frame per {:?}", gate.interval());
        loop {
            match frame_rx.recv_timeout(POLL_INTERVAL) {
                Ok(frame) => {
                    if !active.load(Ordering::Relaxed) {
                        break;
                    }
                    if !gate.admit(frame.timestamp) {
                        log::trace!("frame dropped by gate");
                        continue;
                    }
                    let job = UploadJob {
                        frame,
                        depth: depth.current(),
                    };
                    if job_tx.send(job).is_err() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !active.load(Ordering::Relaxed) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        log::debug!("frame consumer exiting");
    })
}

fn spawn_depth_consumer(
    depth_rx: Receiver<DepthSample>,
    depth: DepthCache,
    active: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match depth_rx.recv_timeout(POLL_INTERVAL) {
                Ok(sample) => depth.update(sample),
                Err(RecvTimeoutError::Timeout) => {
                    if !active.load(Ordering::Relaxed) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    })
}
