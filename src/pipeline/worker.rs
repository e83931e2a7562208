use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};

use super::upload::Uploader;
use crate::{
    error::UploadError,
    types::{DepthSample, Frame, Skeleton},
};

/// Anything that can turn a frame into a skeleton. The HTTP uploader is the
/// production implementation.
pub trait PoseBackend: Send + Sync {
    fn process(&self, frame: &Frame, depth: Option<&DepthSample>) -> Result<Skeleton, UploadError>;
}

impl PoseBackend for Uploader {
    fn process(&self, frame: &Frame, depth: Option<&DepthSample>) -> Result<Skeleton, UploadError> {
        Uploader::process(self, frame, depth)
    }
}

#[derive(Debug)]
pub struct UploadJob {
    pub frame: Frame,
    pub depth: Option<Arc<DepthSample>>,
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub captured_at: Instant,
    pub elapsed: Duration,
    pub result: Result<Skeleton, UploadError>,
}

/// Runs uploads off the capture thread and posts each outcome to
/// `outcome_tx`. Exits once every job sender is gone or the outcome
/// receiver is dropped.
pub fn start_upload_worker(
    backend: Arc<dyn PoseBackend>,
    job_rx: Receiver<UploadJob>,
    outcome_tx: Sender<UploadOutcome>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Some(job) = recv_latest_job(&job_rx) {
            let started = Instant::now();
            let result = backend.process(&job.frame, job.depth.as_deref());
            let elapsed = started.elapsed();

            match &result {
                Ok(skeleton) => log::debug!(
                    "upload finished in {elapsed:?}: {} points, {} contacts",
                    skeleton.points.len(),
                    skeleton.contacts.len()
                ),
                Err(err) => log::warn!("upload failed after {elapsed:?} ({}): {err}", err.kind()),
            }

            let outcome = UploadOutcome {
                captured_at: job.frame.timestamp,
                elapsed,
                result,
            };
            if outcome_tx.send(outcome).is_err() {
                break;
            }
        }
        log::debug!("upload worker exiting");
    })
}

fn recv_latest_job(job_rx: &Receiver<UploadJob>) -> Option<UploadJob> {
    let mut job = job_rx.recv().ok()?;
    // Collapse a backlog to the newest frame.
    while let Ok(newer) = job_rx.try_recv() {
        log::debug!("skipping stale upload job");
        job = newer;
    }
    Some(job)
}
