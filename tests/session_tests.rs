mod common;

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use common::{channel_capture, pump_until, respond_with, solid_frame};
use crossbeam_channel::{Receiver, Sender, bounded};
use pose_overlay::{
    Config, DepthSample, ErrorKind, Frame, OverlayView, PoseBackend, ResponseSchema, Session,
    SessionState, Skeleton, SkeletonPoint, UploadError, Uploader, ViewBounds,
};

const WAIT: Duration = Duration::from_secs(5);

fn view() -> OverlayView {
    OverlayView::new(ViewBounds::new(640.0, 480.0))
}

fn http_session(url: &str) -> (Session, common::CaptureHandle) {
    let config = Config::default()
        .with_schema(ResponseSchema::PointFlags)
        .with_endpoint(url)
        .with_request_timeout(WAIT);
    let uploader = Uploader::new(&config).unwrap();
    let (capture, handle) = channel_capture();
    let mut session = Session::new(config, uploader, capture);
    session.start().unwrap();
    (session, handle)
}

/// Counts calls and remembers whether depth came along.
#[derive(Clone, Default)]
struct Counting {
    calls: Arc<AtomicUsize>,
    depth_seen: Arc<Mutex<Vec<bool>>>,
}

impl PoseBackend for Counting {
    fn process(&self, _: &Frame, depth: Option<&DepthSample>) -> Result<Skeleton, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.depth_seen.lock().unwrap().push(depth.is_some());
        Ok(Skeleton::new(
            vec![SkeletonPoint::new(0.25, 0.5).with_label("nose")],
            Vec::new(),
        ))
    }
}

/// Blocks every upload until released.
struct Gated {
    started: Sender<()>,
    release: Receiver<()>,
}

impl PoseBackend for Gated {
    fn process(&self, _: &Frame, _: Option<&DepthSample>) -> Result<Skeleton, UploadError> {
        let _ = self.started.send(());
        let _ = self.release.recv_timeout(WAIT);
        Ok(Skeleton::new(
            vec![SkeletonPoint::new(0.5, 0.5)],
            vec!["nose".to_string()],
        ))
    }
}

#[test]
fn successful_response_updates_view() {
    let body = r#"{"skeleton": [
        {"x": 0.5, "y": 0.5, "min": 0.9, "label": "left_foot", "ground_contact": true}
    ]}"#;
    let server = respond_with(vec![(200, body.to_string())]);
    let (mut session, capture) = http_session(&server.url);
    assert_eq!(session.state(), SessionState::Running);

    let mut view = view();
    capture.send_frame(solid_frame(16, 16));
    let report = pump_until(&session, &mut view, WAIT, |r| r.applied == 1);

    assert_eq!(report.applied, 1);
    assert_eq!(view.summary(), "left_foot");
    assert!(!view.elements().is_empty());

    session.stop();
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn backend_error_keeps_previous_overlay() {
    let ok = r#"{"skeleton": [
        {"x": 0.1, "y": 0.1, "min": 0.9, "label": "right_heel", "ground_contact": true}
    ]}"#;
    let server = respond_with(vec![
        (200, ok.to_string()),
        (500, r#"{"detail": "inference failed"}"#.to_string()),
    ]);
    let config = Config::default()
        .with_schema(ResponseSchema::PointFlags)
        .with_endpoint(&server.url)
        .with_frame_interval(Duration::from_millis(0))
        .with_request_timeout(WAIT);
    let (capture, handle) = channel_capture();
    let mut session = Session::new(config.clone(), Uploader::new(&config).unwrap(), capture);
    session.start().unwrap();

    let mut view = view();
    handle.send_frame(solid_frame(8, 8));
    pump_until(&session, &mut view, WAIT, |r| r.applied == 1);
    let before = view.elements().to_vec();
    assert_eq!(view.summary(), "right_heel");

    handle.send_frame(solid_frame(8, 8));
    let report = pump_until(&session, &mut view, WAIT, |r| !r.failed.is_empty());

    assert_eq!(report.failed, vec![ErrorKind::BackendError]);
    assert_eq!(report.applied, 0);
    assert_eq!(view.summary(), "right_heel");
    assert_eq!(view.elements(), before.as_slice());
    session.stop();
}

#[test]
fn empty_skeleton_clears_overlay() {
    let server = respond_with(vec![(200, r#"{"skeleton": []}"#.to_string())]);
    let (mut session, capture) = http_session(&server.url);

    let mut view = view();
    view.apply(Skeleton::new(
        vec![SkeletonPoint::new(0.5, 0.5)],
        vec!["nose".to_string()],
    ));
    assert!(!view.elements().is_empty());

    capture.send_frame(solid_frame(8, 8));
    let report = pump_until(&session, &mut view, WAIT, |r| r.applied == 1);

    assert_eq!(report.applied, 1);
    assert!(view.elements().is_empty());
    assert_eq!(view.summary(), "No contacts");
    session.stop();
}

#[test]
fn frames_inside_interval_are_not_uploaded() {
    let backend = Counting::default();
    let config = Config::default().with_frame_interval(Duration::from_secs(2));
    let (capture, handle) = channel_capture();
    let mut session = Session::new(config, backend.clone(), capture);
    session.start().unwrap();

    let t0 = Instant::now();
    handle.send_frame(solid_frame(4, 4).with_timestamp(t0));
    handle.send_frame(solid_frame(4, 4).with_timestamp(t0 + Duration::from_millis(500)));

    let mut view = view();
    pump_until(&session, &mut view, WAIT, |r| r.applied == 1);
    // Give a wrongly forwarded second frame time to show up.
    thread::sleep(Duration::from_millis(300));
    let report = session.pump(&mut view);

    assert_eq!(report.applied, 0);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    session.stop();
}

#[test]
fn latest_depth_travels_with_next_frame() {
    let backend = Counting::default();
    let (capture, handle) = channel_capture();
    let mut session = Session::new(Config::default(), backend.clone(), capture);
    session.start().unwrap();

    let sample = DepthSample::new(vec![0.5, 0.75], 2, 1);
    handle.send_depth(sample.clone());
    let deadline = Instant::now() + WAIT;
    while session.depth_cache().current().is_none() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(session.depth_cache().current().as_deref(), Some(&sample));

    handle.send_frame(solid_frame(4, 4));
    let mut view = view();
    pump_until(&session, &mut view, WAIT, |r| r.applied == 1);

    assert_eq!(*backend.depth_seen.lock().unwrap(), vec![true]);
    session.stop();
    assert!(session.depth_cache().current().is_none());
}

#[test]
fn results_arriving_after_stop_are_discarded() {
    let (started_tx, started_rx) = bounded(1);
    let (release_tx, release_rx) = bounded(1);
    let backend = Gated {
        started: started_tx,
        release: release_rx,
    };
    let (capture, handle) = channel_capture();
    let mut session = Session::new(Config::default(), backend, capture);
    session.start().unwrap();

    handle.send_frame(solid_frame(4, 4));
    started_rx.recv_timeout(WAIT).unwrap();

    session.stop();
    release_tx.send(()).unwrap();

    let mut view = view();
    let report = pump_until(&session, &mut view, WAIT, |r| r.discarded == 1);

    assert_eq!(report.discarded, 1);
    assert_eq!(report.applied, 0);
    assert!(view.elements().is_empty());
    assert!(view.summary().is_empty());
}

#[test]
fn start_twice_is_rejected() {
    let (capture, _handle) = channel_capture();
    let mut session = Session::new(Config::default(), Counting::default(), capture);
    session.start().unwrap();
    assert!(matches!(
        session.start(),
        Err(pose_overlay::SessionError::AlreadyStarted)
    ));
    session.stop();
}
