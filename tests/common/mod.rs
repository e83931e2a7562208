#![allow(dead_code)]

use std::{
    io::{Read, Write},
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use pose_overlay::{
    CaptureSource, DepthSample, Frame, OverlayView, PumpReport, Session, SessionError,
};

/// One canned HTTP response per accepted connection; raw requests are
/// forwarded to `requests`.
pub struct Responder {
    pub url: String,
    pub requests: Receiver<Vec<u8>>,
}

pub fn respond_with(responses: Vec<(u16, String)>) -> Responder {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/process-frame/", listener.local_addr().unwrap());
    let (tx, rx) = unbounded();

    thread::spawn(move || {
        for (status, body) in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let request = read_request(&mut stream);
            let _ = tx.send(request);
            let reply = format!(
                "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(reply.as_bytes());
            let _ = stream.flush();
        }
    });

    Responder { url, requests: rx }
}

/// Address nothing listens on.
pub fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/process-frame/")
}

fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut data = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);
        if request_complete(&data) {
            break;
        }
    }
    data
}

fn request_complete(data: &[u8]) -> bool {
    let Some(header_end) = find(data, b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
    let body = &data[header_end + 4..];
    for line in head.lines() {
        if let Some(len) = line.strip_prefix("content-length:") {
            let len: usize = len.trim().parse().unwrap_or(0);
            return body.len() >= len;
        }
    }
    if head.contains("transfer-encoding: chunked") {
        return body.ends_with(b"0\r\n\r\n");
    }
    true
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn solid_frame(width: u32, height: u32) -> Frame {
    Frame::new(vec![128u8; (width * height * 4) as usize], width, height)
}

type Senders = (Sender<Frame>, Sender<DepthSample>);

/// Capture source driven by the test through a [`CaptureHandle`].
pub struct ChannelCapture {
    slot: Arc<Mutex<Option<Senders>>>,
}

#[derive(Clone)]
pub struct CaptureHandle {
    slot: Arc<Mutex<Option<Senders>>>,
}

pub fn channel_capture() -> (ChannelCapture, CaptureHandle) {
    let slot = Arc::new(Mutex::new(None));
    (
        ChannelCapture { slot: slot.clone() },
        CaptureHandle { slot },
    )
}

impl CaptureSource for ChannelCapture {
    fn start(&mut self, frame_tx: Sender<Frame>, depth_tx: Sender<DepthSample>) -> Result<(), SessionError> {
        *self.slot.lock().unwrap() = Some((frame_tx, depth_tx));
        Ok(())
    }

    fn stop(&mut self) {
        self.slot.lock().unwrap().take();
    }
}

impl CaptureHandle {
    pub fn send_frame(&self, frame: Frame) {
        let tx = self.slot.lock().unwrap().as_ref().map(|(f, _)| f.clone());
        tx.expect("capture not started").send(frame).unwrap();
    }

    pub fn send_depth(&self, sample: DepthSample) {
        let tx = self.slot.lock().unwrap().as_ref().map(|(_, d)| d.clone());
        tx.expect("capture not started").send(sample).unwrap();
    }
}

/// Pumps until `done` holds for the accumulated report or the deadline passes.
pub fn pump_until<F>(session: &Session, view: &mut OverlayView, timeout: Duration, done: F) -> PumpReport
where
    F: Fn(&PumpReport) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut total = PumpReport::default();
    loop {
        let report = session.pump(view);
        total.applied += report.applied;
        total.discarded += report.discarded;
        total.failed.extend(report.failed);
        if done(&total) || Instant::now() >= deadline {
            return total;
        }
        thread::sleep(Duration::from_millis(10));
    }
}
