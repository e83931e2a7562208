use crossbeam_channel::Sender;

use crate::{
    error::SessionError,
    types::{DepthSample, Frame},
};

/// A device that pushes video frames, and optionally depth maps, onto two
/// independent channels until stopped.
pub trait CaptureSource: Send {
    /// Opens the device. Failing to find or open it is reported as
    /// [`SessionError::DeviceUnavailable`].
    fn start(&mut self, frame_tx: Sender<Frame>, depth_tx: Sender<DepthSample>) -> Result<(), SessionError>;

    /// Stops producing and drops both senders.
    fn stop(&mut self);
}

#[cfg(feature = "camera-nokhwa")]
pub use native::{CameraDevice, NokhwaCamera, available_cameras};

#[cfg(feature = "camera-nokhwa")]
mod native {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
        time::Duration,
    };

    use crossbeam_channel::{Sender, TrySendError, bounded};
    use nokhwa::{
        Camera, NokhwaError,
        pixel_format::{RgbAFormat, RgbFormat},
        query,
        utils::{ApiBackend, CameraIndex, CameraInfo, RequestedFormat, RequestedFormatType},
    };

    use super::CaptureSource;
    use crate::{
        error::SessionError,
        types::{DepthSample, Frame},
    };

    const BACKOFF_BASE: Duration = Duration::from_millis(10);
    const BACKOFF_MAX: Duration = Duration::from_secs(1);
    const FAILURE_LOG_EVERY: u32 = 50;

    #[derive(Clone, Debug)]
    pub struct CameraDevice {
        pub index: CameraIndex,
        pub label: String,
    }

    pub fn available_cameras() -> anyhow::Result<Vec<CameraDevice>> {
        let cameras = query(ApiBackend::Auto)?;
        Ok(cameras
            .into_iter()
            .map(|info| CameraDevice {
                index: info.index().clone(),
                label: format_camera_label(&info),
            })
            .collect())
    }

    fn format_camera_label(info: &CameraInfo) -> String {
        format!("{} ({})", info.human_name(), info.index())
    }

    fn build_camera(index: CameraIndex) -> Result<Camera, SessionError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let mut camera = Camera::new(index.clone(), requested)
            .map_err(|err| SessionError::DeviceUnavailable(format!("camera {index}: {err}")))?;
        camera
            .open_stream()
            .map_err(|err| SessionError::DeviceUnavailable(format!("camera {index}: {err}")))?;
        Ok(camera)
    }

    /// Local webcam. It has no depth sensor, so the depth channel stays idle.
    #[derive(Debug)]
    pub struct NokhwaCamera {
        index: CameraIndex,
        preview_tx: Option<Sender<Frame>>,
        stop: Arc<AtomicBool>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl NokhwaCamera {
        pub fn new(index: u32) -> Self {
            Self {
                index: CameraIndex::Index(index),
                preview_tx: None,
                stop: Arc::new(AtomicBool::new(false)),
                handle: None,
            }
        }

        /// Also hands every captured frame to `preview_tx`, dropping frames
        /// the preview has not consumed yet.
        pub fn with_preview(mut self, preview_tx: Sender<Frame>) -> Self {
            self.preview_tx = Some(preview_tx);
            self
        }
    }

    impl CaptureSource for NokhwaCamera {
        fn start(
            &mut self,
            frame_tx: Sender<Frame>,
            depth_tx: Sender<DepthSample>,
        ) -> Result<(), SessionError> {
            drop(depth_tx);

            let index = self.index.clone();
            let preview_tx = self.preview_tx.clone();
            let stop_flag = self.stop.clone();
            stop_flag.store(false, Ordering::SeqCst);

            // The camera handle is opened on the capture thread itself; the
            // outcome of opening it is reported back before start returns.
            let (ready_tx, ready_rx) = bounded::<Result<(), SessionError>>(1);
            let handle = thread::spawn(move || {
                let camera = match build_camera(index) {
                    Ok(cam) => {
                        let _ = ready_tx.send(Ok(()));
                        cam
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                run_capture(camera, &frame_tx, preview_tx.as_ref(), &stop_flag);
            });

            let ready = ready_rx.recv().unwrap_or_else(|_| {
                Err(SessionError::DeviceUnavailable(
                    "capture thread exited before opening the camera".to_string(),
                ))
            });
            if let Err(err) = ready {
                let _ = handle.join();
                return Err(err);
            }

            self.handle = Some(handle);
            Ok(())
        }

        fn stop(&mut self) {
            self.stop.store(true, Ordering::SeqCst);
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }

    fn run_capture(
        mut camera: Camera,
        frame_tx: &Sender<Frame>,
        preview_tx: Option<&Sender<Frame>>,
        stop_flag: &AtomicBool,
    ) {
        let mut failures = FailureBackoff::default();

        while !stop_flag.load(Ordering::Relaxed) {
            let decoded = camera
                .frame()
                .and_then(|buffer| buffer.decode_image::<RgbAFormat>());
            let image = match decoded {
                Ok(image) => {
                    failures.reset();
                    image
                }
                Err(err) => {
                    thread::sleep(failures.record(&err));
                    continue;
                }
            };

            let (width, height) = image.dimensions();
            if width == 0 || height == 0 {
                continue;
            }
            let frame = Frame::new(image.into_raw(), width, height);

            if let Some(preview_tx) = preview_tx {
                let _ = preview_tx.try_send(frame.clone());
            }
            match frame_tx.try_send(frame) {
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Disconnected(_)) => {
                    log::debug!("session hung up, ending capture");
                    break;
                }
            }
        }

        if let Err(err) = camera.stop_stream() {
            log::warn!("camera stream did not stop cleanly: {err}");
        }
    }

    /// Exponential pause between failed reads so a wedged device does not
    /// spin the capture thread.
    #[derive(Debug, Default)]
    struct FailureBackoff {
        consecutive: u32,
    }

    impl FailureBackoff {
        fn reset(&mut self) {
            if self.consecutive > 0 {
                log::info!("camera recovered after {} failed reads", self.consecutive);
            }
            self.consecutive = 0;
        }

        fn record(&mut self, err: &NokhwaError) -> Duration {
            self.consecutive = self.consecutive.saturating_add(1);
            if self.consecutive == 1 || self.consecutive % FAILURE_LOG_EVERY == 0 {
                log::warn!("camera read failed ({} in a row): {err}", self.consecutive);
            }
            backoff_delay(self.consecutive)
        }
    }

    pub(super) fn backoff_delay(consecutive: u32) -> Duration {
        let exp = consecutive.saturating_sub(1).min(16);
        BACKOFF_BASE
            .saturating_mul(1u32 << exp)
            .min(BACKOFF_MAX)
    }

    impl Drop for NokhwaCamera {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
