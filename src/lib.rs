//! Thin client for live skeleton overlays.
//!
//! Frames from a capture source are throttled by a [`FrameGate`], uploaded
//! with the latest depth map to a pose backend, and the returned skeleton is
//! laid out as a display list by the [`SkeletonRenderer`].

pub mod config;
pub mod error;
pub mod overlay;
pub mod pipeline;
pub mod session;
pub mod types;

pub use config::Config;
pub use error::{ErrorKind, SessionError, UploadError};
pub use overlay::{DrawElement, OverlayView, SkeletonRenderer};
pub use pipeline::{CaptureSource, DepthCache, FrameGate, PoseBackend, ResponseSchema, Uploader};
pub use session::{PumpReport, Session, SessionState};
pub use types::{DepthSample, Frame, Skeleton, SkeletonPoint, ViewBounds};
