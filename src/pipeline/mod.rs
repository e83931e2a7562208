pub mod camera;
pub mod depth;
pub mod gate;
pub mod protocol;
pub mod upload;
pub mod worker;

// Re-exports for convenience
pub use camera::CaptureSource;
#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraDevice, NokhwaCamera, available_cameras};
pub use depth::DepthCache;
pub use gate::FrameGate;
pub use protocol::ResponseSchema;
pub use upload::{Uploader, encode_jpeg};
pub use worker::{PoseBackend, UploadJob, UploadOutcome, start_upload_worker};
