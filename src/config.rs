use std::{env, time::Duration};

use crate::pipeline::protocol::ResponseSchema;

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_JPEG_QUALITY: u8 = 80;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PREVIEW_WIDTH: u32 = 640;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 480;

const ENV_ENDPOINT: &str = "POSE_OVERLAY_ENDPOINT";
const ENV_SCHEMA: &str = "POSE_OVERLAY_SCHEMA";
const ENV_INTERVAL_MS: &str = "POSE_OVERLAY_INTERVAL_MS";
const ENV_CAMERA: &str = "POSE_OVERLAY_CAMERA";
const ENV_MAX_UPLOAD_SIDE: &str = "POSE_OVERLAY_MAX_UPLOAD_SIDE";
const ENV_JPEG_QUALITY: &str = "POSE_OVERLAY_JPEG_QUALITY";
const ENV_PREVIEW_SIZE: &str = "POSE_OVERLAY_PREVIEW_SIZE";

/// Runtime settings for a capture/upload session.
#[derive(Clone, Debug)]
pub struct Config {
    endpoint: String,
    schema: ResponseSchema,
    frame_interval: Duration,
    jpeg_quality: u8,
    request_timeout: Duration,
    max_upload_side: Option<u32>,
    camera_index: u32,
    preview_width: u32,
    preview_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        let schema = ResponseSchema::ContactList;
        Self {
            endpoint: schema.default_endpoint().to_string(),
            schema,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_upload_side: None,
            camera_index: 0,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
        }
    }
}

impl Config {
    /// Defaults overlaid with any `POSE_OVERLAY_*` variables that parse.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(raw) = lookup(ENV_SCHEMA) {
            match ResponseSchema::parse(&raw) {
                Some(schema) => config = config.with_schema(schema),
                None => log::warn!("ignoring {ENV_SCHEMA}={raw:?}: expected `contacts` or `points`"),
            }
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            config = config.with_endpoint(endpoint);
        }
        if let Some(raw) = lookup(ENV_INTERVAL_MS) {
            match raw.parse::<u64>() {
                Ok(ms) => config = config.with_frame_interval(Duration::from_millis(ms)),
                Err(err) => log::warn!("ignoring {ENV_INTERVAL_MS}={raw:?}: {err}"),
            }
        }
        if let Some(raw) = lookup(ENV_CAMERA) {
            match raw.parse::<u32>() {
                Ok(index) => config = config.with_camera_index(index),
                Err(err) => log::warn!("ignoring {ENV_CAMERA}={raw:?}: {err}"),
            }
        }
        if let Some(raw) = lookup(ENV_MAX_UPLOAD_SIDE) {
            match raw.parse::<u32>() {
                // 0 turns downscaling off.
                Ok(side) => config = config.with_max_upload_side(Some(side)),
                Err(err) => log::warn!("ignoring {ENV_MAX_UPLOAD_SIDE}={raw:?}: {err}"),
            }
        }
        if let Some(raw) = lookup(ENV_JPEG_QUALITY) {
            match raw.parse::<u8>() {
                Ok(quality) => config = config.with_jpeg_quality(quality),
                Err(err) => log::warn!("ignoring {ENV_JPEG_QUALITY}={raw:?}: {err}"),
            }
        }
        if let Some(raw) = lookup(ENV_PREVIEW_SIZE) {
            match parse_size(&raw) {
                Some((width, height)) => config = config.with_preview_size(width, height),
                None => log::warn!("ignoring {ENV_PREVIEW_SIZE}={raw:?}: expected WIDTHxHEIGHT"),
            }
        }

        config
    }

    /// Switches schema; the endpoint follows unless it was customised.
    pub fn with_schema(mut self, schema: ResponseSchema) -> Self {
        if self.endpoint == self.schema.default_endpoint() {
            self.endpoint = schema.default_endpoint().to_string();
        }
        self.schema = schema;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_upload_side(mut self, side: Option<u32>) -> Self {
        self.max_upload_side = side.filter(|s| *s > 0);
        self
    }

    pub fn with_camera_index(mut self, index: u32) -> Self {
        self.camera_index = index;
        self
    }

    pub fn with_preview_size(mut self, width: u32, height: u32) -> Self {
        self.preview_width = width;
        self.preview_height = height;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn schema(&self) -> ResponseSchema {
        self.schema
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_upload_side(&self) -> Option<u32> {
        self.max_upload_side
    }

    pub fn camera_index(&self) -> u32 {
        self.camera_index
    }

    pub fn preview_width(&self) -> u32 {
        self.preview_width
    }

    pub fn preview_height(&self) -> u32 {
        self.preview_height
    }
}

/// Parses `640x480` style sizes; both sides must be non-zero.
fn parse_size(raw: &str) -> Option<(u32, u32)> {
    let (width, height) = raw.trim().split_once(['x', 'X'])?;
    let width = width.trim().parse::<u32>().ok()?;
    let height = height.trim().parse::<u32>().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}
