use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(rgba: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            rgba,
            width,
            height,
            timestamp: Instant::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Most recent depth map, row-major `width * height` values.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthSample {
    pub values: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl DepthSample {
    pub fn new(values: Vec<f32>, width: u32, height: u32) -> Self {
        Self {
            values,
            width,
            height,
        }
    }

    /// Comma-joined decimal rendering used as the depth form field.
    pub fn to_payload(&self) -> String {
        self.values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A keypoint in normalized `[0, 1]` view space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkeletonPoint {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
    pub visibility: Option<f32>,
    /// Per-point minimum-height reference, only carried by the point-flag schema.
    pub min: Option<f32>,
    pub label: Option<String>,
    pub ground_contact: bool,
}

impl SkeletonPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_ground_contact(mut self, ground_contact: bool) -> Self {
        self.ground_contact = ground_contact;
        self
    }

    pub fn with_min(mut self, min: f32) -> Self {
        self.min = Some(min);
        self
    }
}

/// Points in landmark order. Index positions are meaningful for the bone
/// table, and a short sequence simply leaves the trailing indices absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Skeleton {
    pub points: Vec<SkeletonPoint>,
    pub contacts: Vec<String>,
}

impl Skeleton {
    pub fn new(points: Vec<SkeletonPoint>, contacts: Vec<String>) -> Self {
        Self { points, contacts }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<&SkeletonPoint> {
        self.points.get(index)
    }

    pub fn summary_text(&self) -> String {
        if self.contacts.is_empty() {
            "No contacts".to_string()
        } else {
            self.contacts.join(", ")
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBounds {
    pub width: f32,
    pub height: f32,
}

impl ViewBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn to_pixels(&self, point: &SkeletonPoint) -> (f32, f32) {
        (point.x * self.width, point.y * self.height)
    }
}
