pub mod raster;

use crate::types::{Skeleton, ViewBounds};

pub use raster::draw_display_list;

/// Body-model bone table: pairs of landmark indices joined by a segment.
pub const BONES: &[(usize, usize)] = &[
    // Face
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    // Arms and hands
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    // Torso
    (11, 23),
    (12, 24),
    (23, 24),
    // Legs and feet
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

pub type Color = [u8; 4];

pub const BONE_COLOR: Color = [0, 255, 0, 255];
pub const CONTACT_COLOR: Color = [239, 68, 68, 255];
pub const NO_CONTACT_COLOR: Color = [59, 130, 246, 255];
pub const REFERENCE_COLOR: Color = [250, 204, 21, 255];

pub const BONE_WIDTH: f32 = 2.0;
pub const POINT_RADIUS: f32 = 5.0;
pub const DASH_LENGTH: f32 = 6.0;
pub const DASH_GAP: f32 = 4.0;

/// One primitive in pixel space.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawElement {
    Line {
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
        width: f32,
    },
    DashedLine {
        from: (f32, f32),
        to: (f32, f32),
        color: Color,
        width: f32,
        dash: f32,
        gap: f32,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        color: Color,
    },
}

/// Owns the display list for the skeleton layer. Each render replaces the
/// list wholesale.
#[derive(Clone, Debug, Default)]
pub struct SkeletonRenderer {
    elements: Vec<DrawElement>,
}

impl SkeletonRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[DrawElement] {
        &self.elements
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }

    pub fn render(&mut self, skeleton: &Skeleton, bounds: ViewBounds) -> &[DrawElement] {
        self.elements.clear();
        if skeleton.is_empty() {
            return &self.elements;
        }

        for &(a, b) in BONES {
            // Sparse detections: skip bones with a missing endpoint.
            if let (Some(pa), Some(pb)) = (skeleton.point(a), skeleton.point(b)) {
                self.elements.push(DrawElement::Line {
                    from: bounds.to_pixels(pa),
                    to: bounds.to_pixels(pb),
                    color: BONE_COLOR,
                    width: BONE_WIDTH,
                });
            }
        }

        if let Some(min) = reference_height(skeleton) {
            let y = min * bounds.height;
            self.elements.push(DrawElement::DashedLine {
                from: (0.0, y),
                to: (bounds.width, y),
                color: REFERENCE_COLOR,
                width: BONE_WIDTH,
                dash: DASH_LENGTH,
                gap: DASH_GAP,
            });
        }

        for point in &skeleton.points {
            let color = if point.ground_contact {
                CONTACT_COLOR
            } else {
                NO_CONTACT_COLOR
            };
            self.elements.push(DrawElement::Circle {
                center: bounds.to_pixels(point),
                radius: POINT_RADIUS,
                color,
            });
        }

        &self.elements
    }
}

/// Smallest `min` across points, if any point carries one.
fn reference_height(skeleton: &Skeleton) -> Option<f32> {
    skeleton
        .points
        .iter()
        .filter_map(|p| p.min)
        .filter(|m| m.is_finite())
        .reduce(f32::min)
}

/// What the UI shows: the skeleton layer plus the contact summary line.
#[derive(Clone, Debug)]
pub struct OverlayView {
    bounds: ViewBounds,
    renderer: SkeletonRenderer,
    summary: String,
    last_skeleton: Option<Skeleton>,
}

impl OverlayView {
    pub fn new(bounds: ViewBounds) -> Self {
        Self {
            bounds,
            renderer: SkeletonRenderer::new(),
            summary: String::new(),
            last_skeleton: None,
        }
    }

    pub fn bounds(&self) -> ViewBounds {
        self.bounds
    }

    pub fn elements(&self) -> &[DrawElement] {
        self.renderer.elements()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Replaces overlay and summary with `skeleton`.
    pub fn apply(&mut self, skeleton: Skeleton) {
        self.renderer.render(&skeleton, self.bounds);
        self.summary = skeleton.summary_text();
        self.last_skeleton = Some(skeleton);
    }

    /// Re-lays out the current skeleton for new view bounds.
    pub fn resize(&mut self, bounds: ViewBounds) {
        self.bounds = bounds;
        if let Some(skeleton) = &self.last_skeleton {
            self.renderer.render(skeleton, bounds);
        }
    }

    pub fn clear(&mut self) {
        self.renderer.clear();
        self.summary.clear();
        self.last_skeleton = None;
    }
}
