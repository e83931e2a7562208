//! Software rasterizer for overlay display lists onto RGBA buffers.

use super::{Color, DrawElement};

const MAX_THICKNESS: i64 = 64;
const MAX_RADIUS: i64 = 256;
const MAX_DASH: f32 = 4096.0;

pub fn draw_display_list(buffer: &mut [u8], width: u32, height: u32, elements: &[DrawElement]) {
    for element in elements {
        match element {
            DrawElement::Line {
                from,
                to,
                color,
                width: thickness,
            } => draw_line(buffer, width, height, *from, *to, *color, *thickness, None),
            DrawElement::DashedLine {
                from,
                to,
                color,
                width: thickness,
                dash,
                gap,
            } => draw_line(
                buffer,
                width,
                height,
                *from,
                *to,
                *color,
                *thickness,
                Some((
                    (dash.clamp(1.0, MAX_DASH) as i64).max(1),
                    gap.clamp(0.0, MAX_DASH) as i64,
                )),
            ),
            DrawElement::Circle {
                center,
                radius,
                color,
            } => draw_circle(buffer, width, height, *center, *radius, *color),
        }
    }
}

/// Clips the segment `p0 -> p1` to `[min, max]` on both axes (Liang-Barsky).
/// Returns the clipped endpoints and the parameter of the new start point.
fn clip_segment(p0: (f64, f64), p1: (f64, f64), min: (f64, f64), max: (f64, f64)) -> Option<((f64, f64), (f64, f64), f64)> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    let edges = [
        (-dx, p0.0 - min.0),
        (dx, max.0 - p0.0),
        (-dy, p0.1 - min.1),
        (dy, max.1 - p0.1),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        (p0.0 + t0 * dx, p0.1 + t0 * dy),
        (p0.0 + t1 * dx, p0.1 + t1 * dy),
        t0,
    ))
}

#[allow(clippy::too_many_arguments)]
fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: (f32, f32),
    p1: (f32, f32),
    color: Color,
    thickness: f32,
    pattern: Option<(i64, i64)>,
) {
    let coords = [p0.0, p0.1, p1.0, p1.1];
    if coords.iter().any(|c| !c.is_finite()) {
        return;
    }
    let radius = ((thickness.max(1.0) as i64).min(MAX_THICKNESS) - 1) / 2;
    let margin = radius as f64 + 1.0;
    let p0 = (p0.0 as f64, p0.1 as f64);
    let p1 = (p1.0 as f64, p1.1 as f64);
    // Anything outside the buffer plus the pen radius can never be drawn.
    let Some((start, end, t0)) = clip_segment(
        p0,
        p1,
        (-margin, -margin),
        (width as f64 + margin, height as f64 + margin),
    ) else {
        return;
    };

    let (mut x0, mut y0) = (start.0 as i64, start.1 as i64);
    let (x1, y1) = (end.0 as i64, end.1 as i64);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    // Keep the dash phase anchored at the unclipped start.
    let full_span = (p1.0 - p0.0).abs().max((p1.1 - p0.1).abs());
    let mut step = match pattern {
        Some((dash, gap)) => ((t0 * full_span) % (dash + gap) as f64) as i64,
        None => 0,
    };

    loop {
        let visible = match pattern {
            Some((dash, gap)) => step % (dash + gap) < dash,
            None => true,
        };
        if visible {
            put_pixel_safe(buffer, width, height, x0, y0, color);
            for ox in -radius..=radius {
                for oy in -radius..=radius {
                    if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                        put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                    }
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
        step += 1;
    }
}

fn draw_circle(buffer: &mut [u8], width: u32, height: u32, center: (f32, f32), radius: f32, color: Color) {
    if !center.0.is_finite() || !center.1.is_finite() || !radius.is_finite() {
        return;
    }
    let radius = (radius.round() as i64).clamp(0, MAX_RADIUS);
    let (cx, cy) = (center.0 as f64, center.1 as f64);
    let reach = radius as f64 + 1.0;
    if cx < -reach || cy < -reach || cx > width as f64 + reach || cy > height as f64 + reach {
        return;
    }
    let (cx, cy) = (cx as i64, cy as i64);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i64, y: i64, color: Color) {
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return;
    }
    let idx = (y as usize * width as usize + x as usize) * 4;
    if idx + 3 < buffer.len() {
        buffer[idx..idx + 4].copy_from_slice(&color);
    }
}
