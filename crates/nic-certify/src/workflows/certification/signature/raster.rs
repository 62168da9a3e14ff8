use serde::{Deserialize, Serialize};

/// Pointer position on the signing surface, in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Ink color for rendered strokes.
const INK: [u8; 3] = [0x11, 0x18, 0x27];
const BACKGROUND: u8 = 0xFF;
const MAX_SEGMENT_STEPS: f32 = 65_536.0;

/// Stroke coverage layer, one alpha byte per pixel.
pub(crate) struct StrokeLayer {
    width: u32,
    height: u32,
    alpha: Vec<u8>,
}

impl StrokeLayer {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            alpha: vec![0; width as usize * height as usize],
        }
    }

    pub(crate) fn draw_stroke(&mut self, points: &[Point], pen_width: f32) {
        let radius = (pen_width / 2.0).max(0.5);
        match points {
            [] => {}
            [only] => self.stamp(*only, radius),
            _ => {
                for segment in points.windows(2) {
                    self.draw_segment(segment[0], segment[1], radius);
                }
            }
        }
    }

    fn draw_segment(&mut self, from: Point, to: Point, radius: f32) {
        let Some((from, to)) = self.clip_segment(from, to, radius + 1.0) else {
            return;
        };
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let length = (dx * dx + dy * dy).sqrt();
        let steps = (length / 0.5).ceil().clamp(1.0, MAX_SEGMENT_STEPS) as u32;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.stamp(Point::new(from.x + dx * t, from.y + dy * t), radius);
        }
    }

    /// Liang-Barsky clip against the surface grown by `reach` on every side.
    /// Returns `None` when no part of the segment can touch a pixel.
    fn clip_segment(&self, from: Point, to: Point, reach: f32) -> Option<(Point, Point)> {
        let finite = [from.x, from.y, to.x, to.y].iter().all(|v| v.is_finite());
        if !finite {
            return None;
        }
        // f64 keeps the clipped endpoints exact when the far end is huge.
        let (x0, y0) = (f64::from(from.x), f64::from(from.y));
        let dx = f64::from(to.x) - x0;
        let dy = f64::from(to.y) - y0;
        let reach = f64::from(reach);
        let bounds = [
            (-dx, x0 + reach),
            (dx, f64::from(self.width) + reach - x0),
            (-dy, y0 + reach),
            (dy, f64::from(self.height) + reach - y0),
        ];
        let (mut enter, mut exit) = (0.0f64, 1.0f64);
        for (p, q) in bounds {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                enter = enter.max(t);
            } else {
                exit = exit.min(t);
            }
            if enter > exit {
                return None;
            }
        }
        let at = |t: f64| Point::new((x0 + dx * t) as f32, (y0 + dy * t) as f32);
        Some((at(enter), at(exit)))
    }

    /// Anti-aliased round brush. Pixels off the surface are clipped.
    fn stamp(&mut self, center: Point, radius: f32) {
        if !center.x.is_finite() || !center.y.is_finite() {
            return;
        }
        let reach = radius + 1.0;
        let min_x = (center.x - reach).floor().max(0.0) as i64;
        let min_y = (center.y - reach).floor().max(0.0) as i64;
        let max_x = ((center.x + reach).ceil() as i64).min(self.width as i64 - 1);
        let max_y = ((center.y + reach).ceil() as i64).min(self.height as i64 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5 - center.x;
                let py = y as f32 + 0.5 - center.y;
                let distance = (px * px + py * py).sqrt();
                let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let index = y as usize * self.width as usize + x as usize;
                let value = (coverage * 255.0).round() as u8;
                if value > self.alpha[index] {
                    self.alpha[index] = value;
                }
            }
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.alpha.iter().all(|value| *value == 0)
    }

    /// Flatten the strokes onto an opaque white background as packed RGB.
    pub(crate) fn composite_on_white(&self) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.alpha.len() * 3);
        for alpha in &self.alpha {
            let a = u32::from(*alpha);
            for ink in INK {
                let blended = (u32::from(ink) * a + u32::from(BACKGROUND) * (255 - a) + 127) / 255;
                rgb.push(blended as u8);
            }
        }
        rgb
    }
}
