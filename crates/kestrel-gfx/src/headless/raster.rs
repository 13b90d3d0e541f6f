//! Scanline-free rasterization with edge functions.
//!
//! Coordinates are GL window coordinates: origin bottom-left, pixel centers
//! at `n + 0.5`. The framebuffer stores rows top-down.

use crate::gl::{BlendEquation, BlendFactor};

/// A vertex after transformation, ready for rasterization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct RasterVertex {
    pub win: [f32; 2],
    pub color: [f32; 4],
    /// Eye-space position, interpolated for user clip planes.
    pub eye: [f32; 4],
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct BlendSetup {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub eq_rgb: BlendEquation,
    pub eq_alpha: BlendEquation,
}

impl Default for BlendSetup {
    fn default() -> Self {
        Self {
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            eq_rgb: BlendEquation::Add,
            eq_alpha: BlendEquation::Add,
        }
    }
}

impl BlendSetup {
    fn apply(&self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        let sf = factor(self.src_rgb, src, dst);
        let df = factor(self.dst_rgb, src, dst);
        let sa = factor(self.src_alpha, src, dst)[3];
        let da = factor(self.dst_alpha, src, dst)[3];

        let mut out = [0.0; 4];
        for c in 0..3 {
            out[c] = equation(self.eq_rgb, src[c], dst[c], sf[c], df[c]);
        }
        out[3] = equation(self.eq_alpha, src[3], dst[3], sa, da);
        out
    }
}

fn factor(f: BlendFactor, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let inv = |v: [f32; 4]| v.map(|c| 1.0 - c);
    match f {
        BlendFactor::Zero => [0.0; 4],
        BlendFactor::One => [1.0; 4],
        BlendFactor::SrcColor => src,
        BlendFactor::OneMinusSrcColor => inv(src),
        BlendFactor::DstColor => dst,
        BlendFactor::OneMinusDstColor => inv(dst),
        BlendFactor::SrcAlpha => [src[3]; 4],
        BlendFactor::OneMinusSrcAlpha => [1.0 - src[3]; 4],
        BlendFactor::DstAlpha => [dst[3]; 4],
        BlendFactor::OneMinusDstAlpha => [1.0 - dst[3]; 4],
    }
}

fn equation(eq: BlendEquation, s: f32, d: f32, sf: f32, df: f32) -> f32 {
    match eq {
        BlendEquation::Add => s * sf + d * df,
        BlendEquation::Subtract => s * sf - d * df,
        BlendEquation::ReverseSubtract => d * df - s * sf,
        // Min/max ignore the factors.
        BlendEquation::Min => s.min(d),
        BlendEquation::Max => s.max(d),
    }
}

/// Per-draw fragment state.
#[derive(Debug, Clone, Default)]
pub(crate) struct RasterState {
    pub blend: Option<BlendSetup>,
    /// `[x, y, width, height]` in window coordinates.
    pub scissor: Option<[i32; 4]>,
    /// Enabled eye-space planes; fragments with `dot(plane, eye) < 0` are dropped.
    pub clip_planes: Vec<[f32; 4]>,
    pub point_size: f32,
}

#[derive(Debug, Clone)]
pub(crate) struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0; 4]; width as usize * height as usize],
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel at `(x, y)` with a top-left origin; transparent black outside.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn clear(&mut self, color: [f32; 4], scissor: Option<[i32; 4]>) {
        let c = to_u8(color);
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if scissor.is_some_and(|s| !in_rect(s, x, y)) {
                    continue;
                }
                let idx = self.index(x, y);
                self.pixels[idx] = c;
            }
        }
    }

    /// Index of window pixel `(x, y)` (bottom-left origin).
    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        let row = self.height as i32 - 1 - y;
        (row * self.width as i32 + x) as usize
    }

    fn shade(&mut self, st: &RasterState, x: i32, y: i32, color: [f32; 4], eye: [f32; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        if st.scissor.is_some_and(|s| !in_rect(s, x, y)) {
            return;
        }
        if st.clip_planes.iter().any(|p| dot(*p, eye) < 0.0) {
            return;
        }

        let idx = self.index(x, y);
        let out = match &st.blend {
            Some(b) => b.apply(color, to_f32(self.pixels[idx])),
            None => color,
        };
        self.pixels[idx] = to_u8(out);
    }

    pub fn triangle(&mut self, st: &RasterState, a: &RasterVertex, b: &RasterVertex, c: &RasterVertex) {
        let area = edge(a.win, b.win, c.win);
        if area.abs() < 1e-9 || !area.is_finite() {
            return;
        }
        // Normalize to counter-clockwise so the inside test is uniform.
        let (b, c) = if area < 0.0 { (c, b) } else { (b, c) };
        let area = area.abs();

        let xs = [a.win[0], b.win[0], c.win[0]];
        let ys = [a.win[1], b.win[1], c.win[1]];
        let min_x = xs.iter().copied().fold(f32::INFINITY, f32::min).floor().max(0.0) as i32;
        let max_x = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil().min(self.width as f32) as i32;
        let min_y = ys.iter().copied().fold(f32::INFINITY, f32::min).floor().max(0.0) as i32;
        let max_y = ys.iter().copied().fold(f32::NEG_INFINITY, f32::max).ceil().min(self.height as f32) as i32;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = [x as f32 + 0.5, y as f32 + 0.5];
                let w0 = edge(b.win, c.win, p);
                let w1 = edge(c.win, a.win, p);
                let w2 = edge(a.win, b.win, p);
                if !covers(w0, b.win, c.win) || !covers(w1, c.win, a.win) || !covers(w2, a.win, b.win) {
                    continue;
                }
                let l = [w0 / area, w1 / area, w2 / area];
                let color = lerp3(a.color, b.color, c.color, l);
                let eye = lerp3(a.eye, b.eye, c.eye, l);
                self.shade(st, x, y, color, eye);
            }
        }
    }

    /// One-pixel line, last pixel excluded.
    pub fn line(&mut self, st: &RasterState, a: &RasterVertex, b: &RasterVertex) {
        let dx = b.win[0] - a.win[0];
        let dy = b.win[1] - a.win[1];
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..steps {
            let t = (i as f32 + 0.5) / steps as f32;
            let x = (a.win[0] + dx * t).floor() as i32;
            let y = (a.win[1] + dy * t).floor() as i32;
            let color = lerp(a.color, b.color, t);
            let eye = lerp(a.eye, b.eye, t);
            self.shade(st, x, y, color, eye);
        }
    }

    /// Square point of `st.point_size` pixels.
    pub fn point(&mut self, st: &RasterState, v: &RasterVertex) {
        let size = st.point_size.max(1.0).round() as i32;
        let x0 = (v.win[0] - size as f32 * 0.5).round() as i32;
        let y0 = (v.win[1] - size as f32 * 0.5).round() as i32;
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                self.shade(st, x, y, v.color, v.eye);
            }
        }
    }
}

#[inline]
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Top-left fill rule for a counter-clockwise triangle in y-up coordinates,
/// so pixels on a shared edge are drawn once.
#[inline]
fn covers(w: f32, from: [f32; 2], to: [f32; 2]) -> bool {
    if w > 0.0 {
        return true;
    }
    let top = from[1] == to[1] && to[0] < from[0];
    let left = to[1] < from[1];
    w == 0.0 && (top || left)
}

#[inline]
fn in_rect(r: [i32; 4], x: i32, y: i32) -> bool {
    x >= r[0] && y >= r[1] && x < r[0] + r[2] && y < r[1] + r[3]
}

#[inline]
fn dot(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

fn lerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

fn lerp3(a: [f32; 4], b: [f32; 4], c: [f32; 4], l: [f32; 3]) -> [f32; 4] {
    std::array::from_fn(|i| a[i] * l[0] + b[i] * l[1] + c[i] * l[2])
}

fn to_u8(c: [f32; 4]) -> [u8; 4] {
    c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn to_f32(c: [u8; 4]) -> [f32; 4] {
    c.map(|v| v as f32 / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32, color: [f32; 4]) -> RasterVertex {
        RasterVertex {
            win: [x, y],
            color,
            eye: [x, y, 0.0, 1.0],
        }
    }

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

    #[test]
    fn triangle_covers_interior_only() {
        let mut fb = Framebuffer::new(8, 8);
        let st = RasterState::default();
        fb.triangle(&st, &v(0.0, 0.0, RED), &v(8.0, 0.0, RED), &v(0.0, 8.0, RED));
        // Bottom-left of the window is the last row.
        assert_eq!(fb.pixel(0, 7), [255, 0, 0, 255]);
        assert_eq!(fb.pixel(7, 0), [0; 4]);
    }

    #[test]
    fn shared_edge_is_drawn_once() {
        let mut fb = Framebuffer::new(4, 4);
        let st = RasterState {
            blend: Some(BlendSetup {
                dst_rgb: BlendFactor::One,
                dst_alpha: BlendFactor::One,
                ..BlendSetup::default()
            }),
            ..RasterState::default()
        };
        let half = [0.25, 0.0, 0.0, 0.25];
        let (a, b, c, d) = (v(0.0, 0.0, half), v(4.0, 0.0, half), v(4.0, 4.0, half), v(0.0, 4.0, half));
        fb.triangle(&st, &a, &b, &c);
        fb.triangle(&st, &a, &c, &d);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(fb.pixel(x, y), [64, 0, 0, 64], "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn clip_planes_and_scissor_discard() {
        let mut fb = Framebuffer::new(8, 8);
        let st = RasterState {
            clip_planes: vec![[1.0, 0.0, 0.0, -4.0]],
            scissor: Some([0, 0, 8, 4]),
            ..RasterState::default()
        };
        fb.triangle(&st, &v(0.0, 0.0, RED), &v(16.0, 0.0, RED), &v(0.0, 16.0, RED));
        assert_eq!(fb.pixel(2, 7), [0; 4]);
        assert_eq!(fb.pixel(5, 7), [255, 0, 0, 255]);
        assert_eq!(fb.pixel(5, 2), [0; 4]);
    }

    #[test]
    fn alpha_blend_over_white() {
        let mut fb = Framebuffer::new(1, 1);
        fb.clear([1.0; 4], None);
        let st = RasterState {
            blend: Some(BlendSetup {
                src_rgb: BlendFactor::SrcAlpha,
                dst_rgb: BlendFactor::OneMinusSrcAlpha,
                ..BlendSetup::default()
            }),
            point_size: 1.0,
            ..RasterState::default()
        };
        fb.point(&st, &v(0.5, 0.5, [0.0, 0.0, 0.0, 0.5]));
        assert_eq!(fb.pixel(0, 0)[0], 128);
    }

    #[test]
    fn horizontal_line_excludes_last_pixel() {
        let mut fb = Framebuffer::new(8, 1);
        let st = RasterState::default();
        fb.line(&st, &v(0.0, 0.5, RED), &v(4.0, 0.5, RED));
        assert_eq!(fb.pixel(3, 0), [255, 0, 0, 255]);
        assert_eq!(fb.pixel(4, 0), [0; 4]);
    }
}
