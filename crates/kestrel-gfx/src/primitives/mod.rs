//! Shape drawing on top of the [`BatchRenderer`].
//!
//! [`Primitives`] carries a current color, fill mode, blend mode and line
//! width, applied to every shape until changed. Shapes are appended to the
//! batch passed in; with `force_draw` set each shape is flushed right away.

mod shapes;

pub use shapes::{Polygon, Quad, Triangle};

use std::sync::OnceLock;

use crate::batch::BatchRenderer;
use crate::coords::{Rect, Vec2};
use crate::gl::{FillMode, GlContext, NativeGl};
use crate::paint::{BlendMode, Color};

/// Segment count of the cached unit circle.
pub const DEFAULT_CIRCLE_SEGMENTS: u32 = 24;
pub const MIN_ARC_SEGMENTS: u32 = 6;
pub const MAX_ARC_SEGMENTS: u32 = 360;

/// Points on the unit circle, counter-clockwise from angle 0. No closing point.
pub fn unit_circle() -> &'static [Vec2] {
    static UNIT_CIRCLE: OnceLock<Vec<Vec2>> = OnceLock::new();
    UNIT_CIRCLE.get_or_init(|| {
        (0..DEFAULT_CIRCLE_SEGMENTS)
            .map(|i| {
                let a = (i as f32 * 360.0 / DEFAULT_CIRCLE_SEGMENTS as f32).to_radians();
                Vec2::new(a.cos(), a.sin())
            })
            .collect()
    })
}

#[derive(Debug, Clone)]
pub struct Primitives {
    pub color: Color,
    pub fill: FillMode,
    pub blend: BlendMode,
    pub line_width: f32,
    /// Flush the batch after every shape instead of leaving it to the batch's
    /// own `force_draw` policy.
    pub force_draw: bool,
}

impl Default for Primitives {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            fill: FillMode::Fill,
            blend: BlendMode::Alpha,
            line_width: 1.0,
            force_draw: true,
        }
    }
}

/// Corner a vertex falls in relative to `center`, for per-corner coloring:
/// top-left, bottom-left, bottom-right, top-right.
fn corner_color(p: Vec2, center: Vec2, colors: &[Color; 4]) -> Color {
    match (p.x <= center.x, p.y <= center.y) {
        (true, true) => colors[0],
        (true, false) => colors[1],
        (false, false) => colors[2],
        (false, true) => colors[3],
    }
}

impl Primitives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_fill_mode(&mut self, fill: FillMode) {
        self.fill = fill;
    }

    pub fn set_blend_mode(&mut self, blend: BlendMode) {
        self.blend = blend;
    }

    pub fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    /// Sets force-draw; turning it on flushes whatever is pending.
    pub fn set_force_draw<N: NativeGl>(&mut self, gl: &mut GlContext<N>, batch: &mut BatchRenderer, force: bool) {
        self.force_draw = force;
        if force {
            batch.draw(gl);
        }
    }

    fn prepare<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer) {
        batch.set_texture(gl, None);
        batch.set_blend_mode(gl, self.blend);
    }

    fn finish<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer) {
        if self.force_draw {
            batch.draw(gl);
        } else {
            batch.draw_opt(gl);
        }
    }

    /// Closed outline through `points`, one color per point.
    fn outline<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer, points: &[(Vec2, Color)]) {
        batch.set_line_width(gl, self.line_width);
        batch.line_loop_begin(gl);
        for (p, c) in points {
            batch.set_color(*c);
            batch.batch_line_loop(gl, *p);
        }
    }

    // ── points and lines ──────────────────────────────────────────────────

    pub fn draw_point<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer, p: Vec2, size: f32) {
        self.prepare(gl, batch);
        batch.set_point_size(gl, size);
        batch.points_begin(gl);
        batch.set_color(self.color);
        batch.batch_point(gl, p.x, p.y);
        self.finish(gl, batch);
    }

    pub fn draw_line<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer, a: Vec2, b: Vec2) {
        self.prepare(gl, batch);
        batch.set_line_width(gl, self.line_width);
        batch.lines_begin(gl);
        batch.set_color(self.color);
        batch.batch_line(gl, a, b);
        self.finish(gl, batch);
    }

    // ── circles and arcs ──────────────────────────────────────────────────

    /// Circle with the cached unit circle when `segments` is `None`.
    pub fn draw_circle<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        center: Vec2,
        radius: f32,
        segments: Option<u32>,
    ) {
        if let Some(segments) = segments {
            self.draw_arc(gl, batch, center, radius, segments, 360.0, 0.0);
            return;
        }

        self.prepare(gl, batch);
        let rim = unit_circle().iter().map(|u| center + *u * radius);
        match self.fill {
            FillMode::Fill => {
                batch.triangle_fan_begin(gl);
                batch.set_color(self.color);
                batch.batch_triangle_fan(gl, center);
                for p in rim {
                    batch.batch_triangle_fan(gl, p);
                }
                batch.batch_triangle_fan(gl, center + unit_circle()[0] * radius);
            }
            FillMode::Line => {
                let points: Vec<_> = rim.map(|p| (p, self.color)).collect();
                self.outline(gl, batch, &points);
            }
        }
        self.finish(gl, batch);
    }

    /// Arc of `arc_angle` degrees starting at `start_angle`, at most one full
    /// turn either way. `segments` is the count for a full circle, clamped to
    /// 6..=360.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_arc<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        center: Vec2,
        radius: f32,
        segments: u32,
        arc_angle: f32,
        start_angle: f32,
    ) {
        let segments = segments.clamp(MIN_ARC_SEGMENTS, MAX_ARC_SEGMENTS);
        let arc = arc_angle.clamp(-360.0, 360.0);
        if arc == 0.0 || arc.is_nan() {
            return;
        }
        let steps = ((segments as f32 * arc.abs() / 360.0).ceil() as u32).max(1);
        let rim = (0..=steps).map(|i| {
            let a = (start_angle + arc * i as f32 / steps as f32).to_radians();
            center + Vec2::new(a.cos(), a.sin()) * radius
        });

        self.prepare(gl, batch);
        match self.fill {
            FillMode::Fill => {
                batch.triangle_fan_begin(gl);
                batch.set_color(self.color);
                batch.batch_triangle_fan(gl, center);
                for p in rim {
                    batch.batch_triangle_fan(gl, p);
                }
            }
            FillMode::Line => {
                batch.set_line_width(gl, self.line_width);
                batch.line_strip_begin(gl);
                batch.set_color(self.color);
                for p in rim {
                    batch.batch_line_strip(gl, p);
                }
            }
        }
        self.finish(gl, batch);
    }

    // ── triangles ─────────────────────────────────────────────────────────

    pub fn draw_triangle<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer, t: Triangle) {
        self.draw_triangle_colors(gl, batch, t, [self.color; 3]);
    }

    /// Triangle with one color per corner.
    pub fn draw_triangle_colors<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        t: Triangle,
        colors: [Color; 3],
    ) {
        self.prepare(gl, batch);
        match self.fill {
            FillMode::Fill => {
                batch.triangles_begin(gl);
                batch.set_color_free(&colors);
                let [a, b, c] = t.0;
                batch.batch_triangle(gl, a, b, c);
            }
            FillMode::Line => {
                let points: Vec<_> = t.0.into_iter().zip(colors).collect();
                self.outline(gl, batch, &points);
            }
        }
        self.finish(gl, batch);
    }

    // ── rectangles ────────────────────────────────────────────────────────

    /// Rectangle rotated by `angle` degrees and scaled about its center.
    pub fn draw_rectangle<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        r: Rect,
        angle: f32,
        scale: Vec2,
    ) {
        self.draw_rectangle_colors(gl, batch, r, [self.color; 4], angle, scale);
    }

    /// Rectangle with corner colors top-left, bottom-left, bottom-right,
    /// top-right.
    pub fn draw_rectangle_colors<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        r: Rect,
        colors: [Color; 4],
        angle: f32,
        scale: Vec2,
    ) {
        self.prepare(gl, batch);
        match self.fill {
            FillMode::Fill => {
                batch.quads_begin(gl);
                batch.set_color_free(&colors);
                batch.batch_quad_ex(gl, r.origin.x, r.origin.y, r.size.x, r.size.y, angle, scale, None);
            }
            FillMode::Line => {
                let q = Quad::from_rect(r);
                let center = q.center();
                let points: Vec<_> = q
                    .0
                    .into_iter()
                    .map(|p| p.scaled_around(center, scale).rotated_around(center, angle))
                    .zip(colors)
                    .collect();
                self.outline(gl, batch, &points);
            }
        }
        self.finish(gl, batch);
    }

    pub fn draw_rounded_rectangle<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        r: Rect,
        radius: f32,
        corner_segments: u32,
    ) {
        self.draw_rounded_rectangle_colors(gl, batch, r, radius, corner_segments, [self.color; 4], 0.0, Vec2::splat(1.0));
    }

    /// Rounded rectangle with per-corner colors, rotated and scaled about its
    /// center. Each rounded corner is split into `corner_segments` steps.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_rounded_rectangle_colors<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        r: Rect,
        radius: f32,
        corner_segments: u32,
        colors: [Color; 4],
        angle: f32,
        scale: Vec2,
    ) {
        let mut poly = Polygon::rounded_rectangle(r, radius, corner_segments);
        let center = Vec2::new(r.origin.x + r.size.x * 0.5, r.origin.y + r.size.y * 0.5);
        // Corner colors are picked before the rotation moves points across quadrants.
        let shaded: Vec<Color> = poly.points.iter().map(|p| corner_color(*p, center, &colors)).collect();
        poly.scale(scale, center);
        poly.rotate(angle, center);

        self.prepare(gl, batch);
        match self.fill {
            FillMode::Fill => {
                batch.polygon_begin(gl);
                if colors.iter().all(|c| *c == colors[0]) {
                    batch.set_color(colors[0]);
                    batch.batch_polygon(gl, &poly.points);
                } else {
                    for (p, c) in poly.points.iter().zip(&shaded) {
                        batch.set_color(*c);
                        batch.batch_polygon_by_point(gl, *p);
                    }
                }
            }
            FillMode::Line => {
                let points: Vec<_> = poly.points.into_iter().zip(shaded).collect();
                self.outline(gl, batch, &points);
            }
        }
        self.finish(gl, batch);
    }

    // ── quads and polygons ────────────────────────────────────────────────

    pub fn draw_quad<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer, q: Quad, offset: Vec2) {
        self.draw_quad_colors(gl, batch, q, [self.color; 4], offset);
    }

    pub fn draw_quad_colors<N: NativeGl>(
        &self,
        gl: &mut GlContext<N>,
        batch: &mut BatchRenderer,
        q: Quad,
        colors: [Color; 4],
        offset: Vec2,
    ) {
        let q = q.translated(offset);
        self.prepare(gl, batch);
        match self.fill {
            FillMode::Fill => {
                batch.quads_begin(gl);
                batch.set_color_free(&colors);
                batch.batch_quad_free(gl, q.0);
            }
            FillMode::Line => {
                let points: Vec<_> = q.0.into_iter().zip(colors).collect();
                self.outline(gl, batch, &points);
            }
        }
        self.finish(gl, batch);
    }

    pub fn draw_polygon<N: NativeGl>(&self, gl: &mut GlContext<N>, batch: &mut BatchRenderer, poly: &Polygon) {
        if poly.len() < 3 {
            return;
        }
        self.prepare(gl, batch);
        match self.fill {
            FillMode::Fill => {
                batch.polygon_begin(gl);
                batch.set_color(self.color);
                batch.batch_polygon(gl, &poly.points);
            }
            FillMode::Line => {
                let points: Vec<_> = poly.points.iter().map(|p| (*p, self.color)).collect();
                self.outline(gl, batch, &points);
            }
        }
        self.finish(gl, batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchConfig;
    use crate::coords::Viewport;
    use crate::gl::{GlConfig, PrimitiveType};
    use crate::headless::HeadlessGl;

    fn setup(native: HeadlessGl) -> (GlContext<HeadlessGl>, BatchRenderer) {
        let mut gl = GlContext::new(native, GlConfig::default());
        gl.set_ortho_2d(Viewport::new(16.0, 16.0));
        (gl, BatchRenderer::new(BatchConfig { force_draw: false, ..BatchConfig::default() }))
    }

    const RED: [u8; 4] = [255, 0, 0, 255];
    const CLEAR: [u8; 4] = [0, 0, 0, 0];

    // ── unit circle ───────────────────────────────────────────────────────

    #[test]
    fn unit_circle_is_cached() {
        let a = unit_circle();
        assert_eq!(a.len(), DEFAULT_CIRCLE_SEGMENTS as usize);
        assert!(std::ptr::eq(a, unit_circle()));
        assert!(a.iter().all(|p| (p.length() - 1.0).abs() < 1e-5));
    }

    // ── fills ─────────────────────────────────────────────────────────────

    #[test]
    fn filled_circle_covers_center_not_corners() {
        for native in [HeadlessGl::legacy(16, 16), HeadlessGl::core(16, 16)] {
            let (mut gl, mut batch) = setup(native);
            let mut prims = Primitives::new();
            prims.set_color(Color::RED);
            prims.draw_circle(&mut gl, &mut batch, Vec2::new(8.0, 8.0), 6.0, None);
            assert_eq!(gl.native().pixel(8, 8), RED);
            assert_eq!(gl.native().pixel(0, 0), CLEAR);
            assert_eq!(batch.pending_vertices(), 0);
        }
    }

    #[test]
    fn arc_segments_are_clamped() {
        let (mut gl, mut batch) = setup(HeadlessGl::legacy(16, 16));
        let prims = Primitives { force_draw: false, ..Primitives::new() };
        prims.draw_arc(&mut gl, &mut batch, Vec2::new(8.0, 8.0), 4.0, 2, 360.0, 0.0);
        // Hub plus 6 steps plus the closing point.
        assert_eq!(batch.pending_vertices(), 1 + 6 + 1);
        prims.draw_arc(&mut gl, &mut batch, Vec2::new(8.0, 8.0), 4.0, 10_000, 90.0, 0.0);
        assert_eq!(batch.pending_vertices(), 1 + 90 + 1);
    }

    #[test]
    fn arc_sweep_saturates_at_a_full_turn() {
        let (mut gl, mut batch) = setup(HeadlessGl::legacy(16, 16));
        let prims = Primitives { force_draw: false, ..Primitives::new() };
        for sweep in [720.0, -1000.0] {
            prims.draw_arc(&mut gl, &mut batch, Vec2::new(8.0, 8.0), 4.0, 12, sweep, 0.0);
            assert_eq!(batch.pending_vertices(), 1 + 12 + 1, "sweep {sweep}");
        }
    }

    #[test]
    fn rectangle_fill_and_outline() {
        let (mut gl, mut batch) = setup(HeadlessGl::core(16, 16));
        let mut prims = Primitives::new();
        prims.set_color(Color::RED);
        prims.draw_rectangle(&mut gl, &mut batch, Rect::new(2.0, 2.0, 8.0, 8.0), 0.0, Vec2::splat(1.0));
        assert_eq!(gl.native().pixel(5, 5), RED);

        prims.set_fill_mode(FillMode::Line);
        prims.set_color(Color::BLUE);
        prims.draw_rectangle(&mut gl, &mut batch, Rect::new(0.0, 0.0, 12.0, 12.0), 0.0, Vec2::splat(1.0));
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::LineLoop, 4)));
        assert_eq!(gl.native().pixel(5, 5), RED);
    }

    #[test]
    fn rounded_rectangle_is_one_polygon() {
        let (mut gl, mut batch) = setup(HeadlessGl::mobile(16, 16));
        let mut prims = Primitives::new();
        prims.set_color(Color::RED);
        prims.draw_rounded_rectangle(&mut gl, &mut batch, Rect::new(0.0, 0.0, 16.0, 16.0), 4.0, 3);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::TriangleFan, 16)));
        assert_eq!(gl.native().pixel(8, 8), RED);
        assert_eq!(gl.native().pixel(0, 0), CLEAR);
    }

    #[test]
    fn triangle_corner_colors() {
        let (mut gl, mut batch) = setup(HeadlessGl::legacy(16, 16));
        let prims = Primitives { force_draw: false, ..Primitives::new() };
        let t = Triangle::new(Vec2::zero(), Vec2::new(0.0, 16.0), Vec2::new(16.0, 0.0));
        prims.draw_triangle_colors(&mut gl, &mut batch, t, [Color::RED, Color::GREEN, Color::BLUE]);
        let v = batch.vertices();
        assert_eq!([v[0].color, v[1].color, v[2].color], [Color::RED, Color::GREEN, Color::BLUE]);
    }

    // ── batching ──────────────────────────────────────────────────────────

    #[test]
    fn quads_accumulate_without_force_draw() {
        let (mut gl, mut batch) = setup(HeadlessGl::core(16, 16));
        let mut prims = Primitives::new();
        prims.set_force_draw(&mut gl, &mut batch, false);
        for i in 0..4 {
            let q = Quad::from_rect(Rect::new(i as f32 * 4.0, 0.0, 4.0, 4.0));
            prims.draw_quad(&mut gl, &mut batch, q, Vec2::zero());
        }
        assert_eq!(batch.flush_count(), 0);
        assert_eq!(batch.pending_vertices(), 24);

        prims.set_force_draw(&mut gl, &mut batch, true);
        assert_eq!(batch.flush_count(), 1);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Triangles, 24)));
    }

    #[test]
    fn outlines_never_merge() {
        let (mut gl, mut batch) = setup(HeadlessGl::legacy(16, 16));
        let prims = Primitives { fill: FillMode::Line, force_draw: false, ..Primitives::new() };
        let poly = Polygon::from_rect(Rect::new(1.0, 1.0, 4.0, 4.0));
        prims.draw_polygon(&mut gl, &mut batch, &poly);
        prims.draw_polygon(&mut gl, &mut batch, &poly);
        assert_eq!(batch.flush_count(), 1);
        assert_eq!(batch.pending_vertices(), 4);
    }

    #[test]
    fn line_width_reaches_context() {
        let (mut gl, mut batch) = setup(HeadlessGl::legacy(16, 16));
        let mut prims = Primitives::new();
        prims.set_line_width(3.0);
        prims.draw_line(&mut gl, &mut batch, Vec2::zero(), Vec2::splat(10.0));
        assert_eq!(gl.native().current_line_width(), 3.0);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Lines, 2)));
    }
}
