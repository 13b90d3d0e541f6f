use crate::coords::{Rect, Vec2};
use crate::gl::{
    AttribData, AttribPointer, Capability, ClientArray, ComponentType, FillMode, GlContext, MatrixMode, NativeGl,
    PrimitiveType, QUAD_TRIANGLE_ORDER,
};
use crate::paint::{BlendMode, Color};

use super::state::{exceeds_capacity, needs_flush, BatchState};
use super::vertex::BatchVertex;

/// Tuning for a [`BatchRenderer`].
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Vertices held before an implicit flush.
    pub max_vertices: usize,
    /// Flush at the end of every shape-level call.
    pub force_draw: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_vertices: 4096,
            force_draw: true,
        }
    }
}

/// Transform applied to a whole batch at flush time.
#[derive(Debug, Copy, Clone, PartialEq)]
struct BatchTransform {
    position: Vec2,
    rotation: f32,
    scale: Vec2,
    center: Vec2,
}

impl BatchTransform {
    const IDENTITY: BatchTransform = BatchTransform {
        position: Vec2::zero(),
        rotation: 0.0,
        scale: Vec2::splat(1.0),
        center: Vec2::zero(),
    };

    fn is_identity(&self) -> bool {
        self.rotation == 0.0 && self.scale == Vec2::splat(1.0) && self.position == Vec2::zero()
    }
}

const DEFAULT_TEX: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
];

/// Accumulates vertices from many call sites and submits them in as few draw
/// calls as the GL state allows.
///
/// Any change of texture, shader, blend mode, draw mode or fill mode flushes
/// the pending vertices first, so output order always matches call order.
/// The renderer owns no GL objects; every call that can flush takes the
/// context.
#[derive(Debug)]
pub struct BatchRenderer {
    config: BatchConfig,
    vertices: Vec<BatchVertex>,
    state: BatchState,
    transform: BatchTransform,

    /// Per-corner colors and texture coordinates for the next shape.
    colors: [Color; 4],
    tex: [Vec2; 4],

    line_width: f32,
    point_size: f32,
    flushes: usize,
    warned_overflow: bool,
}

impl Default for BatchRenderer {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl BatchRenderer {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            vertices: Vec::with_capacity(config.max_vertices),
            config,
            state: BatchState::default(),
            transform: BatchTransform::IDENTITY,
            colors: [Color::WHITE; 4],
            tex: DEFAULT_TEX,
            line_width: 1.0,
            point_size: 1.0,
            flushes: 0,
            warned_overflow: false,
        }
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    #[inline]
    pub fn pending_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[BatchVertex] {
        &self.vertices
    }

    /// Draw calls issued so far.
    #[inline]
    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn force_draw(&self) -> bool {
        self.config.force_draw
    }

    pub fn set_force_draw(&mut self, force: bool) {
        self.config.force_draw = force;
    }

    // ── state ─────────────────────────────────────────────────────────────

    fn change_state<N: NativeGl>(&mut self, gl: &mut GlContext<N>, requested: BatchState) {
        if needs_flush(&self.state, self.vertices.len(), &requested) {
            self.flush(gl);
        }
        self.state = requested;
    }

    /// Texture for subsequent vertices; `None` draws untextured.
    pub fn set_texture<N: NativeGl>(&mut self, gl: &mut GlContext<N>, texture: Option<u32>) {
        self.change_state(gl, BatchState { texture, ..self.state });
    }

    pub fn texture(&self) -> Option<u32> {
        self.state.texture
    }

    /// Program for subsequent vertices; `None` uses the default pipeline.
    pub fn set_shader<N: NativeGl>(&mut self, gl: &mut GlContext<N>, shader: Option<u32>) {
        self.change_state(gl, BatchState { shader, ..self.state });
    }

    pub fn set_blend_mode<N: NativeGl>(&mut self, gl: &mut GlContext<N>, blend: BlendMode) {
        self.change_state(gl, BatchState { blend, ..self.state });
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.state.blend
    }

    pub fn set_fill_mode<N: NativeGl>(&mut self, gl: &mut GlContext<N>, fill: FillMode) {
        self.change_state(gl, BatchState { fill, ..self.state });
    }

    pub fn fill_mode(&self) -> FillMode {
        self.state.fill
    }

    /// Switches the draw mode. A connected mode (strip, loop, fan, polygon)
    /// always starts a new draw call.
    pub fn set_draw_mode<N: NativeGl>(&mut self, gl: &mut GlContext<N>, mode: PrimitiveType) {
        if mode.is_connected() && !self.vertices.is_empty() {
            self.flush(gl);
        }
        self.change_state(gl, BatchState { mode, ..self.state });
    }

    pub fn draw_mode(&self) -> PrimitiveType {
        self.state.mode
    }

    pub fn set_line_width<N: NativeGl>(&mut self, gl: &mut GlContext<N>, width: f32) {
        if self.line_width != width {
            self.flush(gl);
            self.line_width = width;
        }
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn set_point_size<N: NativeGl>(&mut self, gl: &mut GlContext<N>, size: f32) {
        if self.point_size != size {
            self.flush(gl);
            self.point_size = size;
        }
    }

    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    // ── batch transform ───────────────────────────────────────────────────

    fn change_transform<N: NativeGl>(&mut self, gl: &mut GlContext<N>, t: BatchTransform) {
        if self.transform != t {
            self.flush(gl);
            self.transform = t;
        }
    }

    pub fn set_batch_position<N: NativeGl>(&mut self, gl: &mut GlContext<N>, position: Vec2) {
        self.change_transform(gl, BatchTransform { position, ..self.transform });
    }

    /// Rotation in degrees around the batch center.
    pub fn set_batch_rotation<N: NativeGl>(&mut self, gl: &mut GlContext<N>, rotation: f32) {
        self.change_transform(gl, BatchTransform { rotation, ..self.transform });
    }

    pub fn set_batch_scale<N: NativeGl>(&mut self, gl: &mut GlContext<N>, scale: Vec2) {
        self.change_transform(gl, BatchTransform { scale, ..self.transform });
    }

    pub fn set_batch_center<N: NativeGl>(&mut self, gl: &mut GlContext<N>, center: Vec2) {
        self.change_transform(gl, BatchTransform { center, ..self.transform });
    }

    pub fn batch_position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn batch_rotation(&self) -> f32 {
        self.transform.rotation
    }

    pub fn batch_scale(&self) -> Vec2 {
        self.transform.scale
    }

    pub fn batch_center(&self) -> Vec2 {
        self.transform.center
    }

    // ── per-corner attributes ─────────────────────────────────────────────

    /// Color for every corner of the next shapes.
    pub fn set_color(&mut self, color: Color) {
        self.colors = [color; 4];
    }

    /// Corner colors in perimeter order; missing corners keep their color.
    pub fn set_color_free(&mut self, colors: &[Color]) {
        for (slot, c) in self.colors.iter_mut().zip(colors) {
            *slot = *c;
        }
    }

    /// Axis-aligned texture rectangle for the next quads.
    pub fn set_tex_coord_rect(&mut self, r: Rect) {
        let (x0, y0) = (r.origin.x, r.origin.y);
        let (x1, y1) = (x0 + r.size.x, y0 + r.size.y);
        self.tex = [Vec2::new(x0, y0), Vec2::new(x0, y1), Vec2::new(x1, y1), Vec2::new(x1, y0)];
    }

    pub fn set_tex_coord_free(&mut self, coords: &[Vec2]) {
        for (slot, t) in self.tex.iter_mut().zip(coords) {
            *slot = *t;
        }
    }

    fn reset_attributes(&mut self) {
        self.colors = [Color::WHITE; 4];
        self.tex = DEFAULT_TEX;
    }

    // ── begin family ──────────────────────────────────────────────────────

    fn begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>, mode: PrimitiveType) {
        self.set_draw_mode(gl, mode);
        self.reset_attributes();
    }

    pub fn quads_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::Quads);
    }

    pub fn points_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::Points);
    }

    pub fn lines_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::Lines);
    }

    pub fn line_loop_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::LineLoop);
    }

    pub fn line_strip_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::LineStrip);
    }

    pub fn triangles_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::Triangles);
    }

    pub fn triangle_fan_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::TriangleFan);
    }

    pub fn polygon_begin<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.begin(gl, PrimitiveType::Polygon);
    }

    // ── appends ───────────────────────────────────────────────────────────

    /// Makes room for `n` vertices, flushing when the batch would pass its
    /// cap. Connected primitives can't be split, so they grow past it.
    fn reserve<N: NativeGl>(&mut self, gl: &mut GlContext<N>, n: usize) {
        if !exceeds_capacity(self.vertices.len(), n, self.config.max_vertices) {
            return;
        }
        if self.state.mode.is_connected() {
            if !self.warned_overflow {
                log::warn!(
                    "{:?} batch grew past {} vertices; connected primitives are not split",
                    self.state.mode,
                    self.config.max_vertices
                );
                self.warned_overflow = true;
            }
            return;
        }
        log::trace!("batch full ({} vertices); flushing", self.vertices.len());
        self.flush(gl);
    }

    /// Appends one vertex to the open batch as is.
    pub fn add_vertex<N: NativeGl>(&mut self, gl: &mut GlContext<N>, v: BatchVertex) {
        self.reserve(gl, 1);
        self.vertices.push(v);
    }

    /// Appends a vertex carrying the first corner's color and texture coordinate.
    pub fn add_point<N: NativeGl>(&mut self, gl: &mut GlContext<N>, pos: Vec2) {
        self.add_vertex(gl, BatchVertex::new(pos, self.tex[0], self.colors[0]));
    }

    /// Appends four corners in perimeter order; expanded to two triangles
    /// where quads aren't native.
    fn push_quad<N: NativeGl>(&mut self, gl: &mut GlContext<N>, corners: [Vec2; 4]) {
        self.set_draw_mode(gl, PrimitiveType::Quads);
        let quad: [BatchVertex; 4] = std::array::from_fn(|i| BatchVertex::new(corners[i], self.tex[i], self.colors[i]));
        if gl.quads_supported() {
            self.reserve(gl, 4);
            self.vertices.extend_from_slice(&quad);
        } else {
            self.reserve(gl, 6);
            self.vertices.extend(QUAD_TRIANGLE_ORDER.iter().map(|&i| quad[i]));
        }
    }

    /// Axis-aligned quad, corners counter-clockwise from the top-left.
    pub fn batch_quad<N: NativeGl>(&mut self, gl: &mut GlContext<N>, x: f32, y: f32, width: f32, height: f32) {
        let corners = [
            Vec2::new(x, y),
            Vec2::new(x, y + height),
            Vec2::new(x + width, y + height),
            Vec2::new(x + width, y),
        ];
        self.push_quad(gl, corners);
    }

    /// Quad rotated by `angle` degrees and scaled about `origin` (relative to
    /// the quad; its center when `None`).
    #[allow(clippy::too_many_arguments)]
    pub fn batch_quad_ex<N: NativeGl>(
        &mut self,
        gl: &mut GlContext<N>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        angle: f32,
        scale: Vec2,
        origin: Option<Vec2>,
    ) {
        let origin = Vec2::new(x, y) + origin.unwrap_or(Vec2::new(width * 0.5, height * 0.5));
        let corners = [
            Vec2::new(x, y),
            Vec2::new(x, y + height),
            Vec2::new(x + width, y + height),
            Vec2::new(x + width, y),
        ]
        .map(|p| p.scaled_around(origin, scale).rotated_around(origin, angle));
        self.push_quad(gl, corners);
    }

    /// Quad from four arbitrary corners in perimeter order.
    pub fn batch_quad_free<N: NativeGl>(&mut self, gl: &mut GlContext<N>, corners: [Vec2; 4]) {
        self.push_quad(gl, corners);
    }

    /// Free quad rotated and scaled about its centroid.
    pub fn batch_quad_free_ex<N: NativeGl>(&mut self, gl: &mut GlContext<N>, corners: [Vec2; 4], angle: f32, scale: f32) {
        let center = corners.iter().fold(Vec2::zero(), |acc, p| acc + *p) * 0.25;
        let corners = corners.map(|p| p.scaled_around(center, Vec2::splat(scale)).rotated_around(center, angle));
        self.push_quad(gl, corners);
    }

    pub fn batch_point<N: NativeGl>(&mut self, gl: &mut GlContext<N>, x: f32, y: f32) {
        self.set_draw_mode(gl, PrimitiveType::Points);
        self.add_point(gl, Vec2::new(x, y));
    }

    pub fn batch_line<N: NativeGl>(&mut self, gl: &mut GlContext<N>, a: Vec2, b: Vec2) {
        self.set_draw_mode(gl, PrimitiveType::Lines);
        self.reserve(gl, 2);
        self.vertices.push(BatchVertex::new(a, self.tex[0], self.colors[0]));
        self.vertices.push(BatchVertex::new(b, self.tex[1], self.colors[1]));
    }

    /// Next point of the open line loop (see [`line_loop_begin`](Self::line_loop_begin)).
    pub fn batch_line_loop<N: NativeGl>(&mut self, gl: &mut GlContext<N>, p: Vec2) {
        self.require_mode(gl, PrimitiveType::LineLoop);
        self.add_point(gl, p);
    }

    /// Next point of the open line strip.
    pub fn batch_line_strip<N: NativeGl>(&mut self, gl: &mut GlContext<N>, p: Vec2) {
        self.require_mode(gl, PrimitiveType::LineStrip);
        self.add_point(gl, p);
    }

    pub fn batch_triangle<N: NativeGl>(&mut self, gl: &mut GlContext<N>, a: Vec2, b: Vec2, c: Vec2) {
        self.set_draw_mode(gl, PrimitiveType::Triangles);
        self.reserve(gl, 3);
        for (i, p) in [a, b, c].into_iter().enumerate() {
            self.vertices.push(BatchVertex::new(p, self.tex[i], self.colors[i]));
        }
    }

    /// Next point of the open triangle fan; the first point is the hub.
    pub fn batch_triangle_fan<N: NativeGl>(&mut self, gl: &mut GlContext<N>, p: Vec2) {
        self.require_mode(gl, PrimitiveType::TriangleFan);
        self.add_point(gl, p);
    }

    /// Whole convex polygon as one primitive.
    pub fn batch_polygon<N: NativeGl>(&mut self, gl: &mut GlContext<N>, points: &[Vec2]) {
        if points.len() < 3 {
            return;
        }
        self.set_draw_mode(gl, PrimitiveType::Polygon);
        self.reserve(gl, points.len());
        let (tex, color) = (self.tex[0], self.colors[0]);
        self.vertices.extend(points.iter().map(|p| BatchVertex::new(*p, tex, color)));
    }

    /// Next point of the open polygon.
    pub fn batch_polygon_by_point<N: NativeGl>(&mut self, gl: &mut GlContext<N>, p: Vec2) {
        self.require_mode(gl, PrimitiveType::Polygon);
        self.add_point(gl, p);
    }

    /// By-point appends continue the open primitive; a different mode starts
    /// a new one.
    fn require_mode<N: NativeGl>(&mut self, gl: &mut GlContext<N>, mode: PrimitiveType) {
        if self.state.mode != mode {
            self.set_draw_mode(gl, mode);
        }
    }

    // ── submission ────────────────────────────────────────────────────────

    /// Flushes unconditionally.
    pub fn draw<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.flush(gl);
    }

    /// End of a shape-level call: flushes only when force-draw is on.
    pub fn draw_opt<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        if self.config.force_draw {
            self.flush(gl);
        }
    }

    fn flush<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        if self.vertices.is_empty() {
            return;
        }
        let count = self.vertices.len();
        let st = self.state;

        gl.set_blend_mode(st.blend);
        if gl.state().fill_mode != st.fill {
            gl.polygon_mode(st.fill);
        }
        gl.line_width(self.line_width);
        if gl.state().shader != st.shader {
            gl.set_shader(st.shader);
        }

        let sprite = st.mode == PrimitiveType::Points && st.texture.is_some();
        if st.mode == PrimitiveType::Points {
            gl.point_size(self.point_size);
        }
        if sprite {
            gl.enable(Capability::PointSprite);
        }

        let transformed = !self.transform.is_identity();
        if transformed {
            let t = self.transform;
            gl.matrix_mode(MatrixMode::ModelView);
            gl.push_matrix();
            gl.translate(t.position.x + t.center.x, t.position.y + t.center.y, 0.0);
            gl.rotate(t.rotation, 0.0, 0.0, 1.0);
            gl.scale(t.scale.x, t.scale.y, 1.0);
            gl.translate(-t.center.x, -t.center.y, 0.0);
        }

        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        let stream = |size: u8, ty: ComponentType, offset: usize| AttribPointer {
            size,
            ty,
            normalized: ty == ComponentType::U8,
            stride: BatchVertex::STRIDE,
            data: AttribData::Client(&bytes[offset..]),
        };

        gl.client_active_texture(0);
        match st.texture {
            Some(texture) => {
                gl.enable(Capability::Texture2D);
                gl.bind_texture(texture);
                gl.enable_client_state(ClientArray::TexCoord);
                gl.tex_coord_pointer(&stream(2, ComponentType::F32, BatchVertex::TEX_OFFSET));
            }
            None => {
                gl.disable(Capability::Texture2D);
                gl.disable_client_state(ClientArray::TexCoord);
            }
        }
        gl.enable_client_state(ClientArray::Vertex);
        gl.vertex_pointer(&stream(2, ComponentType::F32, 0));
        gl.enable_client_state(ClientArray::Color);
        gl.color_pointer(&stream(4, ComponentType::U8, BatchVertex::COLOR_OFFSET));

        // Quads were expanded to triangles at append time.
        let mode = match st.mode {
            PrimitiveType::Quads if !gl.quads_supported() => PrimitiveType::Triangles,
            m => m,
        };
        gl.draw_arrays(mode, 0, count);

        if transformed {
            gl.pop_matrix();
        }
        if sprite {
            gl.disable(Capability::PointSprite);
        }

        self.vertices.clear();
        self.flushes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::gl::GlConfig;
    use crate::headless::HeadlessGl;
    use crate::shader::{builtin, Dialect, ShaderProgram};

    fn ctx(native: HeadlessGl) -> GlContext<HeadlessGl> {
        let mut gl = GlContext::new(native, GlConfig::default());
        gl.set_ortho_2d(Viewport::new(8.0, 8.0));
        gl
    }

    fn accumulating() -> BatchRenderer {
        BatchRenderer::new(BatchConfig { force_draw: false, ..BatchConfig::default() })
    }

    // ── implicit flushing ─────────────────────────────────────────────────

    #[test]
    fn flush_count_matches_texture_transitions() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut batch = accumulating();
        let textures = [1, 1, 2, 2, 2, 1, 3, 3, 1, 1];
        let transitions = textures.windows(2).filter(|w| w[0] != w[1]).count();

        for (i, t) in textures.iter().enumerate() {
            batch.set_texture(&mut gl, Some(*t));
            batch.batch_quad(&mut gl, i as f32, 0.0, 1.0, 1.0);
        }
        assert_eq!(batch.flush_count(), transitions);
        batch.draw(&mut gl);
        assert_eq!(batch.flush_count(), transitions + 1);
        assert_eq!(gl.native().draw_count(), transitions + 1);
    }

    #[test]
    fn unchanged_state_accumulates() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = accumulating();
        for i in 0..10 {
            batch.set_blend_mode(&mut gl, BlendMode::Alpha);
            batch.batch_quad(&mut gl, i as f32, 0.0, 1.0, 1.0);
        }
        assert_eq!(batch.flush_count(), 0);
        assert_eq!(batch.pending_vertices(), 40);
        batch.draw(&mut gl);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Quads, 40)));
    }

    #[test]
    fn mode_change_flushes() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = accumulating();
        batch.batch_quad(&mut gl, 0.0, 0.0, 1.0, 1.0);
        batch.batch_line(&mut gl, Vec2::zero(), Vec2::splat(4.0));
        assert_eq!(batch.flush_count(), 1);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Quads, 4)));
    }

    #[test]
    fn empty_flush_is_free() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut batch = BatchRenderer::default();
        batch.set_texture(&mut gl, Some(4));
        batch.set_blend_mode(&mut gl, BlendMode::Add);
        batch.draw(&mut gl);
        assert_eq!(batch.flush_count(), 0);
        assert_eq!(gl.native().draw_count(), 0);
    }

    #[test]
    fn force_draw_flushes_each_shape() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut batch = BatchRenderer::default();
        for _ in 0..3 {
            batch.batch_quad(&mut gl, 0.0, 0.0, 2.0, 2.0);
            batch.draw_opt(&mut gl);
        }
        assert_eq!(batch.flush_count(), 3);

        batch.set_force_draw(false);
        for _ in 0..3 {
            batch.batch_quad(&mut gl, 0.0, 0.0, 2.0, 2.0);
            batch.draw_opt(&mut gl);
        }
        assert_eq!(batch.flush_count(), 3);
        assert_eq!(batch.pending_vertices(), 18);
    }

    // ── capacity ──────────────────────────────────────────────────────────

    #[test]
    fn capacity_forces_flush() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = BatchRenderer::new(BatchConfig { max_vertices: 8, force_draw: false });
        batch.batch_quad(&mut gl, 0.0, 0.0, 1.0, 1.0);
        batch.batch_quad(&mut gl, 1.0, 0.0, 1.0, 1.0);
        assert_eq!(batch.flush_count(), 0);
        batch.batch_quad(&mut gl, 2.0, 0.0, 1.0, 1.0);
        assert_eq!(batch.flush_count(), 1);
        assert_eq!(batch.pending_vertices(), 4);
    }

    #[test]
    fn connected_primitives_are_not_split() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = BatchRenderer::new(BatchConfig { max_vertices: 4, force_draw: false });
        batch.triangle_fan_begin(&mut gl);
        for i in 0..8 {
            batch.batch_triangle_fan(&mut gl, Vec2::new(i as f32, (i % 2) as f32));
        }
        assert_eq!(batch.flush_count(), 0);
        assert_eq!(batch.pending_vertices(), 8);
    }

    #[test]
    fn new_connected_primitive_starts_new_draw() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = accumulating();
        batch.line_strip_begin(&mut gl);
        batch.batch_line_strip(&mut gl, Vec2::zero());
        batch.batch_line_strip(&mut gl, Vec2::splat(2.0));
        batch.line_strip_begin(&mut gl);
        assert_eq!(batch.flush_count(), 1);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::LineStrip, 2)));
    }

    // ── quads ─────────────────────────────────────────────────────────────

    #[test]
    fn quads_expand_without_native_support() {
        let mut gl = ctx(HeadlessGl::mobile(8, 8));
        let mut batch = accumulating();
        batch.batch_quad(&mut gl, 0.0, 0.0, 8.0, 8.0);
        assert_eq!(batch.pending_vertices(), 6);
        batch.draw(&mut gl);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Triangles, 6)));
    }

    #[test]
    fn quad_ex_rotates_about_center() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = accumulating();
        batch.batch_quad_ex(&mut gl, 0.0, 0.0, 2.0, 2.0, 90.0, Vec2::splat(1.0), None);
        let v = batch.vertices();
        // The top-left corner lands on another corner of the same square.
        assert!((v[0].pos.x - 2.0).abs() < 1e-5 && v[0].pos.y.abs() < 1e-5);
    }

    #[test]
    fn corner_attributes_follow_perimeter() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = accumulating();
        batch.set_color_free(&[Color::RED, Color::GREEN, Color::BLUE, Color::BLACK]);
        batch.set_tex_coord_rect(Rect::new(0.0, 0.0, 0.5, 0.5));
        batch.batch_quad(&mut gl, 0.0, 0.0, 1.0, 1.0);
        let v = batch.vertices();
        assert_eq!(v[2].color, Color::BLUE);
        assert_eq!(v[2].tex, Vec2::new(0.5, 0.5));
        batch.quads_begin(&mut gl);
        batch.batch_quad(&mut gl, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(batch.vertices()[6].color, Color::WHITE);
    }

    // ── painter's order ───────────────────────────────────────────────────

    fn red_then_blue(gl: &mut GlContext<HeadlessGl>, batch: &mut BatchRenderer, split: bool) {
        batch.set_color(Color::RED);
        batch.batch_quad(gl, 0.0, 0.0, 6.0, 6.0);
        if split {
            batch.set_texture(gl, Some(1));
        }
        batch.set_color(Color::BLUE);
        batch.batch_quad(gl, 2.0, 2.0, 6.0, 6.0);
        batch.draw(gl);
    }

    #[test]
    fn later_shape_wins_in_one_flush() {
        for native in [HeadlessGl::legacy(8, 8), HeadlessGl::core(8, 8), HeadlessGl::mobile(8, 8)] {
            let mut gl = ctx(native);
            let mut batch = accumulating();
            red_then_blue(&mut gl, &mut batch, false);
            assert_eq!(batch.flush_count(), 1);
            assert_eq!(gl.native().pixel(4, 4), [0, 0, 255, 255]);
            assert_eq!(gl.native().pixel(1, 1), [255, 0, 0, 255]);
        }
    }

    #[test]
    fn later_shape_wins_across_flushes() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut batch = accumulating();
        red_then_blue(&mut gl, &mut batch, true);
        assert_eq!(batch.flush_count(), 2);
        assert_eq!(gl.native().pixel(4, 4), [0, 0, 255, 255]);
        assert_eq!(gl.native().pixel(1, 1), [255, 0, 0, 255]);
    }

    // ── user programs ─────────────────────────────────────────────────────

    fn base_program_copy(gl: &mut GlContext<HeadlessGl>) -> ShaderProgram {
        let dialect = Dialect::from_version(gl.version());
        let program = ShaderProgram::from_sources(
            gl,
            "copy",
            builtin::base_vertex_shader(dialect),
            builtin::base_fragment_shader(dialect),
        );
        assert!(program.is_valid(), "{}", program.log());
        program
    }

    #[test]
    fn user_program_receives_the_current_matrices() {
        for native in [HeadlessGl::core(8, 8), HeadlessGl::mobile(8, 8)] {
            let mut gl = ctx(native);
            let program = base_program_copy(&mut gl);
            let mut batch = accumulating();

            batch.set_color(Color::RED);
            batch.batch_quad(&mut gl, 0.0, 0.0, 8.0, 8.0);
            batch.draw(&mut gl);

            batch.set_shader(&mut gl, Some(program.handle()));
            batch.set_color(Color::BLUE);
            batch.batch_quad(&mut gl, 0.0, 0.0, 8.0, 8.0);
            batch.draw(&mut gl);

            assert_eq!(gl.native().pixel(4, 4), [0, 0, 255, 255]);
        }
    }

    #[test]
    fn base_program_catches_up_after_a_user_program() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let program = base_program_copy(&mut gl);
        let mut batch = accumulating();

        // Modelview changes while the user program is current.
        batch.set_shader(&mut gl, Some(program.handle()));
        gl.matrix_mode(MatrixMode::ModelView);
        gl.scale(0.5, 0.5, 1.0);
        batch.set_color(Color::BLUE);
        batch.batch_quad(&mut gl, 0.0, 0.0, 8.0, 8.0);
        batch.draw(&mut gl);

        batch.set_shader(&mut gl, None);
        batch.set_color(Color::GREEN);
        batch.batch_quad(&mut gl, 0.0, 0.0, 8.0, 8.0);
        batch.draw(&mut gl);

        assert_eq!(gl.native().pixel(1, 1), [0, 255, 0, 255]);
        assert_eq!(gl.native().pixel(6, 6), [0, 0, 0, 0]);
    }

    // ── transforms ────────────────────────────────────────────────────────

    #[test]
    fn batch_position_translates_and_restores() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = accumulating();
        batch.set_batch_position(&mut gl, Vec2::new(4.0, 4.0));
        batch.set_color(Color::GREEN);
        batch.batch_quad(&mut gl, 0.0, 0.0, 4.0, 4.0);
        batch.draw(&mut gl);
        assert_eq!(gl.native().pixel(6, 6), [0, 255, 0, 255]);
        assert_eq!(gl.native().pixel(1, 1), [0, 0, 0, 0]);
        assert_eq!(gl.matrix_depth(MatrixMode::ModelView), 1);
    }

    #[test]
    fn transform_change_flushes_pending() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut batch = accumulating();
        batch.batch_quad(&mut gl, 0.0, 0.0, 1.0, 1.0);
        batch.set_batch_rotation(&mut gl, 45.0);
        assert_eq!(batch.flush_count(), 1);
        batch.set_batch_rotation(&mut gl, 45.0);
        assert_eq!(batch.flush_count(), 1);
    }
}
