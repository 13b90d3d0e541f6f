//! [`NativeGl`] for a wgpu surface.
//!
//! `WgpuGl` reports itself as a GL 3.3 core-profile driver, so a
//! [`GlContext`](crate::gl::GlContext) drives it through the core backend and
//! its built-in `dgl_` programs. Object bookkeeping, validation and the
//! vertex stage run on the CPU in a recording [`HeadlessGl`]; what it records
//! each frame is replayed on the GPU by [`GlReplay`](super::GlReplay).

use crate::gl::{
    AttribPointer, BlendEquation, BlendFactor, BufferTarget, BufferUsage, Capability, ClientArray, FillMode,
    GlError, IndexData, MatrixMode, NativeGl, PrimitiveType, ShaderKind, StringName,
};
use crate::headless::{Captured, HeadlessGl};

pub const WGPU_GL_VERSION: &str = "3.3 kestrel-wgpu";

pub struct WgpuGl {
    inner: HeadlessGl,
    size: (u32, u32),
}

impl WgpuGl {
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let mut inner = HeadlessGl::with_strings(WGPU_GL_VERSION, "", width, height);
        inner.start_capture();
        log::debug!("wgpu gl device created ({width}x{height})");
        Self {
            inner,
            size: (width, height),
        }
    }

    /// Surface size in physical pixels; window coordinates are mapped to NDC
    /// against it.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
    }

    /// Clears and draws issued since the previous frame, in order.
    pub(crate) fn take_frame(&mut self) -> Vec<Captured> {
        self.inner.take_captured()
    }

    /// Draw calls that passed validation since creation.
    pub fn draw_count(&self) -> usize {
        self.inner.draw_count()
    }
}

impl NativeGl for WgpuGl {
    fn has_current_context(&self) -> bool {
        self.inner.has_current_context()
    }

    fn get_string(&self, name: StringName) -> String {
        match name {
            StringName::Renderer => "wgpu".to_owned(),
            other => self.inner.get_string(other),
        }
    }

    fn extensions(&self) -> String {
        self.inner.extensions()
    }

    fn get_error(&mut self) -> Option<GlError> {
        self.inner.get_error()
    }

    fn enable(&mut self, cap: Capability) {
        self.inner.enable(cap)
    }

    fn disable(&mut self, cap: Capability) {
        self.inner.disable(cap)
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.inner.blend_func(src, dst)
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        self.inner.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha)
    }

    fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        self.inner.blend_equation_separate(rgb, alpha)
    }

    fn line_width(&mut self, width: f32) {
        self.inner.line_width(width)
    }

    fn point_size(&mut self, size: f32) {
        self.inner.point_size(size)
    }

    fn polygon_mode(&mut self, mode: FillMode) {
        self.inner.polygon_mode(mode)
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.inner.viewport(x, y, width, height)
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.inner.scissor(x, y, width, height)
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.inner.clear_color(rgba)
    }

    fn clear(&mut self) {
        self.inner.clear()
    }

    fn active_texture(&mut self, unit: u32) {
        self.inner.active_texture(unit)
    }

    fn bind_texture(&mut self, texture: u32) {
        self.inner.bind_texture(texture)
    }

    fn gen_buffer(&mut self) -> Option<u32> {
        self.inner.gen_buffer()
    }

    fn delete_buffer(&mut self, buffer: u32) {
        self.inner.delete_buffer(buffer)
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: u32) {
        self.inner.bind_buffer(target, buffer)
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.inner.buffer_data(target, data, usage)
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.inner.buffer_sub_data(target, offset, data)
    }

    fn create_shader(&mut self, kind: ShaderKind) -> Option<u32> {
        self.inner.create_shader(kind)
    }

    fn compile_shader(&mut self, shader: u32, source: &str) -> bool {
        self.inner.compile_shader(shader, source)
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.inner.shader_info_log(shader)
    }

    fn delete_shader(&mut self, shader: u32) {
        self.inner.delete_shader(shader)
    }

    fn create_program(&mut self) -> Option<u32> {
        self.inner.create_program()
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        self.inner.attach_shader(program, shader)
    }

    fn link_program(&mut self, program: u32) -> bool {
        self.inner.link_program(program)
    }

    fn program_info_log(&self, program: u32) -> String {
        self.inner.program_info_log(program)
    }

    fn delete_program(&mut self, program: u32) {
        self.inner.delete_program(program)
    }

    fn use_program(&mut self, program: u32) {
        self.inner.use_program(program)
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<i32> {
        self.inner.uniform_location(program, name)
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        self.inner.attrib_location(program, name)
    }

    fn uniform_1i(&mut self, location: i32, v: i32) {
        self.inner.uniform_1i(location, v)
    }

    fn uniform_1f(&mut self, location: i32, v: f32) {
        self.inner.uniform_1f(location, v)
    }

    fn uniform_2f(&mut self, location: i32, v: [f32; 2]) {
        self.inner.uniform_2f(location, v)
    }

    fn uniform_4f(&mut self, location: i32, v: [f32; 4]) {
        self.inner.uniform_4f(location, v)
    }

    fn uniform_matrix4(&mut self, location: i32, m: &[f32; 16]) {
        self.inner.uniform_matrix4(location, m)
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.inner.enable_vertex_attrib_array(index)
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.inner.disable_vertex_attrib_array(index)
    }

    fn vertex_attrib_pointer(&mut self, index: u32, ptr: &AttribPointer<'_>) {
        self.inner.vertex_attrib_pointer(index, ptr)
    }

    // Fixed function is rejected by the core-profile validation underneath.

    fn ff_matrix_mode(&mut self, mode: MatrixMode) {
        self.inner.ff_matrix_mode(mode)
    }

    fn ff_push_matrix(&mut self) {
        self.inner.ff_push_matrix()
    }

    fn ff_pop_matrix(&mut self) {
        self.inner.ff_pop_matrix()
    }

    fn ff_load_identity(&mut self) {
        self.inner.ff_load_identity()
    }

    fn ff_load_matrix(&mut self, m: &[f32; 16]) {
        self.inner.ff_load_matrix(m)
    }

    fn ff_mult_matrix(&mut self, m: &[f32; 16]) {
        self.inner.ff_mult_matrix(m)
    }

    fn ff_translate(&mut self, x: f32, y: f32, z: f32) {
        self.inner.ff_translate(x, y, z)
    }

    fn ff_rotate(&mut self, degrees: f32, x: f32, y: f32, z: f32) {
        self.inner.ff_rotate(degrees, x, y, z)
    }

    fn ff_scale(&mut self, x: f32, y: f32, z: f32) {
        self.inner.ff_scale(x, y, z)
    }

    fn ff_ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.inner.ff_ortho(left, right, bottom, top, near, far)
    }

    fn ff_enable_client_state(&mut self, array: ClientArray) {
        self.inner.ff_enable_client_state(array)
    }

    fn ff_disable_client_state(&mut self, array: ClientArray) {
        self.inner.ff_disable_client_state(array)
    }

    fn ff_client_active_texture(&mut self, unit: u32) {
        self.inner.ff_client_active_texture(unit)
    }

    fn ff_client_pointer(&mut self, array: ClientArray, ptr: &AttribPointer<'_>) {
        self.inner.ff_client_pointer(array, ptr)
    }

    fn ff_clip_plane(&mut self, index: u8, equation: [f32; 4]) {
        self.inner.ff_clip_plane(index, equation)
    }

    fn draw_arrays(&mut self, mode: PrimitiveType, first: usize, count: usize) {
        self.inner.draw_arrays(mode, first, count)
    }

    fn draw_elements(&mut self, mode: PrimitiveType, count: usize, indices: IndexData<'_>) {
        self.inner.draw_elements(mode, count, indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchConfig, BatchRenderer};
    use crate::coords::Viewport;
    use crate::gl::{GlConfig, GlContext, GlVersion};
    use crate::paint::Color;

    fn context() -> GlContext<WgpuGl> {
        let mut gl = GlContext::new(WgpuGl::new(32, 32), GlConfig::default());
        gl.set_ortho_2d(Viewport::new(32.0, 32.0));
        gl
    }

    #[test]
    fn drives_the_core_backend() {
        let gl = context();
        assert_eq!(gl.version(), GlVersion::Core);
        assert!(gl.shaders_supported());
        assert!(!gl.quads_supported());
        assert_eq!(gl.renderer(), "wgpu");
    }

    #[test]
    fn records_clears_and_draws_in_order() {
        let mut gl = context();
        gl.clear_color([0.0, 0.0, 1.0, 1.0]);
        gl.clear();

        let mut batch = BatchRenderer::new(BatchConfig::default());
        batch.quads_begin(&mut gl);
        batch.set_color(Color::RED);
        batch.batch_quad(&mut gl, 0.0, 0.0, 8.0, 8.0);
        batch.draw(&mut gl);

        let frame = gl.native_mut().take_frame();
        assert_eq!(frame.len(), 2);
        assert!(matches!(frame[0], Captured::Clear { color, scissor: None } if color == [0.0, 0.0, 1.0, 1.0]));
        match &frame[1] {
            Captured::Draw { mode, vertices, .. } => {
                assert_eq!(*mode, PrimitiveType::Triangles);
                assert_eq!(vertices.len(), 6);
                assert_eq!(vertices[0].color, [1.0, 0.0, 0.0, 1.0]);
            }
            other => panic!("expected a draw, got {other:?}"),
        }
        assert!(gl.native_mut().take_frame().is_empty());
    }

    #[test]
    fn resize_ignores_empty_sizes() {
        let mut dev = WgpuGl::new(0, 0);
        assert_eq!(dev.size(), (1, 1));
        dev.resize(640, 480);
        dev.resize(0, 480);
        assert_eq!(dev.size(), (640, 480));
    }
}
