use super::types::{
    AttribPointer, BlendEquation, BlendFactor, BufferTarget, BufferUsage, Capability, ClientArray,
    FillMode, GlError, IndexData, MatrixMode, PrimitiveType, ShaderKind, StringName,
};

/// The native graphics API behind a [`GlContext`](super::GlContext).
///
/// Entry points mirror the GL calls the state layer needs, in typed form.
/// Object names are plain `u32` handles where `0` means "none". Calls a
/// device can't honor are expected to raise an error through
/// [`get_error`](Self::get_error), never to panic.
///
/// The `ff_*` family is the fixed-function pipeline; only the legacy backend
/// calls it.
pub trait NativeGl {
    /// Whether a context is current on this thread.
    fn has_current_context(&self) -> bool;
    fn get_string(&self, name: StringName) -> String;
    /// Space separated extension names.
    fn extensions(&self) -> String;
    /// Pops the oldest pending error.
    fn get_error(&mut self) -> Option<GlError>;

    // ── fixed state ───────────────────────────────────────────────────────

    fn enable(&mut self, cap: Capability);
    fn disable(&mut self, cap: Capability);
    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor);
    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    );
    fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation);
    fn line_width(&mut self, width: f32);
    fn point_size(&mut self, size: f32);
    fn polygon_mode(&mut self, mode: FillMode);
    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self);

    // ── textures ──────────────────────────────────────────────────────────

    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, texture: u32);

    // ── buffer objects ────────────────────────────────────────────────────

    /// `None` when the device can't create another buffer.
    fn gen_buffer(&mut self) -> Option<u32>;
    fn delete_buffer(&mut self, buffer: u32);
    fn bind_buffer(&mut self, target: BufferTarget, buffer: u32);
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    // ── programmable pipeline ─────────────────────────────────────────────

    fn create_shader(&mut self, kind: ShaderKind) -> Option<u32>;
    /// Sets the source and compiles; returns the compile status.
    fn compile_shader(&mut self, shader: u32, source: &str) -> bool;
    fn shader_info_log(&self, shader: u32) -> String;
    fn delete_shader(&mut self, shader: u32);
    fn create_program(&mut self) -> Option<u32>;
    fn attach_shader(&mut self, program: u32, shader: u32);
    /// Links and returns the link status.
    fn link_program(&mut self, program: u32) -> bool;
    fn program_info_log(&self, program: u32) -> String;
    fn delete_program(&mut self, program: u32);
    fn use_program(&mut self, program: u32);
    fn uniform_location(&self, program: u32, name: &str) -> Option<i32>;
    fn attrib_location(&self, program: u32, name: &str) -> Option<u32>;
    fn uniform_1i(&mut self, location: i32, v: i32);
    fn uniform_1f(&mut self, location: i32, v: f32);
    fn uniform_2f(&mut self, location: i32, v: [f32; 2]);
    fn uniform_4f(&mut self, location: i32, v: [f32; 4]);
    fn uniform_matrix4(&mut self, location: i32, m: &[f32; 16]);
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);
    fn vertex_attrib_pointer(&mut self, index: u32, ptr: &AttribPointer<'_>);

    // ── fixed-function pipeline ───────────────────────────────────────────

    fn ff_matrix_mode(&mut self, mode: MatrixMode);
    fn ff_push_matrix(&mut self);
    fn ff_pop_matrix(&mut self);
    fn ff_load_identity(&mut self);
    fn ff_load_matrix(&mut self, m: &[f32; 16]);
    fn ff_mult_matrix(&mut self, m: &[f32; 16]);
    fn ff_translate(&mut self, x: f32, y: f32, z: f32);
    fn ff_rotate(&mut self, degrees: f32, x: f32, y: f32, z: f32);
    fn ff_scale(&mut self, x: f32, y: f32, z: f32);
    fn ff_ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32);
    fn ff_enable_client_state(&mut self, array: ClientArray);
    fn ff_disable_client_state(&mut self, array: ClientArray);
    fn ff_client_active_texture(&mut self, unit: u32);
    fn ff_client_pointer(&mut self, array: ClientArray, ptr: &AttribPointer<'_>);
    /// Plane equation in object space; the device moves it to eye space with
    /// the current model-view, as `glClipPlane` does.
    fn ff_clip_plane(&mut self, index: u8, equation: [f32; 4]);

    // ── drawing ───────────────────────────────────────────────────────────

    fn draw_arrays(&mut self, mode: PrimitiveType, first: usize, count: usize);
    fn draw_elements(&mut self, mode: PrimitiveType, count: usize, indices: IndexData<'_>);
}
