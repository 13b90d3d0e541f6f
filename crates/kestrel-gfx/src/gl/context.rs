use crate::coords::{Mat4, Rect, Viewport};
use crate::paint::BlendMode;

use super::backend::{Backend, MatrixOp};
use super::caps::{Capabilities, Extension, GlVersion};
use super::check::check_errors;
use super::clip::{ClipStack, DEFAULT_CLIP_DEPTH};
use super::matrix_stack::MatrixStacks;
use super::native::NativeGl;
use super::types::{
    quads_to_triangles, AttribPointer, BlendEquation, BlendFactor, BufferTarget, BufferUsage, Capability,
    ClientArray, FillMode, IndexData, MatrixMode, PrimitiveType, ShaderKind, StringName,
};

/// Creation options for a [`GlContext`].
#[derive(Debug, Clone)]
pub struct GlConfig {
    /// Forces a backend; detected from the version string when `None`.
    pub version: Option<GlVersion>,
    /// Maximum nesting of 2D clip rectangles. Deeper pushes are refused.
    pub clip_depth: usize,
    /// Drain and log native errors after each call (debug builds only).
    pub error_checks: bool,
}

impl Default for GlConfig {
    fn default() -> Self {
        Self {
            version: None,
            clip_depth: DEFAULT_CLIP_DEPTH,
            error_checks: true,
        }
    }
}

/// Snapshot of the state the context caches to skip redundant native calls.
#[derive(Debug, Clone, PartialEq)]
pub struct GlState {
    pub texture: u32,
    pub texture_unit: u32,
    pub texture_2d: bool,
    /// User program, `None` while the default pipeline is active.
    pub shader: Option<u32>,
    /// Last preset applied through `set_blend_mode`; `None` after raw blend calls.
    pub blend: Option<BlendMode>,
    pub blend_equation: (BlendEquation, BlendEquation),
    pub line_width: f32,
    pub point_size: f32,
    pub fill_mode: FillMode,
    pub line_smooth: bool,
    pub array_buffer: u32,
    pub element_buffer: u32,
    pub viewport: [i32; 4],
}

impl Default for GlState {
    fn default() -> Self {
        Self {
            texture: 0,
            texture_unit: 0,
            texture_2d: false,
            shader: None,
            blend: None,
            blend_equation: (BlendEquation::Add, BlendEquation::Add),
            line_width: 1.0,
            point_size: 1.0,
            fill_mode: FillMode::Fill,
            line_smooth: false,
            array_buffer: 0,
            element_buffer: 0,
            viewport: [0; 4],
        }
    }
}

#[derive(Debug, Default)]
struct Warned {
    line_smooth: bool,
    polygon_mode: bool,
    wide_lines: bool,
    blend_separate: bool,
    blend_equation: bool,
    quad_elements: bool,
}

/// One state-tracking front over a native graphics context.
///
/// Callers issue the same fixed-function style calls regardless of backend;
/// the backend chosen at creation either forwards them or emulates them with
/// the built-in shader programs.
pub struct GlContext<N: NativeGl> {
    native: N,
    config: GlConfig,
    caps: Capabilities,
    backend: Backend,
    matrices: MatrixStacks,
    clip: ClipStack,
    state: GlState,
    pending_line_smooth: bool,
    errors: usize,
    warned: Warned,
}

impl<N: NativeGl> GlContext<N> {
    /// Wraps `native` and selects a backend.
    ///
    /// # Panics
    ///
    /// If `native` has no current context. Every later call would be
    /// undefined, so this is treated as a programming error.
    pub fn new(mut native: N, config: GlConfig) -> Self {
        if !native.has_current_context() {
            log::error!("no current graphics context; create the window before the GlContext");
            panic!("GlContext::new called without a current graphics context");
        }

        let version_string = native.get_string(StringName::Version);
        let version = config.version.unwrap_or_else(|| GlVersion::detect(&version_string));
        let caps = Capabilities::detect(version, &native.extensions());
        let backend = Backend::new(&mut native, version);

        log::info!(
            "graphics context: {version} backend on \"{version_string}\" ({} / {})",
            native.get_string(StringName::Vendor),
            native.get_string(StringName::Renderer),
        );

        let clip = ClipStack::new(config.clip_depth);
        let mut ctx = Self {
            native,
            config,
            caps,
            backend,
            matrices: MatrixStacks::new(),
            clip,
            state: GlState::default(),
            pending_line_smooth: false,
            errors: 0,
            warned: Warned::default(),
        };
        ctx.set_blend_mode(BlendMode::Alpha);
        ctx.check("GlContext::new");
        ctx
    }

    #[track_caller]
    fn check(&mut self, call: &str) {
        self.errors += check_errors(&mut self.native, self.config.error_checks, call);
    }

    // ── queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn native(&self) -> &N {
        &self.native
    }

    /// Raw access to the native context. Calls made here bypass state
    /// tracking; follow them with [`reload`](Self::reload) if they change
    /// anything the context caches.
    #[inline]
    pub fn native_mut(&mut self) -> &mut N {
        &mut self.native
    }

    #[inline]
    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    #[inline]
    pub fn version(&self) -> GlVersion {
        self.caps.version()
    }

    #[inline]
    pub fn config(&self) -> &GlConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &GlState {
        &self.state
    }

    /// Native errors seen by the debug checks so far.
    #[inline]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn is_extension(&self, name: &str) -> bool {
        self.caps.is_extension(name)
    }

    pub fn has_extension(&self, ext: Extension) -> bool {
        self.caps.has(ext)
    }

    pub fn vendor(&self) -> String {
        self.native.get_string(StringName::Vendor)
    }

    pub fn renderer(&self) -> String {
        self.native.get_string(StringName::Renderer)
    }

    pub fn version_string(&self) -> String {
        self.native.get_string(StringName::Version)
    }

    pub fn shading_language_version(&self) -> String {
        if self.caps.shaders_supported() {
            self.native.get_string(StringName::ShadingLanguageVersion)
        } else {
            "Shaders not supported".to_owned()
        }
    }

    #[inline]
    pub fn shaders_supported(&self) -> bool {
        self.caps.shaders_supported()
    }

    #[inline]
    pub fn quads_supported(&self) -> bool {
        self.caps.quads_supported()
    }

    #[inline]
    pub fn quad_vertex_count(&self) -> usize {
        self.caps.quad_vertex_count()
    }

    // ── matrices ──────────────────────────────────────────────────────────

    #[track_caller]
    fn matrix_op(&mut self, op: MatrixOp, call: &str) {
        match op {
            MatrixOp::Mode(mode) => self.matrices.set_mode(mode),
            MatrixOp::Push => {
                if !self.matrices.push() {
                    return;
                }
            }
            MatrixOp::Pop => {
                if !self.matrices.pop() {
                    return;
                }
            }
            MatrixOp::Identity => self.matrices.load_identity(),
            MatrixOp::Load(m) => self.matrices.load(m),
            MatrixOp::Mult(m) => self.matrices.mult(m),
            MatrixOp::Translate(x, y, z) => self.matrices.mult(Mat4::translation(x, y, z)),
            MatrixOp::Rotate(deg, x, y, z) => self.matrices.mult(Mat4::rotation(deg, x, y, z)),
            MatrixOp::Scale(x, y, z) => self.matrices.mult(Mat4::scaling(x, y, z)),
            MatrixOp::Ortho(l, r, b, t, n, f) => self.matrices.mult(Mat4::ortho(l, r, b, t, n, f)),
        }
        self.backend.matrix_op(&mut self.native, op);
        self.check(call);
    }

    #[track_caller]
    pub fn matrix_mode(&mut self, mode: MatrixMode) {
        self.matrix_op(MatrixOp::Mode(mode), "matrix_mode");
    }

    #[inline]
    pub fn current_matrix_mode(&self) -> MatrixMode {
        self.matrices.mode()
    }

    /// Top of the stack for `mode`.
    #[inline]
    pub fn current_matrix(&self, mode: MatrixMode) -> Mat4 {
        self.matrices.current(mode)
    }

    #[inline]
    pub fn matrix_depth(&self, mode: MatrixMode) -> usize {
        self.matrices.depth(mode)
    }

    #[track_caller]
    pub fn push_matrix(&mut self) {
        self.matrix_op(MatrixOp::Push, "push_matrix");
    }

    #[track_caller]
    pub fn pop_matrix(&mut self) {
        self.matrix_op(MatrixOp::Pop, "pop_matrix");
    }

    #[track_caller]
    pub fn load_identity(&mut self) {
        self.matrix_op(MatrixOp::Identity, "load_identity");
    }

    #[track_caller]
    pub fn load_matrix(&mut self, m: Mat4) {
        self.matrix_op(MatrixOp::Load(m), "load_matrix");
    }

    #[track_caller]
    pub fn mult_matrix(&mut self, m: Mat4) {
        self.matrix_op(MatrixOp::Mult(m), "mult_matrix");
    }

    #[track_caller]
    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.matrix_op(MatrixOp::Translate(x, y, z), "translate");
    }

    #[track_caller]
    pub fn rotate(&mut self, degrees: f32, x: f32, y: f32, z: f32) {
        self.matrix_op(MatrixOp::Rotate(degrees, x, y, z), "rotate");
    }

    #[track_caller]
    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.matrix_op(MatrixOp::Scale(x, y, z), "scale");
    }

    #[track_caller]
    pub fn ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        self.matrix_op(MatrixOp::Ortho(left, right, bottom, top, near, far), "ortho");
    }

    /// Pixel-space 2D setup: full viewport, y-down projection, identity modelview.
    #[track_caller]
    pub fn set_ortho_2d(&mut self, viewport: Viewport) {
        let (w, h) = (viewport.width, viewport.height);
        self.viewport(0, 0, w as i32, h as i32);
        self.matrix_mode(MatrixMode::Projection);
        self.load_identity();
        self.ortho(0.0, w, h, 0.0, -1000.0, 1000.0);
        self.matrix_mode(MatrixMode::ModelView);
        self.load_identity();
    }

    /// Maps an object-space point to window coordinates (origin bottom-left).
    pub fn project(&self, x: f32, y: f32, z: f32) -> Option<[f32; 3]> {
        let mvp = self.matrices.current(MatrixMode::Projection) * self.matrices.current(MatrixMode::ModelView);
        Mat4::project(&mvp, [x, y, z], self.state.viewport.map(|v| v as f32))
    }

    /// Inverse of [`project`](Self::project); `None` for a singular transform.
    pub fn unproject(&self, win_x: f32, win_y: f32, win_z: f32) -> Option<[f32; 3]> {
        let mvp = self.matrices.current(MatrixMode::Projection) * self.matrices.current(MatrixMode::ModelView);
        Mat4::unproject(&mvp, [win_x, win_y, win_z], self.state.viewport.map(|v| v as f32))
    }

    // ── client arrays ─────────────────────────────────────────────────────

    #[track_caller]
    pub fn client_active_texture(&mut self, unit: u32) {
        self.backend.client_active_texture(&mut self.native, unit);
        self.check("client_active_texture");
    }

    #[track_caller]
    pub fn enable_client_state(&mut self, array: ClientArray) {
        self.backend.enable_client_state(&mut self.native, array);
        self.check("enable_client_state");
    }

    #[track_caller]
    pub fn disable_client_state(&mut self, array: ClientArray) {
        self.backend.disable_client_state(&mut self.native, array);
        self.check("disable_client_state");
    }

    #[track_caller]
    fn pointer(&mut self, array: ClientArray, ptr: &AttribPointer<'_>, call: &str) {
        debug_assert!((1..=4).contains(&ptr.size), "{call}: component count {} out of range", ptr.size);
        self.backend.pointer(&mut self.native, array, ptr, self.state.array_buffer);
        self.check(call);
    }

    #[track_caller]
    pub fn vertex_pointer(&mut self, ptr: &AttribPointer<'_>) {
        self.pointer(ClientArray::Vertex, ptr, "vertex_pointer");
    }

    #[track_caller]
    pub fn color_pointer(&mut self, ptr: &AttribPointer<'_>) {
        self.pointer(ClientArray::Color, ptr, "color_pointer");
    }

    /// Texture coordinates for the unit selected by `client_active_texture`.
    #[track_caller]
    pub fn tex_coord_pointer(&mut self, ptr: &AttribPointer<'_>) {
        self.pointer(ClientArray::TexCoord, ptr, "tex_coord_pointer");
    }

    // ── capabilities ──────────────────────────────────────────────────────

    #[track_caller]
    pub fn enable(&mut self, cap: Capability) {
        self.set_capability(cap, true);
        self.check("enable");
    }

    #[track_caller]
    pub fn disable(&mut self, cap: Capability) {
        self.set_capability(cap, false);
        self.check("disable");
    }

    fn set_capability(&mut self, cap: Capability, on: bool) {
        match cap {
            Capability::LineSmooth => {
                self.state.line_smooth = on;
                self.pending_line_smooth = true;
                return;
            }
            Capability::Texture2D => self.state.texture_2d = on,
            Capability::ClipPlane(i) => debug_assert!((i as usize) < super::types::MAX_CLIP_PLANES),
            _ => {}
        }

        let emulated = match cap {
            Capability::Texture2D | Capability::PointSprite | Capability::ClipPlane(_) => self.backend.emulation(),
            _ => None,
        };
        match (emulated, cap) {
            (Some(emu), Capability::Texture2D) => emu.set_texture_active(on),
            (Some(emu), Capability::PointSprite) => emu.set_point_sprite(on),
            (Some(emu), Capability::ClipPlane(i)) => emu.set_clip_enabled(i as usize, on),
            _ if on => self.native.enable(cap),
            _ => self.native.disable(cap),
        }
    }

    /// Line smoothing is deferred to the next draw, where the mobile backend
    /// drops it (GLES has no line smoothing).
    fn apply_pending(&mut self) {
        if !std::mem::take(&mut self.pending_line_smooth) {
            return;
        }
        if self.version() == GlVersion::Mobile {
            if !self.warned.line_smooth {
                log::warn!("line smoothing is not available on the mobile backend; ignored");
                self.warned.line_smooth = true;
            }
        } else if self.state.line_smooth {
            self.native.enable(Capability::LineSmooth);
        } else {
            self.native.disable(Capability::LineSmooth);
        }
    }

    // ── clipping ──────────────────────────────────────────────────────────

    /// Sets user clip plane `index` from an object-space equation.
    #[track_caller]
    pub fn clip_plane(&mut self, index: u8, equation: [f32; 4]) {
        let modelview = self.matrices.current(MatrixMode::ModelView);
        match self.backend.emulation() {
            Some(emu) => emu.set_clip_plane(index as usize, equation, &modelview),
            None => self.native.ff_clip_plane(index, equation),
        }
        self.check("clip_plane");
    }

    /// Restricts drawing to `rect` intersected with the enclosing clip.
    ///
    /// Returns `false` and leaves clipping untouched when the clip stack is
    /// already at its configured depth.
    #[track_caller]
    pub fn clip_2d_plane_enable(&mut self, rect: Rect) -> bool {
        let Some(effective) = self.clip.push(rect) else {
            log::error!(
                "clip stack overflow: depth limit {} reached, clip {rect:?} ignored",
                self.clip.max_depth()
            );
            return false;
        };
        self.apply_clip_rect(effective);
        true
    }

    /// Removes the innermost clip, restoring the enclosing one.
    ///
    /// Returns `false` when there is no clip to remove.
    #[track_caller]
    pub fn clip_2d_plane_disable(&mut self) -> bool {
        if !self.clip.pop() {
            log::error!("clip_2d_plane_disable called with no active clip");
            return false;
        }
        match self.clip.top() {
            Some(parent) => self.apply_clip_rect(parent),
            None => {
                for i in 0..4 {
                    self.disable(Capability::ClipPlane(i));
                }
            }
        }
        true
    }

    /// Effective clip rectangle, if any.
    #[inline]
    pub fn clip_rect(&self) -> Option<Rect> {
        self.clip.top()
    }

    #[inline]
    pub fn clip_depth(&self) -> usize {
        self.clip.depth()
    }

    #[track_caller]
    fn apply_clip_rect(&mut self, r: Rect) {
        let planes = [
            [1.0, 0.0, 0.0, -r.origin.x],
            [-1.0, 0.0, 0.0, r.origin.x + r.size.x],
            [0.0, 1.0, 0.0, -r.origin.y],
            [0.0, -1.0, 0.0, r.origin.y + r.size.y],
        ];
        for (i, eq) in planes.into_iter().enumerate() {
            self.clip_plane(i as u8, eq);
            self.enable(Capability::ClipPlane(i as u8));
        }
    }

    // ── blending & raster state ───────────────────────────────────────────

    #[track_caller]
    pub fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        self.native.blend_func(src, dst);
        self.state.blend = None;
        self.check("blend_func");
    }

    /// Separate color/alpha factors. Without driver support the alpha
    /// factors follow the color ones.
    #[track_caller]
    pub fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        if self.caps.blend_func_separate_supported() {
            self.native.blend_func_separate(src_rgb, dst_rgb, src_alpha, dst_alpha);
        } else {
            if !self.warned.blend_separate {
                log::warn!("separate blend factors unsupported; alpha uses the color factors");
                self.warned.blend_separate = true;
            }
            self.native.blend_func(src_rgb, dst_rgb);
        }
        self.state.blend = None;
        self.check("blend_func_separate");
    }

    #[track_caller]
    pub fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        let rgb = self.supported_equation(rgb);
        let alpha = self.supported_equation(alpha);
        if self.state.blend_equation == (rgb, alpha) {
            return;
        }
        self.native.blend_equation_separate(rgb, alpha);
        self.state.blend_equation = (rgb, alpha);
        self.check("blend_equation_separate");
    }

    fn supported_equation(&mut self, eq: BlendEquation) -> BlendEquation {
        let ok = match eq {
            BlendEquation::Add => true,
            BlendEquation::Subtract | BlendEquation::ReverseSubtract => self.caps.has(Extension::BlendSubtract),
            BlendEquation::Min | BlendEquation::Max => self.caps.has(Extension::BlendMinmax),
        };
        if ok {
            return eq;
        }
        if !self.warned.blend_equation {
            log::warn!("blend equation {eq:?} unsupported; using Add");
            self.warned.blend_equation = true;
        }
        BlendEquation::Add
    }

    /// Applies a blend preset; repeated calls with the same mode are free.
    #[track_caller]
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        if self.state.blend == Some(mode) {
            return;
        }
        match mode.func() {
            None => self.native.disable(Capability::Blend),
            Some(f) => {
                self.native.enable(Capability::Blend);
                if f.is_separate() {
                    self.blend_func_separate(f.src_rgb, f.dst_rgb, f.src_alpha, f.dst_alpha);
                } else {
                    self.blend_func(f.src_rgb, f.dst_rgb);
                }
                self.blend_equation_separate(f.eq_rgb, f.eq_alpha);
            }
        }
        self.state.blend = Some(mode);
        self.check("set_blend_mode");
    }

    /// Core profiles reject widths above 1; those are recorded but not sent.
    #[track_caller]
    pub fn line_width(&mut self, width: f32) {
        if self.state.line_width == width {
            return;
        }
        self.state.line_width = width;
        if width > 1.0 && !self.caps.wide_lines_supported() {
            if !self.warned.wide_lines {
                log::warn!("line width {width} unsupported by the {} backend; drawing 1px lines", self.version());
                self.warned.wide_lines = true;
            }
            return;
        }
        self.native.line_width(width);
        self.check("line_width");
    }

    #[track_caller]
    pub fn point_size(&mut self, size: f32) {
        if self.state.point_size == size {
            return;
        }
        self.state.point_size = size;
        match self.backend.emulation() {
            Some(emu) => emu.set_point_size(size),
            None => self.native.point_size(size),
        }
        self.check("point_size");
    }

    /// Fill or outline polygons. Ignored on the mobile backend.
    #[track_caller]
    pub fn polygon_mode(&mut self, mode: FillMode) {
        if !self.caps.polygon_mode_supported() {
            if !self.warned.polygon_mode {
                log::warn!("polygon mode is not available on the mobile backend; ignored");
                self.warned.polygon_mode = true;
            }
            return;
        }
        if self.state.fill_mode == mode {
            return;
        }
        self.native.polygon_mode(mode);
        self.state.fill_mode = mode;
        self.check("polygon_mode");
    }

    #[track_caller]
    pub fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.native.viewport(x, y, width, height);
        self.state.viewport = [x, y, width, height];
        self.check("viewport");
    }

    #[track_caller]
    pub fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.native.scissor(x, y, width, height);
        self.check("scissor");
    }

    #[track_caller]
    pub fn clear_color(&mut self, rgba: [f32; 4]) {
        self.native.clear_color(rgba);
        self.check("clear_color");
    }

    #[track_caller]
    pub fn clear(&mut self) {
        self.native.clear();
        self.check("clear");
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// Binds `texture` on the active unit. Core profiles have no texture 0,
    /// so unbinding there is skipped.
    #[track_caller]
    pub fn bind_texture(&mut self, texture: u32) {
        if texture == 0 && self.version() == GlVersion::Core {
            return;
        }
        if self.state.texture == texture {
            return;
        }
        self.native.bind_texture(texture);
        self.state.texture = texture;
        self.check("bind_texture");
    }

    #[track_caller]
    pub fn active_texture(&mut self, unit: u32) {
        if self.state.texture_unit == unit {
            return;
        }
        self.native.active_texture(unit);
        self.state.texture_unit = unit;
        self.check("active_texture");
    }

    // ── buffer objects ────────────────────────────────────────────────────

    #[track_caller]
    pub fn gen_buffer(&mut self) -> Option<u32> {
        let id = self.native.gen_buffer();
        self.check("gen_buffer");
        id
    }

    #[track_caller]
    pub fn delete_buffer(&mut self, buffer: u32) {
        if buffer == 0 {
            return;
        }
        self.native.delete_buffer(buffer);
        if self.state.array_buffer == buffer {
            self.state.array_buffer = 0;
        }
        if self.state.element_buffer == buffer {
            self.state.element_buffer = 0;
        }
        self.check("delete_buffer");
    }

    #[track_caller]
    pub fn bind_buffer(&mut self, target: BufferTarget, buffer: u32) {
        self.native.bind_buffer(target, buffer);
        match target {
            BufferTarget::Array => self.state.array_buffer = buffer,
            BufferTarget::ElementArray => self.state.element_buffer = buffer,
        }
        self.check("bind_buffer");
    }

    #[track_caller]
    pub fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.native.buffer_data(target, data, usage);
        self.check("buffer_data");
    }

    #[track_caller]
    pub fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.native.buffer_sub_data(target, offset, data);
        self.check("buffer_sub_data");
    }

    // ── programs ──────────────────────────────────────────────────────────

    #[track_caller]
    pub fn create_shader(&mut self, kind: ShaderKind) -> Option<u32> {
        let id = self.native.create_shader(kind);
        self.check("create_shader");
        id
    }

    #[track_caller]
    pub fn compile_shader(&mut self, shader: u32, source: &str) -> bool {
        let ok = self.native.compile_shader(shader, source);
        self.check("compile_shader");
        ok
    }

    pub fn shader_info_log(&self, shader: u32) -> String {
        self.native.shader_info_log(shader)
    }

    #[track_caller]
    pub fn delete_shader(&mut self, shader: u32) {
        if shader != 0 {
            self.native.delete_shader(shader);
            self.check("delete_shader");
        }
    }

    #[track_caller]
    pub fn create_program(&mut self) -> Option<u32> {
        let id = self.native.create_program();
        self.check("create_program");
        id
    }

    #[track_caller]
    pub fn attach_shader(&mut self, program: u32, shader: u32) {
        self.native.attach_shader(program, shader);
        self.check("attach_shader");
    }

    #[track_caller]
    pub fn link_program(&mut self, program: u32) -> bool {
        let ok = self.native.link_program(program);
        self.check("link_program");
        ok
    }

    pub fn program_info_log(&self, program: u32) -> String {
        self.native.program_info_log(program)
    }

    /// Deletes `program`, falling back to the default pipeline if it was bound.
    #[track_caller]
    pub fn delete_program(&mut self, program: u32) {
        if program == 0 {
            return;
        }
        if self.state.shader == Some(program) {
            self.set_shader(None);
        }
        self.native.delete_program(program);
        self.check("delete_program");
    }

    pub fn uniform_location(&self, program: u32, name: &str) -> Option<i32> {
        self.native.uniform_location(program, name)
    }

    pub fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        self.native.attrib_location(program, name)
    }

    /// Makes `program` current, or restores the default pipeline on `None`.
    ///
    /// Returns `false` when the context can't run shader programs.
    #[track_caller]
    pub fn set_shader(&mut self, program: Option<u32>) -> bool {
        if program.is_some() && !self.caps.shaders_supported() {
            log::error!("shader programs are not supported by this {} context", self.version());
            return false;
        }
        match self.backend.emulation() {
            Some(emu) => {
                emu.use_program(&mut self.native, program);
                // The new program holds none of the tracked matrices yet.
                self.matrices.mark_all_dirty();
            }
            None => self.native.use_program(program.unwrap_or(0)),
        }
        self.state.shader = program;
        self.check("set_shader");
        true
    }

    /// Program that draws right now: the user program, the backend's base
    /// program, or 0 for fixed function.
    pub fn current_program(&self) -> u32 {
        match self.backend.emulation_ref() {
            Some(emu) => emu.program(),
            None => self.state.shader.unwrap_or(0),
        }
    }

    /// Base program of the emulating backends; 0 on legacy.
    pub fn base_program(&self) -> u32 {
        self.backend.emulation_ref().map_or(0, |emu| emu.base_program())
    }

    /// Runs `f` with `program` temporarily current, for uniform uploads.
    #[track_caller]
    pub fn with_program<R>(&mut self, program: u32, f: impl FnOnce(&mut N) -> R) -> R {
        let current = self.current_program();
        if current != program {
            self.native.use_program(program);
        }
        let out = f(&mut self.native);
        if current != program {
            self.native.use_program(current);
        }
        self.check("with_program");
        out
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Backend-native mode for `mode`; `None` when quads must be re-indexed.
    fn native_mode(&self, mode: PrimitiveType) -> Option<PrimitiveType> {
        if self.caps.quads_supported() {
            return Some(mode);
        }
        match mode {
            PrimitiveType::Quads => None,
            PrimitiveType::Polygon => Some(PrimitiveType::TriangleFan),
            m => Some(m),
        }
    }

    fn before_draw(&mut self) {
        self.apply_pending();
        self.backend.before_draw(&mut self.native, &mut self.matrices);
    }

    #[track_caller]
    pub fn draw_arrays(&mut self, mode: PrimitiveType, first: usize, count: usize) {
        if count == 0 {
            return;
        }
        match self.native_mode(mode) {
            Some(m) => {
                self.before_draw();
                self.native.draw_arrays(m, first, count);
                self.check("draw_arrays");
            }
            None => {
                let quads: Vec<u32> = (first as u32..(first + count) as u32).collect();
                let indices = quads_to_triangles(&quads);
                self.draw_elements(PrimitiveType::Triangles, indices.len(), IndexData::Client(&indices));
            }
        }
    }

    /// Indexed draw. Quad lists from client indices are re-indexed to
    /// triangles where quads aren't native.
    #[track_caller]
    pub fn draw_elements(&mut self, mode: PrimitiveType, count: usize, indices: IndexData<'_>) {
        if count == 0 {
            return;
        }
        let expanded;
        let (mode, count, indices) = match self.native_mode(mode) {
            Some(m) => (m, count, indices),
            None => match indices {
                IndexData::Client(idx) => {
                    expanded = quads_to_triangles(&idx[..count.min(idx.len())]);
                    (PrimitiveType::Triangles, expanded.len(), IndexData::Client(&expanded))
                }
                IndexData::Offset(_) => {
                    if !self.warned.quad_elements {
                        log::warn!("quads from an element buffer can't be emulated; store triangle indices instead");
                        self.warned.quad_elements = true;
                    }
                    return;
                }
            },
        };

        self.before_draw();
        match (&mut self.backend, indices) {
            (Backend::Core(core), IndexData::Client(idx)) => {
                let idx = &idx[..count.min(idx.len())];
                if core.streams.upload_indices(&mut self.native, idx).is_some() {
                    self.native.draw_elements(mode, idx.len(), IndexData::Offset(0));
                }
                self.native.bind_buffer(BufferTarget::ElementArray, self.state.element_buffer);
            }
            (_, indices) => self.native.draw_elements(mode, count, indices),
        }
        self.check("draw_elements");
    }

    // ── context loss ──────────────────────────────────────────────────────

    /// Re-creates backend objects and re-applies cached state after the
    /// native context was lost and recreated. Programs and buffers owned by
    /// callers must be reloaded by their owners.
    #[track_caller]
    pub fn reload(&mut self) {
        log::info!("reloading {} graphics state", self.version());
        self.backend.reload(&mut self.native);
        self.matrices.mark_all_dirty();

        if self.version() == GlVersion::Legacy {
            let mode = self.matrices.mode();
            for m in MatrixMode::ALL {
                self.native.ff_matrix_mode(m);
                self.native.ff_load_matrix(&self.matrices.current(m).m);
            }
            self.native.ff_matrix_mode(mode);
        }

        let previous = std::mem::take(&mut self.state);
        self.state.shader = None;
        let [x, y, w, h] = previous.viewport;
        self.viewport(x, y, w, h);
        self.set_blend_mode(previous.blend.unwrap_or_default());
        self.set_capability(Capability::Texture2D, previous.texture_2d);
        self.line_width(previous.line_width);
        self.point_size(previous.point_size);
        if self.caps.polygon_mode_supported() {
            self.polygon_mode(previous.fill_mode);
        }
        self.state.line_smooth = previous.line_smooth;
        self.pending_line_smooth = true;

        // Native clip planes went with the context.
        if let Some(r) = self.clip.top() {
            self.apply_clip_rect(r);
        }
        self.check("reload");
    }

    /// Deletes the objects the backend created for itself: streaming buffers
    /// and the base program. Runs on drop while the native context is
    /// current; [`reload`](Self::reload) brings them back.
    #[track_caller]
    pub fn release(&mut self) {
        if !self.native.has_current_context() {
            return;
        }
        self.backend.release(&mut self.native);
        self.check("release");
    }
}

impl<N: NativeGl> Drop for GlContext<N> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gl::{AttribData, ComponentType, GlError};
    use crate::headless::HeadlessGl;

    fn ctx(native: HeadlessGl) -> GlContext<HeadlessGl> {
        GlContext::new(native, GlConfig::default())
    }

    fn r(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, w, h)
    }

    // ── creation ───────────────────────────────────────────────────────────

    #[test]
    fn backend_follows_version_string() {
        assert_eq!(ctx(HeadlessGl::legacy(8, 8)).version(), GlVersion::Legacy);
        assert_eq!(ctx(HeadlessGl::core(8, 8)).version(), GlVersion::Core);
        assert_eq!(ctx(HeadlessGl::mobile(8, 8)).version(), GlVersion::Mobile);
    }

    #[test]
    fn config_version_overrides_detection() {
        let cfg = GlConfig {
            version: Some(GlVersion::Mobile),
            ..GlConfig::default()
        };
        let gl = GlContext::new(HeadlessGl::core(8, 8), cfg);
        assert_eq!(gl.version(), GlVersion::Mobile);
        assert!(!gl.quads_supported());
    }

    #[test]
    #[should_panic]
    fn creation_without_context_panics() {
        let mut native = HeadlessGl::legacy(8, 8);
        native.lose_context();
        let _ = ctx(native);
    }

    #[test]
    fn emulated_backends_install_base_program() {
        let gl = ctx(HeadlessGl::core(8, 8));
        assert_ne!(gl.base_program(), 0);
        assert_eq!(gl.current_program(), gl.base_program());
        assert_eq!(ctx(HeadlessGl::legacy(8, 8)).base_program(), 0);
    }

    #[test]
    fn shading_language_reported_only_with_shader_support() {
        let gl = ctx(HeadlessGl::with_strings("2.1 test", "", 8, 8));
        assert_eq!(gl.shading_language_version(), "Shaders not supported");
        let gl = ctx(HeadlessGl::core(8, 8));
        assert_ne!(gl.shading_language_version(), "Shaders not supported");
    }

    // ── matrices ───────────────────────────────────────────────────────────

    #[test]
    fn legacy_matrix_calls_reach_fixed_function() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        gl.matrix_mode(MatrixMode::ModelView);
        gl.push_matrix();
        gl.translate(3.0, 4.0, 0.0);
        assert_eq!(gl.native().ff_matrix(MatrixMode::ModelView), gl.current_matrix(MatrixMode::ModelView));
        gl.pop_matrix();
        assert_eq!(gl.current_matrix(MatrixMode::ModelView), Mat4::IDENTITY);
        assert_eq!(gl.native().ff_matrix(MatrixMode::ModelView), Mat4::IDENTITY);
    }

    #[test]
    fn pop_on_last_entry_is_not_forwarded() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        gl.pop_matrix();
        assert_eq!(gl.native().count_calls("ff_pop_matrix"), 0);
        assert_eq!(gl.matrix_depth(MatrixMode::ModelView), 1);
    }

    #[test]
    fn project_round_trips_through_unproject() {
        let mut gl = ctx(HeadlessGl::core(64, 32));
        gl.set_ortho_2d(Viewport::new(64.0, 32.0));
        gl.translate(5.0, 6.0, 0.0);
        let win = gl.project(10.0, 10.0, 0.0).unwrap();
        assert!((win[0] - 15.0).abs() < 1e-3);
        assert!((win[1] - 16.0).abs() < 1e-3);
        let obj = gl.unproject(win[0], win[1], win[2]).unwrap();
        assert!((obj[0] - 10.0).abs() < 1e-3 && (obj[1] - 10.0).abs() < 1e-3);
    }

    // ── clipping ───────────────────────────────────────────────────────────

    #[test]
    fn nested_clips_intersect_and_restore() {
        let mut gl = ctx(HeadlessGl::core(32, 32));
        assert!(gl.clip_2d_plane_enable(r(0.0, 0.0, 20.0, 20.0)));
        assert!(gl.clip_2d_plane_enable(r(10.0, 10.0, 20.0, 20.0)));
        assert_eq!(gl.clip_rect(), Some(r(10.0, 10.0, 10.0, 10.0)));
        assert!(gl.clip_2d_plane_disable());
        assert_eq!(gl.clip_rect(), Some(r(0.0, 0.0, 20.0, 20.0)));
        assert!(gl.clip_2d_plane_disable());
        assert_eq!(gl.clip_rect(), None);
        assert!(!gl.clip_2d_plane_disable());
    }

    #[test]
    fn clip_overflow_is_refused() {
        let cfg = GlConfig {
            clip_depth: 2,
            ..GlConfig::default()
        };
        let mut gl = GlContext::new(HeadlessGl::legacy(32, 32), cfg);
        assert!(gl.clip_2d_plane_enable(r(0.0, 0.0, 30.0, 30.0)));
        assert!(gl.clip_2d_plane_enable(r(0.0, 0.0, 20.0, 20.0)));
        let planes = gl.native().count_calls("ff_clip_plane");
        assert!(!gl.clip_2d_plane_enable(r(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(gl.clip_depth(), 2);
        assert_eq!(gl.clip_rect(), Some(r(0.0, 0.0, 20.0, 20.0)));
        assert_eq!(gl.native().count_calls("ff_clip_plane"), planes);
    }

    #[test]
    fn legacy_clip_uses_native_planes() {
        let mut gl = ctx(HeadlessGl::legacy(32, 32));
        gl.clip_2d_plane_enable(r(1.0, 2.0, 3.0, 4.0));
        assert!(gl.native().is_enabled(Capability::ClipPlane(0)));
        assert!(gl.native().is_enabled(Capability::ClipPlane(3)));
        gl.clip_2d_plane_disable();
        assert!(!gl.native().is_enabled(Capability::ClipPlane(0)));
    }

    // ── state caching ──────────────────────────────────────────────────────

    #[test]
    fn blend_mode_is_cached() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let before = gl.native().call_count();
        gl.set_blend_mode(BlendMode::Alpha);
        assert_eq!(gl.native().call_count(), before);

        gl.set_blend_mode(BlendMode::None);
        assert!(!gl.native().is_enabled(Capability::Blend));
        gl.set_blend_mode(BlendMode::Add);
        assert!(gl.native().is_enabled(Capability::Blend));
        assert_eq!(gl.state().blend, Some(BlendMode::Add));
    }

    #[test]
    fn unsupported_blend_equation_falls_back_to_add() {
        let mut gl = ctx(HeadlessGl::with_strings("2.1 test", "", 8, 8));
        gl.blend_equation_separate(BlendEquation::Max, BlendEquation::Add);
        assert_eq!(gl.state().blend_equation, (BlendEquation::Add, BlendEquation::Add));
    }

    #[test]
    fn wide_lines_skipped_on_core() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        gl.line_width(3.0);
        assert_eq!(gl.state().line_width, 3.0);
        assert_eq!(gl.native().count_calls("line_width"), 0);

        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        gl.line_width(3.0);
        gl.line_width(3.0);
        assert_eq!(gl.native().count_calls("line_width"), 1);
    }

    #[test]
    fn polygon_mode_ignored_on_mobile() {
        let mut gl = ctx(HeadlessGl::mobile(8, 8));
        gl.polygon_mode(FillMode::Line);
        assert_eq!(gl.native().count_calls("polygon_mode"), 0);
        assert_eq!(gl.state().fill_mode, FillMode::Fill);
    }

    #[test]
    fn core_skips_unbinding_texture_zero() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        gl.bind_texture(7);
        gl.bind_texture(0);
        assert_eq!(gl.state().texture, 7);
        assert_eq!(gl.native().count_calls("bind_texture"), 1);
    }

    #[test]
    fn set_shader_without_support_fails() {
        let mut gl = ctx(HeadlessGl::with_strings("2.1 test", "", 8, 8));
        assert!(!gl.set_shader(Some(3)));
        assert_eq!(gl.state().shader, None);
    }

    // ── drawing ────────────────────────────────────────────────────────────

    #[test]
    fn quads_become_indexed_triangles_on_core() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        gl.draw_arrays(PrimitiveType::Quads, 0, 8);
        assert_eq!(gl.native().count_calls("draw_arrays"), 0);
        assert_eq!(gl.native().count_calls("draw_elements"), 1);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Triangles, 12)));
        assert_eq!(gl.error_count(), 0);
    }

    #[test]
    fn polygon_becomes_fan_without_quads() {
        let mut gl = ctx(HeadlessGl::mobile(8, 8));
        gl.draw_arrays(PrimitiveType::Polygon, 0, 5);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::TriangleFan, 5)));

        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        gl.draw_arrays(PrimitiveType::Polygon, 0, 5);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Polygon, 5)));
    }

    #[test]
    fn empty_draws_are_skipped() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        gl.draw_arrays(PrimitiveType::Triangles, 0, 0);
        assert_eq!(gl.native().draw_count(), 0);
    }

    #[test]
    fn native_errors_are_counted() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        gl.native_mut().inject_error(GlError::InvalidValue);
        gl.clear();
        if cfg!(debug_assertions) {
            assert_eq!(gl.error_count(), 1);
        }
    }

    #[test]
    fn release_deletes_backend_objects() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let base = gl.base_program();
        let points = [0.0f32, 0.0, 4.0, 0.0, 0.0, 4.0];
        gl.enable_client_state(ClientArray::Vertex);
        gl.vertex_pointer(&AttribPointer {
            size: 2,
            ty: ComponentType::F32,
            normalized: false,
            stride: 0,
            data: AttribData::Client(bytemuck::cast_slice(&points)),
        });
        gl.draw_arrays(PrimitiveType::Triangles, 0, 3);
        assert!(gl.native().buffer_count() > 0);

        gl.release();
        assert_eq!(gl.native().buffer_count(), 0);
        assert!(!gl.native().is_program(base));
        assert_eq!(gl.base_program(), 0);

        gl.release();
        gl.reload();
        assert_ne!(gl.base_program(), 0);
    }

    #[test]
    fn reload_rebuilds_base_program() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        gl.native_mut().lose_context();
        gl.native_mut().restore_context();
        gl.reload();
        assert_ne!(gl.base_program(), 0);
        assert_eq!(gl.current_program(), gl.base_program());
    }
}
