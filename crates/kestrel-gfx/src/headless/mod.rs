//! A software [`NativeGl`] device.
//!
//! Used by the test suite and for offscreen rendering without a GPU. It
//! validates calls the way a driver would (raising [`GlError`]s instead of
//! crashing), keeps a log of the calls it received, and rasterizes into an
//! RGBA framebuffer. Textures sample as opaque white.
//!
//! The version string decides which entry points are legal: fixed-function
//! calls, quads and client-side arrays behave as on a legacy, core-profile
//! or GLES 2 driver respectively.

pub(crate) mod raster;

use std::collections::{HashMap, HashSet, VecDeque};

use crate::coords::Mat4;
use crate::gl::{
    AttribData, AttribPointer, BlendEquation, BlendFactor, BufferTarget, BufferUsage, Capability, ClientArray,
    ComponentType, Extension, FillMode, GlError, GlVersion, IndexData, MatrixMode, MatrixStacks, NativeGl,
    PrimitiveType, ShaderKind, StringName, MAX_CLIP_PLANES,
};
use crate::shader::builtin;
use crate::shader::reflect::{self, Declarations};

use raster::{BlendSetup, Framebuffer, RasterState, RasterVertex};

/// Work recorded instead of rasterized while capturing.
#[derive(Debug, Clone)]
pub(crate) enum Captured {
    Clear { color: [f32; 4], scissor: Option<[i32; 4]> },
    Draw { mode: PrimitiveType, outline: bool, vertices: Vec<RasterVertex>, state: RasterState },
}

const MAX_ATTRIBS: usize = 16;
const MAX_TEXTURE_UNITS: u32 = 8;

/// A uniform as last written by the program's user.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

#[derive(Debug, Clone)]
enum Source {
    Client(Vec<u8>),
    Buffer { id: u32, offset: usize },
}

#[derive(Debug, Clone)]
struct StoredPointer {
    size: u8,
    ty: ComponentType,
    normalized: bool,
    stride: usize,
    source: Source,
}

#[derive(Debug)]
struct ShaderObject {
    kind: ShaderKind,
    compiled: bool,
    log: String,
    decls: Declarations,
}

#[derive(Debug, Default)]
struct ProgramObject {
    shaders: Vec<u32>,
    linked: bool,
    log: String,
    uniforms: HashMap<String, i32>,
    uniform_slots: i32,
    attribs: HashMap<String, u32>,
    values: HashMap<i32, UniformValue>,
}

impl ProgramObject {
    fn value(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).and_then(|loc| self.values.get(loc)).copied()
    }

    fn int(&self, name: &str) -> i32 {
        match self.value(name) {
            Some(UniformValue::Int(v)) => v,
            _ => 0,
        }
    }

    fn mat(&self, name: &str) -> Mat4 {
        match self.value(name) {
            Some(UniformValue::Mat4(m)) => Mat4::from_cols_array(m),
            _ => Mat4::IDENTITY,
        }
    }
}

/// Where a draw reads its vertices from.
struct Pipeline {
    position: StoredPointer,
    color: Option<StoredPointer>,
    modelview: Mat4,
    projection: Mat4,
    clip_planes: Vec<[f32; 4]>,
    point_size: f32,
}

pub struct HeadlessGl {
    version: String,
    extensions: String,
    api: GlVersion,
    current: bool,

    calls: Vec<&'static str>,
    draws: usize,
    last_draw: Option<(PrimitiveType, usize)>,
    errors: VecDeque<GlError>,
    fail_buffers: bool,
    fail_compile: bool,
    next_id: u32,

    enabled: HashSet<Capability>,
    blend: BlendSetup,
    line_width: f32,
    point_size: f32,
    fill: FillMode,
    viewport: [i32; 4],
    scissor: [i32; 4],
    clear_color: [f32; 4],
    texture_unit: u32,
    textures: [u32; MAX_TEXTURE_UNITS as usize],

    buffers: HashMap<u32, Vec<u8>>,
    array_buffer: u32,
    element_buffer: u32,
    shaders: HashMap<u32, ShaderObject>,
    programs: HashMap<u32, ProgramObject>,
    program: u32,
    attribs: Vec<(bool, Option<StoredPointer>)>,

    ff: MatrixStacks,
    ff_client_unit: u32,
    ff_arrays: [(bool, Option<StoredPointer>); 6],
    ff_clip: [[f32; 4]; MAX_CLIP_PLANES],

    fb: Framebuffer,
    recording: Option<Vec<Captured>>,
}

impl HeadlessGl {
    /// A GL 2.1 driver listing every extension the state layer knows.
    pub fn legacy(width: u32, height: u32) -> Self {
        let extensions: Vec<&str> = Extension::ALL.iter().map(|e| e.names()[0]).collect();
        Self::with_strings("2.1 Headless", &extensions.join(" "), width, height)
    }

    /// A GL 3.3 core-profile driver.
    pub fn core(width: u32, height: u32) -> Self {
        Self::with_strings("3.3 Headless", "", width, height)
    }

    /// A GLES 2.0 driver.
    pub fn mobile(width: u32, height: u32) -> Self {
        Self::with_strings("OpenGL ES 2.0 Headless", "GL_OES_point_sprite GL_EXT_blend_minmax", width, height)
    }

    pub fn with_strings(version: &str, extensions: &str, width: u32, height: u32) -> Self {
        let mut gl = Self {
            version: version.to_owned(),
            extensions: extensions.to_owned(),
            api: GlVersion::detect(version),
            current: true,
            calls: Vec::new(),
            draws: 0,
            last_draw: None,
            errors: VecDeque::new(),
            fail_buffers: false,
            fail_compile: false,
            next_id: 1,
            enabled: HashSet::new(),
            blend: BlendSetup::default(),
            line_width: 1.0,
            point_size: 1.0,
            fill: FillMode::Fill,
            viewport: [0, 0, width as i32, height as i32],
            scissor: [0, 0, width as i32, height as i32],
            clear_color: [0.0; 4],
            texture_unit: 0,
            textures: [0; MAX_TEXTURE_UNITS as usize],
            buffers: HashMap::new(),
            array_buffer: 0,
            element_buffer: 0,
            shaders: HashMap::new(),
            programs: HashMap::new(),
            program: 0,
            attribs: vec![(false, None); MAX_ATTRIBS],
            ff: MatrixStacks::new(),
            ff_client_unit: 0,
            ff_arrays: Default::default(),
            ff_clip: [[0.0; 4]; MAX_CLIP_PLANES],
            fb: Framebuffer::new(width, height),
            recording: None,
        };
        gl.reset_state();
        gl
    }

    fn reset_state(&mut self) {
        let (w, h) = self.fb.size();
        self.enabled.clear();
        self.blend = BlendSetup::default();
        self.line_width = 1.0;
        self.point_size = 1.0;
        self.fill = FillMode::Fill;
        self.viewport = [0, 0, w as i32, h as i32];
        self.scissor = [0, 0, w as i32, h as i32];
        self.clear_color = [0.0; 4];
        self.texture_unit = 0;
        self.textures = [0; MAX_TEXTURE_UNITS as usize];
        self.buffers.clear();
        self.array_buffer = 0;
        self.element_buffer = 0;
        self.shaders.clear();
        self.programs.clear();
        self.program = 0;
        self.attribs = vec![(false, None); MAX_ATTRIBS];
        self.ff = MatrixStacks::new();
        self.ff_client_unit = 0;
        self.ff_arrays = Default::default();
        self.ff_clip = [[0.0; 4]; MAX_CLIP_PLANES];
    }

    // ── inspection ─────────────────────────────────────────────────────────

    /// Names of the native calls received, in order.
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.calls.iter().filter(|c| **c == name).count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Draw calls that passed validation.
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    /// Mode and vertex count of the last draw.
    pub fn last_draw(&self) -> Option<(PrimitiveType, usize)> {
        self.last_draw
    }

    /// RGBA pixel with a top-left origin.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.fb.pixel(x, y)
    }

    pub fn is_enabled(&self, cap: Capability) -> bool {
        self.enabled.contains(&cap)
    }

    pub fn ff_matrix(&self, mode: MatrixMode) -> Mat4 {
        self.ff.current(mode)
    }

    /// Eye-space equation of fixed-function clip plane `index`.
    pub fn ff_clip_plane_equation(&self, index: usize) -> [f32; 4] {
        self.ff_clip.get(index).copied().unwrap_or_default()
    }

    /// Accepted line width; rasterized lines are always one pixel wide.
    pub fn current_line_width(&self) -> f32 {
        self.line_width
    }

    pub fn current_program(&self) -> u32 {
        self.program
    }

    pub fn bound_texture(&self) -> u32 {
        self.textures[self.texture_unit as usize]
    }

    pub fn buffer(&self, id: u32) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_program(&self, id: u32) -> bool {
        self.programs.contains_key(&id)
    }

    pub fn is_shader(&self, id: u32) -> bool {
        self.shaders.contains_key(&id)
    }

    pub fn uniform(&self, program: u32, name: &str) -> Option<UniformValue> {
        self.programs.get(&program)?.value(name)
    }

    // ── capture ────────────────────────────────────────────────────────────

    /// Records clears and transformed draws instead of rasterizing them.
    pub(crate) fn start_capture(&mut self) {
        self.recording.get_or_insert_with(Vec::new);
    }

    /// Work recorded since the last call; empty when not capturing.
    pub(crate) fn take_captured(&mut self) -> Vec<Captured> {
        self.recording.as_mut().map(std::mem::take).unwrap_or_default()
    }

    // ── fault injection ────────────────────────────────────────────────────

    /// Queues `err` for the next `get_error`.
    pub fn inject_error(&mut self, err: GlError) {
        self.errors.push_back(err);
    }

    /// Makes `gen_buffer` fail while set.
    pub fn fail_buffer_creation(&mut self, fail: bool) {
        self.fail_buffers = fail;
    }

    /// Makes every shader compilation fail while set.
    pub fn fail_shader_compile(&mut self, fail: bool) {
        self.fail_compile = fail;
    }

    /// Drops every object and ignores calls until [`restore_context`](Self::restore_context).
    pub fn lose_context(&mut self) {
        log::debug!("headless: context lost");
        self.current = false;
        self.reset_state();
    }

    /// A fresh context: default state, no objects. Ids handed out before the
    /// loss are never reused.
    pub fn restore_context(&mut self) {
        log::debug!("headless: context restored");
        self.current = true;
        self.reset_state();
    }

    // ── helpers ────────────────────────────────────────────────────────────

    /// Logs `name`; `false` when there is no context to run it on.
    fn record(&mut self, name: &'static str) -> bool {
        self.calls.push(name);
        self.current
    }

    fn raise(&mut self, err: GlError) {
        self.errors.push_back(err);
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn require_legacy(&mut self) -> bool {
        if self.api != GlVersion::Legacy {
            self.raise(GlError::InvalidOperation);
            return false;
        }
        true
    }

    fn capture(&mut self, ptr: &AttribPointer<'_>) -> Option<StoredPointer> {
        let source = match ptr.data {
            AttribData::Client(bytes) => Source::Client(bytes.to_vec()),
            AttribData::Offset(offset) => {
                if self.array_buffer == 0 {
                    self.raise(GlError::InvalidOperation);
                    return None;
                }
                Source::Buffer {
                    id: self.array_buffer,
                    offset,
                }
            }
        };
        Some(StoredPointer {
            size: ptr.size,
            ty: ptr.ty,
            normalized: ptr.normalized,
            stride: ptr.effective_stride(),
            source,
        })
    }

    fn ff_slot(&self, array: ClientArray) -> usize {
        match array {
            ClientArray::Vertex => 0,
            ClientArray::Color => 1,
            ClientArray::TexCoord => 2 + self.ff_client_unit.min(3) as usize,
        }
    }

    /// Reads vertex `index` of `ptr`, filling missing components as GL does.
    fn fetch(&self, ptr: &StoredPointer, index: u32) -> Option<[f32; 4]> {
        let bytes: &[u8] = match &ptr.source {
            Source::Client(v) => v,
            Source::Buffer { id, offset } => self.buffers.get(id)?.get(*offset..)?,
        };
        let comp = ptr.ty.size();
        let start = index as usize * ptr.stride;
        let data = bytes.get(start..start + ptr.size as usize * comp)?;

        let mut out = [0.0, 0.0, 0.0, 1.0];
        for (i, chunk) in data.chunks_exact(comp).enumerate() {
            out[i] = match ptr.ty {
                ComponentType::F32 => bytemuck::pod_read_unaligned::<f32>(chunk),
                ComponentType::U8 if ptr.normalized => chunk[0] as f32 / 255.0,
                ComponentType::U8 => chunk[0] as f32,
            };
        }
        Some(out)
    }

    fn pipeline(&mut self) -> Option<Pipeline> {
        if self.program != 0 {
            let prog = self.programs.get(&self.program)?;
            if let Some(&vloc) = prog.attribs.get(builtin::ATTR_VERTEX) {
                let enabled = |loc: u32| match &self.attribs[loc as usize] {
                    (true, Some(p)) => Some(p.clone()),
                    _ => None,
                };
                let position = enabled(vloc)?;
                let color = prog.attribs.get(builtin::ATTR_COLOR).and_then(|&l| enabled(l));
                let clip_planes = if prog.int(builtin::UNIFORM_CLIPPING) == 1 {
                    (0..MAX_CLIP_PLANES)
                        .filter(|i| prog.int(&format!("{}[{i}]", builtin::UNIFORM_CLIP_ENABLED)) == 1)
                        .filter_map(|i| match prog.value(&format!("{}[{i}]", builtin::UNIFORM_CLIP_PLANE)) {
                            Some(UniformValue::Vec4(p)) => Some(p),
                            _ => None,
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                let point_size = match prog.value(builtin::UNIFORM_POINT_SIZE) {
                    Some(UniformValue::Float(s)) => s,
                    _ => 1.0,
                };
                return Some(Pipeline {
                    position,
                    color,
                    modelview: prog.mat(builtin::UNIFORM_MODELVIEW),
                    projection: prog.mat(builtin::UNIFORM_PROJECTION),
                    clip_planes,
                    point_size,
                });
            }
        }

        // Fixed function, also feeding legacy programs through the built-ins.
        if self.api != GlVersion::Legacy {
            self.raise(GlError::InvalidOperation);
            return None;
        }
        let position = match &self.ff_arrays[0] {
            (true, Some(p)) => p.clone(),
            _ => return None,
        };
        let color = match &self.ff_arrays[1] {
            (true, Some(p)) => Some(p.clone()),
            _ => None,
        };
        let clip_planes = (0..MAX_CLIP_PLANES)
            .filter(|i| self.enabled.contains(&Capability::ClipPlane(*i as u8)))
            .map(|i| self.ff_clip[i])
            .collect();
        Some(Pipeline {
            position,
            color,
            modelview: self.ff.current(MatrixMode::ModelView),
            projection: self.ff.current(MatrixMode::Projection),
            clip_planes,
            point_size: self.point_size,
        })
    }

    fn draw(&mut self, mode: PrimitiveType, indices: &[u32]) {
        if matches!(mode, PrimitiveType::Quads | PrimitiveType::Polygon) && self.api != GlVersion::Legacy {
            self.raise(GlError::InvalidEnum);
            return;
        }
        self.draws += 1;
        self.last_draw = Some((mode, indices.len()));

        let Some(pipe) = self.pipeline() else { return };
        let [vx, vy, vw, vh] = self.viewport.map(|v| v as f32);

        let mut verts = Vec::with_capacity(indices.len());
        for &i in indices {
            let Some(pos) = self.fetch(&pipe.position, i) else {
                self.raise(GlError::InvalidOperation);
                return;
            };
            // Current color when no array is enabled.
            let color = match &pipe.color {
                Some(c) => self.fetch(c, i).unwrap_or([1.0; 4]),
                None => [1.0; 4],
            };
            let eye = pipe.modelview.transform(pos);
            let clip = pipe.projection.transform(eye);
            if clip[3] == 0.0 {
                return;
            }
            let ndc = [clip[0] / clip[3], clip[1] / clip[3]];
            verts.push(RasterVertex {
                win: [vx + (ndc[0] + 1.0) * 0.5 * vw, vy + (ndc[1] + 1.0) * 0.5 * vh],
                color,
                eye,
            });
        }

        let state = RasterState {
            blend: self.enabled.contains(&Capability::Blend).then_some(self.blend),
            scissor: self.enabled.contains(&Capability::ScissorTest).then_some(self.scissor),
            clip_planes: pipe.clip_planes,
            point_size: pipe.point_size,
        };
        if let Some(captured) = self.recording.as_mut() {
            let outline = self.fill == FillMode::Line;
            captured.push(Captured::Draw { mode, outline, vertices: verts, state });
            return;
        }
        self.rasterize(mode, &verts, &state);
    }

    fn rasterize(&mut self, mode: PrimitiveType, v: &[RasterVertex], st: &RasterState) {
        let outline = self.fill == FillMode::Line;
        let fb = &mut self.fb;

        match mode {
            PrimitiveType::Points => v.iter().for_each(|p| fb.point(st, p)),
            PrimitiveType::Lines => v.chunks_exact(2).for_each(|l| fb.line(st, &l[0], &l[1])),
            PrimitiveType::LineStrip => v.windows(2).for_each(|l| fb.line(st, &l[0], &l[1])),
            PrimitiveType::LineLoop => {
                v.windows(2).for_each(|l| fb.line(st, &l[0], &l[1]));
                if let (true, Some(last), Some(first)) = (v.len() > 2, v.last(), v.first()) {
                    fb.line(st, last, first);
                }
            }
            PrimitiveType::Triangles => {
                v.chunks_exact(3).for_each(|t| triangle(fb, st, outline, &t[0], &t[1], &t[2]))
            }
            PrimitiveType::TriangleStrip => {
                for i in 0..v.len().saturating_sub(2) {
                    if i % 2 == 0 {
                        triangle(fb, st, outline, &v[i], &v[i + 1], &v[i + 2]);
                    } else {
                        triangle(fb, st, outline, &v[i + 1], &v[i], &v[i + 2]);
                    }
                }
            }
            PrimitiveType::TriangleFan => {
                for i in 1..v.len().saturating_sub(1) {
                    triangle(fb, st, outline, &v[0], &v[i], &v[i + 1]);
                }
            }
            PrimitiveType::Quads => {
                for q in v.chunks_exact(4) {
                    if outline {
                        (0..4).for_each(|i| fb.line(st, &q[i], &q[(i + 1) % 4]));
                    } else {
                        fb.triangle(st, &q[0], &q[1], &q[2]);
                        fb.triangle(st, &q[0], &q[2], &q[3]);
                    }
                }
            }
            PrimitiveType::Polygon => {
                if outline {
                    (0..v.len()).for_each(|i| fb.line(st, &v[i], &v[(i + 1) % v.len()]));
                } else {
                    for i in 1..v.len().saturating_sub(1) {
                        fb.triangle(st, &v[0], &v[i], &v[i + 1]);
                    }
                }
            }
        }
    }
}

/// Filled or, in line mode, outlined triangle.
fn triangle(fb: &mut Framebuffer, st: &RasterState, outline: bool, a: &RasterVertex, b: &RasterVertex, c: &RasterVertex) {
    if outline {
        fb.line(st, a, b);
        fb.line(st, b, c);
        fb.line(st, c, a);
    } else {
        fb.triangle(st, a, b, c);
    }
}

impl NativeGl for HeadlessGl {
    fn has_current_context(&self) -> bool {
        self.current
    }

    fn get_string(&self, name: StringName) -> String {
        match name {
            StringName::Vendor => "kestrel".to_owned(),
            StringName::Renderer => "headless rasterizer".to_owned(),
            StringName::Version => self.version.clone(),
            StringName::ShadingLanguageVersion => match self.api {
                GlVersion::Legacy => "1.20".to_owned(),
                GlVersion::Core => "3.30".to_owned(),
                GlVersion::Mobile => "OpenGL ES GLSL ES 1.00".to_owned(),
            },
        }
    }

    fn extensions(&self) -> String {
        self.extensions.clone()
    }

    fn get_error(&mut self) -> Option<GlError> {
        self.errors.pop_front()
    }

    fn enable(&mut self, cap: Capability) {
        if !self.record("enable") {
            return;
        }
        match cap {
            Capability::LineSmooth if self.api == GlVersion::Mobile => self.raise(GlError::InvalidEnum),
            Capability::ClipPlane(_) if self.api != GlVersion::Legacy => self.raise(GlError::InvalidEnum),
            Capability::ClipPlane(i) if i as usize >= MAX_CLIP_PLANES => self.raise(GlError::InvalidEnum),
            _ => {
                self.enabled.insert(cap);
            }
        }
    }

    fn disable(&mut self, cap: Capability) {
        if !self.record("disable") {
            return;
        }
        match cap {
            Capability::LineSmooth if self.api == GlVersion::Mobile => self.raise(GlError::InvalidEnum),
            Capability::ClipPlane(_) if self.api != GlVersion::Legacy => self.raise(GlError::InvalidEnum),
            _ => {
                self.enabled.remove(&cap);
            }
        }
    }

    fn blend_func(&mut self, src: BlendFactor, dst: BlendFactor) {
        if !self.record("blend_func") {
            return;
        }
        self.blend.src_rgb = src;
        self.blend.dst_rgb = dst;
        self.blend.src_alpha = src;
        self.blend.dst_alpha = dst;
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    ) {
        if !self.record("blend_func_separate") {
            return;
        }
        self.blend.src_rgb = src_rgb;
        self.blend.dst_rgb = dst_rgb;
        self.blend.src_alpha = src_alpha;
        self.blend.dst_alpha = dst_alpha;
    }

    fn blend_equation_separate(&mut self, rgb: BlendEquation, alpha: BlendEquation) {
        if !self.record("blend_equation_separate") {
            return;
        }
        self.blend.eq_rgb = rgb;
        self.blend.eq_alpha = alpha;
    }

    fn line_width(&mut self, width: f32) {
        if !self.record("line_width") {
            return;
        }
        if width <= 0.0 || (width > 1.0 && self.api == GlVersion::Core) {
            self.raise(GlError::InvalidValue);
            return;
        }
        self.line_width = width;
    }

    fn point_size(&mut self, size: f32) {
        if !self.record("point_size") {
            return;
        }
        if !self.require_legacy() {
            return;
        }
        if size <= 0.0 {
            self.raise(GlError::InvalidValue);
            return;
        }
        self.point_size = size;
    }

    fn polygon_mode(&mut self, mode: FillMode) {
        if !self.record("polygon_mode") {
            return;
        }
        if self.api == GlVersion::Mobile {
            self.raise(GlError::InvalidOperation);
            return;
        }
        self.fill = mode;
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if !self.record("viewport") {
            return;
        }
        if width < 0 || height < 0 {
            self.raise(GlError::InvalidValue);
            return;
        }
        self.viewport = [x, y, width, height];
    }

    fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        if !self.record("scissor") {
            return;
        }
        if width < 0 || height < 0 {
            self.raise(GlError::InvalidValue);
            return;
        }
        self.scissor = [x, y, width, height];
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        if self.record("clear_color") {
            self.clear_color = rgba;
        }
    }

    fn clear(&mut self) {
        if !self.record("clear") {
            return;
        }
        let scissor = self.enabled.contains(&Capability::ScissorTest).then_some(self.scissor);
        if let Some(captured) = self.recording.as_mut() {
            captured.push(Captured::Clear { color: self.clear_color, scissor });
            return;
        }
        self.fb.clear(self.clear_color, scissor);
    }

    fn active_texture(&mut self, unit: u32) {
        if !self.record("active_texture") {
            return;
        }
        if unit >= MAX_TEXTURE_UNITS {
            self.raise(GlError::InvalidEnum);
            return;
        }
        self.texture_unit = unit;
    }

    fn bind_texture(&mut self, texture: u32) {
        if self.record("bind_texture") {
            self.textures[self.texture_unit as usize] = texture;
        }
    }

    fn gen_buffer(&mut self) -> Option<u32> {
        if !self.record("gen_buffer") || self.fail_buffers {
            return None;
        }
        let id = self.alloc_id();
        self.buffers.insert(id, Vec::new());
        Some(id)
    }

    fn delete_buffer(&mut self, buffer: u32) {
        if !self.record("delete_buffer") {
            return;
        }
        self.buffers.remove(&buffer);
        if self.array_buffer == buffer {
            self.array_buffer = 0;
        }
        if self.element_buffer == buffer {
            self.element_buffer = 0;
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: u32) {
        if !self.record("bind_buffer") {
            return;
        }
        if buffer != 0 && !self.buffers.contains_key(&buffer) {
            self.raise(GlError::InvalidOperation);
            return;
        }
        match target {
            BufferTarget::Array => self.array_buffer = buffer,
            BufferTarget::ElementArray => self.element_buffer = buffer,
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        if !self.record("buffer_data") {
            return;
        }
        let bound = match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        };
        match self.buffers.get_mut(&bound) {
            Some(buf) => *buf = data.to_vec(),
            None => self.raise(GlError::InvalidOperation),
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        if !self.record("buffer_sub_data") {
            return;
        }
        let bound = match target {
            BufferTarget::Array => self.array_buffer,
            BufferTarget::ElementArray => self.element_buffer,
        };
        let Some(buf) = self.buffers.get_mut(&bound) else {
            self.raise(GlError::InvalidOperation);
            return;
        };
        match buf.get_mut(offset..offset + data.len()) {
            Some(dst) => dst.copy_from_slice(data),
            None => self.raise(GlError::InvalidValue),
        }
    }

    fn create_shader(&mut self, kind: ShaderKind) -> Option<u32> {
        if !self.record("create_shader") {
            return None;
        }
        let id = self.alloc_id();
        self.shaders.insert(
            id,
            ShaderObject {
                kind,
                compiled: false,
                log: String::new(),
                decls: Declarations::default(),
            },
        );
        Some(id)
    }

    fn compile_shader(&mut self, shader: u32, source: &str) -> bool {
        if !self.record("compile_shader") {
            return false;
        }
        let fail = self.fail_compile;
        let Some(obj) = self.shaders.get_mut(&shader) else {
            self.raise(GlError::InvalidValue);
            return false;
        };
        obj.compiled = !fail && !source.trim().is_empty() && !source.contains("#error");
        if obj.compiled {
            obj.log.clear();
            obj.decls = reflect::scan(source, obj.kind);
        } else {
            obj.log = "0:1(1): error: syntax error, unexpected end of file".to_owned();
        }
        obj.compiled
    }

    fn shader_info_log(&self, shader: u32) -> String {
        self.shaders.get(&shader).map(|s| s.log.clone()).unwrap_or_default()
    }

    fn delete_shader(&mut self, shader: u32) {
        if self.record("delete_shader") {
            self.shaders.remove(&shader);
        }
    }

    fn create_program(&mut self) -> Option<u32> {
        if !self.record("create_program") {
            return None;
        }
        let id = self.alloc_id();
        self.programs.insert(id, ProgramObject::default());
        Some(id)
    }

    fn attach_shader(&mut self, program: u32, shader: u32) {
        if !self.record("attach_shader") {
            return;
        }
        match (self.programs.get_mut(&program), self.shaders.contains_key(&shader)) {
            (Some(p), true) => p.shaders.push(shader),
            _ => self.raise(GlError::InvalidValue),
        }
    }

    fn link_program(&mut self, program: u32) -> bool {
        if !self.record("link_program") {
            return false;
        }
        let Some(attached) = self.programs.get(&program).map(|p| p.shaders.clone()) else {
            self.raise(GlError::InvalidValue);
            return false;
        };

        let mut decls = Declarations::default();
        let (mut vertex, mut fragment, mut broken) = (false, false, false);
        for id in attached {
            // Shaders deleted after attaching stay alive until detached.
            let Some(s) = self.shaders.get(&id) else { continue };
            broken |= !s.compiled;
            vertex |= s.kind == ShaderKind::Vertex;
            fragment |= s.kind == ShaderKind::Fragment;
            decls.merge(s.decls.clone());
        }

        let Some(prog) = self.programs.get_mut(&program) else { return false };
        prog.uniforms.clear();
        prog.attribs.clear();
        prog.values.clear();
        prog.linked = vertex && fragment && !broken;
        if !prog.linked {
            prog.log = match (vertex, fragment) {
                (false, _) => "error: no vertex shader attached".to_owned(),
                (_, false) => "error: no fragment shader attached".to_owned(),
                _ => "error: attached shader not compiled".to_owned(),
            };
            return false;
        }

        let mut next = 0;
        for (name, len) in decls.uniforms {
            prog.uniforms.insert(name.clone(), next);
            if len > 1 {
                for i in 0..len {
                    prog.uniforms.insert(format!("{name}[{i}]"), next + i as i32);
                }
            }
            next += len as i32;
        }
        prog.uniform_slots = next;
        for (i, name) in decls.attributes.into_iter().enumerate() {
            prog.attribs.insert(name, i as u32);
        }
        prog.log.clear();
        true
    }

    fn program_info_log(&self, program: u32) -> String {
        self.programs.get(&program).map(|p| p.log.clone()).unwrap_or_default()
    }

    fn delete_program(&mut self, program: u32) {
        if !self.record("delete_program") {
            return;
        }
        self.programs.remove(&program);
        if self.program == program {
            self.program = 0;
        }
    }

    fn use_program(&mut self, program: u32) {
        if !self.record("use_program") {
            return;
        }
        if program != 0 && !self.programs.get(&program).is_some_and(|p| p.linked) {
            self.raise(GlError::InvalidOperation);
            return;
        }
        self.program = program;
    }

    fn uniform_location(&self, program: u32, name: &str) -> Option<i32> {
        let prog = self.programs.get(&program).filter(|p| p.linked)?;
        prog.uniforms.get(name).copied()
    }

    fn attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        let prog = self.programs.get(&program).filter(|p| p.linked)?;
        prog.attribs.get(name).copied()
    }

    fn uniform_1i(&mut self, location: i32, v: i32) {
        if self.record("uniform_1i") {
            self.set_uniform(location, UniformValue::Int(v));
        }
    }

    fn uniform_1f(&mut self, location: i32, v: f32) {
        if self.record("uniform_1f") {
            self.set_uniform(location, UniformValue::Float(v));
        }
    }

    fn uniform_2f(&mut self, location: i32, v: [f32; 2]) {
        if self.record("uniform_2f") {
            self.set_uniform(location, UniformValue::Vec2(v));
        }
    }

    fn uniform_4f(&mut self, location: i32, v: [f32; 4]) {
        if self.record("uniform_4f") {
            self.set_uniform(location, UniformValue::Vec4(v));
        }
    }

    fn uniform_matrix4(&mut self, location: i32, m: &[f32; 16]) {
        if self.record("uniform_matrix4") {
            self.set_uniform(location, UniformValue::Mat4(*m));
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        if !self.record("enable_vertex_attrib_array") {
            return;
        }
        match self.attribs.get_mut(index as usize) {
            Some(a) => a.0 = true,
            None => self.raise(GlError::InvalidValue),
        }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        if !self.record("disable_vertex_attrib_array") {
            return;
        }
        match self.attribs.get_mut(index as usize) {
            Some(a) => a.0 = false,
            None => self.raise(GlError::InvalidValue),
        }
    }

    fn vertex_attrib_pointer(&mut self, index: u32, ptr: &AttribPointer<'_>) {
        if !self.record("vertex_attrib_pointer") {
            return;
        }
        if index as usize >= MAX_ATTRIBS || !(1..=4).contains(&ptr.size) {
            self.raise(GlError::InvalidValue);
            return;
        }
        // Core profiles source attributes from buffer objects only.
        if self.api == GlVersion::Core && matches!(ptr.data, AttribData::Client(_)) {
            self.raise(GlError::InvalidOperation);
            return;
        }
        if let Some(p) = self.capture(ptr) {
            self.attribs[index as usize].1 = Some(p);
        }
    }

    fn ff_matrix_mode(&mut self, mode: MatrixMode) {
        if self.record("ff_matrix_mode") && self.require_legacy() {
            self.ff.set_mode(mode);
        }
    }

    fn ff_push_matrix(&mut self) {
        if self.record("ff_push_matrix") && self.require_legacy() && !self.ff.push() {
            self.raise(GlError::StackOverflow);
        }
    }

    fn ff_pop_matrix(&mut self) {
        if self.record("ff_pop_matrix") && self.require_legacy() && !self.ff.pop() {
            self.raise(GlError::StackUnderflow);
        }
    }

    fn ff_load_identity(&mut self) {
        if self.record("ff_load_identity") && self.require_legacy() {
            self.ff.load_identity();
        }
    }

    fn ff_load_matrix(&mut self, m: &[f32; 16]) {
        if self.record("ff_load_matrix") && self.require_legacy() {
            self.ff.load(Mat4::from_cols_array(*m));
        }
    }

    fn ff_mult_matrix(&mut self, m: &[f32; 16]) {
        if self.record("ff_mult_matrix") && self.require_legacy() {
            self.ff.mult(Mat4::from_cols_array(*m));
        }
    }

    fn ff_translate(&mut self, x: f32, y: f32, z: f32) {
        if self.record("ff_translate") && self.require_legacy() {
            self.ff.mult(Mat4::translation(x, y, z));
        }
    }

    fn ff_rotate(&mut self, degrees: f32, x: f32, y: f32, z: f32) {
        if self.record("ff_rotate") && self.require_legacy() {
            self.ff.mult(Mat4::rotation(degrees, x, y, z));
        }
    }

    fn ff_scale(&mut self, x: f32, y: f32, z: f32) {
        if self.record("ff_scale") && self.require_legacy() {
            self.ff.mult(Mat4::scaling(x, y, z));
        }
    }

    fn ff_ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) {
        if self.record("ff_ortho") && self.require_legacy() {
            self.ff.mult(Mat4::ortho(left, right, bottom, top, near, far));
        }
    }

    fn ff_enable_client_state(&mut self, array: ClientArray) {
        if self.record("ff_enable_client_state") && self.require_legacy() {
            let slot = self.ff_slot(array);
            self.ff_arrays[slot].0 = true;
        }
    }

    fn ff_disable_client_state(&mut self, array: ClientArray) {
        if self.record("ff_disable_client_state") && self.require_legacy() {
            let slot = self.ff_slot(array);
            self.ff_arrays[slot].0 = false;
        }
    }

    fn ff_client_active_texture(&mut self, unit: u32) {
        if !self.record("ff_client_active_texture") || !self.require_legacy() {
            return;
        }
        if unit >= MAX_TEXTURE_UNITS {
            self.raise(GlError::InvalidEnum);
            return;
        }
        self.ff_client_unit = unit;
    }

    fn ff_client_pointer(&mut self, array: ClientArray, ptr: &AttribPointer<'_>) {
        if !self.record("ff_client_pointer") || !self.require_legacy() {
            return;
        }
        let slot = self.ff_slot(array);
        if let Some(p) = self.capture(ptr) {
            self.ff_arrays[slot].1 = Some(p);
        }
    }

    fn ff_clip_plane(&mut self, index: u8, equation: [f32; 4]) {
        if !self.record("ff_clip_plane") || !self.require_legacy() {
            return;
        }
        if index as usize >= MAX_CLIP_PLANES {
            self.raise(GlError::InvalidEnum);
            return;
        }
        let mv = self.ff.current(MatrixMode::ModelView);
        self.ff_clip[index as usize] = match mv.inverse() {
            Some(inv) => inv.transform_plane(equation),
            None => equation,
        };
    }

    fn draw_arrays(&mut self, mode: PrimitiveType, first: usize, count: usize) {
        if !self.record("draw_arrays") {
            return;
        }
        let indices: Vec<u32> = (first as u32..(first + count) as u32).collect();
        self.draw(mode, &indices);
    }

    fn draw_elements(&mut self, mode: PrimitiveType, count: usize, indices: IndexData<'_>) {
        if !self.record("draw_elements") {
            return;
        }
        let resolved: Vec<u32> = match indices {
            IndexData::Client(idx) => match idx.get(..count) {
                Some(idx) => idx.to_vec(),
                None => {
                    self.raise(GlError::InvalidValue);
                    return;
                }
            },
            IndexData::Offset(offset) => {
                if self.api == GlVersion::Core && self.element_buffer == 0 {
                    self.raise(GlError::InvalidOperation);
                    return;
                }
                let Some(bytes) = self
                    .buffers
                    .get(&self.element_buffer)
                    .and_then(|b| b.get(offset..offset + count * 4))
                else {
                    self.raise(GlError::InvalidOperation);
                    return;
                };
                bytes.chunks_exact(4).map(bytemuck::pod_read_unaligned::<u32>).collect()
            }
        };
        self.draw(mode, &resolved);
    }
}

impl HeadlessGl {
    fn set_uniform(&mut self, location: i32, value: UniformValue) {
        let Some(prog) = self.programs.get_mut(&self.program) else {
            self.raise(GlError::InvalidOperation);
            return;
        };
        if location < 0 || location >= prog.uniform_slots {
            self.raise(GlError::InvalidOperation);
            return;
        }
        prog.values.insert(location, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(v: &[f32]) -> &[u8] {
        bytemuck::cast_slice(v)
    }

    fn pointer(size: u8, data: &[u8]) -> AttribPointer<'_> {
        AttribPointer {
            size,
            ty: ComponentType::F32,
            normalized: false,
            stride: 0,
            data: AttribData::Client(data),
        }
    }

    // ── fixed function ─────────────────────────────────────────────────────

    #[test]
    fn legacy_fixed_function_fills_triangle() {
        let mut gl = HeadlessGl::legacy(4, 4);
        gl.ff_matrix_mode(MatrixMode::Projection);
        gl.ff_ortho(0.0, 4.0, 4.0, 0.0, -1.0, 1.0);
        let pos = [0.0f32, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 0.0, 4.0, 4.0, 0.0, 4.0];
        gl.ff_enable_client_state(ClientArray::Vertex);
        gl.ff_client_pointer(ClientArray::Vertex, &pointer(2, f32_bytes(&pos)));
        gl.draw_arrays(PrimitiveType::Triangles, 0, 6);

        assert_eq!(gl.get_error(), None);
        assert_eq!(gl.pixel(0, 0), [255; 4]);
        assert_eq!(gl.pixel(3, 3), [255; 4]);
    }

    #[test]
    fn fixed_function_rejected_on_core() {
        let mut gl = HeadlessGl::core(4, 4);
        gl.ff_push_matrix();
        assert_eq!(gl.get_error(), Some(GlError::InvalidOperation));
    }

    #[test]
    fn quads_are_legacy_only() {
        let mut gl = HeadlessGl::mobile(4, 4);
        gl.draw_arrays(PrimitiveType::Quads, 0, 4);
        assert_eq!(gl.get_error(), Some(GlError::InvalidEnum));
        assert_eq!(gl.draw_count(), 0);
    }

    #[test]
    fn core_rejects_client_attribute_data() {
        let mut gl = HeadlessGl::core(4, 4);
        gl.vertex_attrib_pointer(0, &pointer(2, f32_bytes(&[0.0, 0.0])));
        assert_eq!(gl.get_error(), Some(GlError::InvalidOperation));
    }

    // ── objects ────────────────────────────────────────────────────────────

    #[test]
    fn buffer_sub_data_checks_bounds() {
        let mut gl = HeadlessGl::core(4, 4);
        let id = gl.gen_buffer().unwrap();
        gl.bind_buffer(BufferTarget::Array, id);
        gl.buffer_data(BufferTarget::Array, &[0; 8], BufferUsage::Static);
        gl.buffer_sub_data(BufferTarget::Array, 4, &[1, 2, 3, 4]);
        assert_eq!(gl.buffer(id), Some(&[0, 0, 0, 0, 1, 2, 3, 4][..]));
        gl.buffer_sub_data(BufferTarget::Array, 6, &[1, 2, 3, 4]);
        assert_eq!(gl.get_error(), Some(GlError::InvalidValue));
    }

    #[test]
    fn link_assigns_array_uniform_locations() {
        let mut gl = HeadlessGl::core(4, 4);
        let vs = gl.create_shader(ShaderKind::Vertex).unwrap();
        let fs = gl.create_shader(ShaderKind::Fragment).unwrap();
        assert!(gl.compile_shader(vs, "in vec4 pos; uniform mat4 mvp; void main() {}"));
        assert!(gl.compile_shader(fs, "uniform vec4 planes[3]; uniform int n; void main() {}"));
        let p = gl.create_program().unwrap();
        gl.attach_shader(p, vs);
        gl.attach_shader(p, fs);
        assert!(gl.link_program(p));

        assert_eq!(gl.attrib_location(p, "pos"), Some(0));
        let base = gl.uniform_location(p, "planes").unwrap();
        assert_eq!(gl.uniform_location(p, "planes[2]"), Some(base + 2));
        assert!(gl.uniform_location(p, "missing").is_none());
    }

    #[test]
    fn link_fails_without_fragment_stage() {
        let mut gl = HeadlessGl::core(4, 4);
        let vs = gl.create_shader(ShaderKind::Vertex).unwrap();
        gl.compile_shader(vs, "void main() {}");
        let p = gl.create_program().unwrap();
        gl.attach_shader(p, vs);
        assert!(!gl.link_program(p));
        assert!(gl.program_info_log(p).contains("fragment"));
    }

    #[test]
    fn context_loss_invalidates_ids() {
        let mut gl = HeadlessGl::legacy(4, 4);
        let id = gl.gen_buffer().unwrap();
        gl.lose_context();
        assert!(!gl.has_current_context());
        assert_eq!(gl.gen_buffer(), None);
        gl.restore_context();
        gl.bind_buffer(BufferTarget::Array, id);
        assert_eq!(gl.get_error(), Some(GlError::InvalidOperation));
        assert_ne!(gl.gen_buffer(), Some(id));
    }
}
