use crate::coords::{Rect, Vec2};
use crate::gl::{
    quads_to_triangles, AttribData, AttribPointer, BufferTarget, BufferUsage, Capability, ClientArray,
    ComponentType, GlContext, IndexData, NativeGl, PrimitiveType,
};
use crate::paint::Color;

use super::flags::{VertexFlags, VertexStream, MAX_TEXTURE_UNITS};

/// Where compiled vertex data lives.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Buffer objects, one per stream plus one for indices.
    BufferObjects,
    /// Client memory handed to the pointer calls on every bind.
    ClientArrays,
}

/// Buffer object backing one stream and its allocated size in bytes.
#[derive(Debug, Copy, Clone, Default)]
struct GpuBuffer {
    id: u32,
    capacity: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Status {
    Open,
    Compiled,
    Failed,
}

/// CPU-side vertex streams with an upload contract to GPU buffers.
///
/// Lifecycle: append → [`compile`](Self::compile) once → [`bind`](Self::bind) /
/// [`draw`](Self::draw) / [`unbind`](Self::unbind) any number of times →
/// [`clear`](Self::clear) to refill. [`reload`](Self::reload) re-uploads after a
/// context loss.
///
/// Quads on a backend without native quads are drawn as two triangles each;
/// callers keep appending four vertices (or four indices) per quad.
#[derive(Debug)]
pub struct VertexBuffer {
    flags: VertexFlags,
    mode: PrimitiveType,
    usage: BufferUsage,
    storage: Storage,

    positions: Vec<Vec2>,
    tex_coords: [Vec<Vec2>; MAX_TEXTURE_UNITS],
    colors: Vec<Color>,
    indices: Vec<u32>,
    /// Indices actually drawn: the caller's, or the triangle list synthesized
    /// for emulated quads.
    draw_indices: Vec<u32>,
    /// Set at compile time when quads are re-indexed to triangles.
    quads_emulated: bool,

    element_num: Option<usize>,
    grid: (u32, u32),

    gpu: [GpuBuffer; 6],
    element: GpuBuffer,
    status: Status,
}

impl VertexBuffer {
    /// Buffer backed by buffer objects when the context has them, client
    /// arrays otherwise. Reserve counts are capacity hints.
    pub fn new<N: NativeGl>(
        gl: &GlContext<N>,
        flags: VertexFlags,
        mode: PrimitiveType,
        reserve_vertices: usize,
        reserve_indices: usize,
        usage: BufferUsage,
    ) -> Self {
        let storage = if gl.caps().buffer_objects_supported() {
            Storage::BufferObjects
        } else {
            log::debug!("buffer objects unavailable; vertex buffer falls back to client arrays");
            Storage::ClientArrays
        };
        Self::with_storage(storage, flags, mode, reserve_vertices, reserve_indices, usage)
    }

    /// Buffer that never creates GPU objects.
    pub fn new_vertex_array(
        flags: VertexFlags,
        mode: PrimitiveType,
        reserve_vertices: usize,
        reserve_indices: usize,
        usage: BufferUsage,
    ) -> Self {
        Self::with_storage(Storage::ClientArrays, flags, mode, reserve_vertices, reserve_indices, usage)
    }

    fn with_storage(
        storage: Storage,
        flags: VertexFlags,
        mode: PrimitiveType,
        reserve_vertices: usize,
        reserve_indices: usize,
        usage: BufferUsage,
    ) -> Self {
        let reserve = |stream: VertexStream| {
            if flags.contains(stream.flag()) { reserve_vertices } else { 0 }
        };
        Self {
            flags,
            mode,
            usage,
            storage,
            positions: Vec::with_capacity(reserve(VertexStream::Position)),
            tex_coords: std::array::from_fn(|i| Vec::with_capacity(reserve(VertexStream::TexCoord(i as u8)))),
            colors: Vec::with_capacity(reserve(VertexStream::Color)),
            indices: Vec::with_capacity(if flags.contains(VertexFlags::USE_INDICES) { reserve_indices } else { 0 }),
            draw_indices: Vec::new(),
            quads_emulated: false,
            element_num: None,
            grid: (0, 0),
            gpu: [GpuBuffer::default(); 6],
            element: GpuBuffer::default(),
            status: Status::Open,
        }
    }

    // ── population ────────────────────────────────────────────────────────

    /// Appends to a position or texture-coordinate stream.
    pub fn add_vertex(&mut self, stream: VertexStream, v: Vec2) {
        match stream {
            VertexStream::Position => self.positions.push(v),
            VertexStream::TexCoord(unit) => self.tex_coords[unit_slot(unit)].push(v),
            VertexStream::Color => log::warn!("add_vertex: colors go through add_color"),
        }
    }

    #[inline]
    pub fn add_position(&mut self, v: Vec2) {
        self.positions.push(v);
    }

    #[inline]
    pub fn add_texture_coord(&mut self, v: Vec2, unit: u8) {
        self.tex_coords[unit_slot(unit)].push(v);
    }

    #[inline]
    pub fn add_color(&mut self, color: Color) {
        self.colors.push(color);
    }

    #[inline]
    pub fn add_index(&mut self, index: u32) {
        self.indices.push(index);
    }

    pub fn set_vertex(&mut self, index: usize, stream: VertexStream, v: Vec2) {
        let slot = match stream {
            VertexStream::Position => self.positions.get_mut(index),
            VertexStream::TexCoord(unit) => self.tex_coords[unit_slot(unit)].get_mut(index),
            VertexStream::Color => None,
        };
        match slot {
            Some(slot) => *slot = v,
            None => log::warn!("set_vertex: {stream:?}[{index}] out of range"),
        }
    }

    pub fn set_texture_coord(&mut self, index: usize, v: Vec2, unit: u8) {
        self.set_vertex(index, VertexStream::TexCoord(unit), v);
    }

    pub fn set_color(&mut self, index: usize, color: Color) {
        match self.colors.get_mut(index) {
            Some(slot) => *slot = color,
            None => log::warn!("set_color: index {index} out of range"),
        }
    }

    pub fn set_index(&mut self, index: usize, value: u32) {
        match self.indices.get_mut(index) {
            Some(slot) => *slot = value,
            None => log::warn!("set_index: index {index} out of range"),
        }
    }

    /// Resizes one stream, padding with zeros (white for colors).
    pub fn resize_array(&mut self, stream: VertexStream, size: usize) {
        match stream {
            VertexStream::Position => self.positions.resize(size, Vec2::zero()),
            VertexStream::TexCoord(unit) => self.tex_coords[unit_slot(unit)].resize(size, Vec2::zero()),
            VertexStream::Color => self.colors.resize(size, Color::WHITE),
        }
    }

    pub fn resize_indices(&mut self, size: usize) {
        self.indices.resize(size, 0);
    }

    // ── quad grid ─────────────────────────────────────────────────────────

    /// Appends an axis-aligned quad: four vertices, counter-clockwise from the
    /// top-left corner. Enabled texture streams get the full `[0, 1]` square.
    pub fn add_quad(&mut self, pos: Vec2, size: Vec2, color: Color) {
        for corner in quad_corners(pos, size) {
            self.positions.push(corner);
            self.colors.push(color);
        }
        for unit in 0..MAX_TEXTURE_UNITS {
            if self.flags.contains(VertexStream::TexCoord(unit as u8).flag()) {
                self.tex_coords[unit].extend(quad_corners(Vec2::zero(), Vec2::splat(1.0)));
            }
        }
    }

    /// Sizes every stream for a `width × height` grid of quads addressed by
    /// the `set_quad*` helpers.
    pub fn set_grid_size(&mut self, width: u32, height: u32) {
        self.grid = (width, height);
        let vertices = width as usize * height as usize * 4;
        for stream in self.flags.streams() {
            self.resize_array(stream, vertices);
        }
    }

    fn grid_base(&self, x: u32, y: u32) -> Option<usize> {
        let (w, h) = self.grid;
        if x >= w || y >= h {
            log::warn!("grid quad ({x}, {y}) outside a {w}x{h} grid");
            return None;
        }
        Some((y as usize * w as usize + x as usize) * 4)
    }

    pub fn set_quad(&mut self, x: u32, y: u32, pos: Vec2, size: Vec2, color: Color) {
        let [a, b, c, d] = quad_corners(pos, size);
        self.set_quad_free(x, y, a, b, c, d, color);
    }

    pub fn set_quad_color(&mut self, x: u32, y: u32, color: Color) {
        let Some(base) = self.grid_base(x, y) else { return };
        for i in base..base + 4 {
            self.set_color(i, color);
        }
    }

    /// Sets the four corners of grid quad `(x, y)` in perimeter order.
    #[allow(clippy::too_many_arguments)]
    pub fn set_quad_free(&mut self, x: u32, y: u32, p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, color: Color) {
        let Some(base) = self.grid_base(x, y) else { return };
        for (i, p) in [p0, p1, p2, p3].into_iter().enumerate() {
            self.set_vertex(base + i, VertexStream::Position, p);
            self.set_color(base + i, color);
        }
    }

    /// Maps texture rectangle `coords` (normalized) onto grid quad `(x, y)`.
    pub fn set_quad_tex_coords(&mut self, x: u32, y: u32, coords: Rect, unit: u8) {
        let Some(base) = self.grid_base(x, y) else { return };
        for (i, p) in quad_corners(coords.origin, coords.size).into_iter().enumerate() {
            self.set_texture_coord(base + i, p, unit);
        }
    }

    // ── queries ───────────────────────────────────────────────────────────

    pub fn flags(&self) -> VertexFlags {
        self.flags
    }

    pub fn mode(&self) -> PrimitiveType {
        self.mode
    }

    pub fn storage(&self) -> Storage {
        self.storage
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn tex_coords(&self, unit: u8) -> &[Vec2] {
        &self.tex_coords[unit_slot(unit)]
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Indices submitted by `draw` after compile, including synthesized quad
    /// triangles. Empty for non-indexed, non-emulated buffers.
    pub fn draw_indices(&self) -> &[u32] {
        &self.draw_indices
    }

    pub fn color(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    pub fn index(&self, index: usize) -> Option<u32> {
        self.indices.get(index).copied()
    }

    /// Limits `draw` to the first `num` elements (vertices, or indices for
    /// indexed buffers); `None` draws everything.
    pub fn set_element_num(&mut self, num: Option<usize>) {
        self.element_num = num;
    }

    pub fn element_num(&self) -> Option<usize> {
        self.element_num
    }

    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.status == Status::Compiled
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    // ── upload ────────────────────────────────────────────────────────────

    fn stream_len(&self, stream: VertexStream) -> usize {
        match stream {
            VertexStream::Position => self.positions.len(),
            VertexStream::TexCoord(unit) => self.tex_coords[unit_slot(unit)].len(),
            VertexStream::Color => self.colors.len(),
        }
    }

    fn stream_bytes(&self, stream: VertexStream) -> &[u8] {
        match stream {
            VertexStream::Position => bytemuck::cast_slice(&self.positions),
            VertexStream::TexCoord(unit) => bytemuck::cast_slice(&self.tex_coords[unit_slot(unit)]),
            VertexStream::Color => bytemuck::cast_slice(&self.colors),
        }
    }

    fn synthesize_indices(&mut self, quads_native: bool) {
        self.quads_emulated = self.mode == PrimitiveType::Quads && !quads_native;
        self.draw_indices = match (self.flags.contains(VertexFlags::USE_INDICES), self.quads_emulated) {
            (true, true) => quads_to_triangles(&self.indices),
            (true, false) => self.indices.clone(),
            (false, true) => {
                let vertices: Vec<u32> = (0..self.positions.len() as u32).collect();
                quads_to_triangles(&vertices)
            }
            (false, false) => Vec::new(),
        };
    }

    /// Uploads every enabled stream. Must run once before the first draw;
    /// later calls are refused with a warning.
    ///
    /// Returns `false` when the streams disagree on their vertex count or a
    /// GPU object can't be created; the buffer then refuses to draw until
    /// [`reload`](Self::reload).
    pub fn compile<N: NativeGl>(&mut self, gl: &mut GlContext<N>) -> bool {
        if self.status == Status::Compiled {
            log::warn!("vertex buffer already compiled; use update() to re-upload");
            return false;
        }

        let count = self.positions.len();
        if let Some(stream) = self.flags.streams().find(|s| self.stream_len(*s) != count) {
            log::error!(
                "vertex buffer streams disagree: {stream:?} has {} entries, positions {count}",
                self.stream_len(stream)
            );
            self.status = Status::Failed;
            return false;
        }

        self.synthesize_indices(gl.quads_supported());

        if self.storage == Storage::BufferObjects && count > 0 && !self.upload_all(gl) {
            self.release_gpu(gl);
            self.status = Status::Failed;
            return false;
        }

        log::trace!("vertex buffer compiled: {count} vertices, {} indices", self.draw_indices.len());
        self.status = Status::Compiled;
        true
    }

    fn upload_all<N: NativeGl>(&mut self, gl: &mut GlContext<N>) -> bool {
        let previous = gl.state().array_buffer;
        for stream in self.flags.streams() {
            let Some(id) = gl.gen_buffer() else {
                log::error!("failed to create a buffer object for the {stream:?} stream");
                gl.bind_buffer(BufferTarget::Array, previous);
                return false;
            };
            let bytes = self.stream_bytes(stream);
            let capacity = bytes.len();
            gl.bind_buffer(BufferTarget::Array, id);
            gl.buffer_data(BufferTarget::Array, bytes, self.usage);
            self.gpu[stream.slot()] = GpuBuffer { id, capacity };
        }
        gl.bind_buffer(BufferTarget::Array, previous);

        if !self.draw_indices.is_empty() {
            let Some(id) = gl.gen_buffer() else {
                log::error!("failed to create the index buffer object");
                return false;
            };
            let previous = gl.state().element_buffer;
            let bytes: &[u8] = bytemuck::cast_slice(&self.draw_indices);
            gl.bind_buffer(BufferTarget::ElementArray, id);
            gl.buffer_data(BufferTarget::ElementArray, bytes, self.usage);
            gl.bind_buffer(BufferTarget::ElementArray, previous);
            self.element = GpuBuffer { id, capacity: bytes.len() };
        }
        true
    }

    /// Re-uploads `streams` (and the indices when `indices` is set) after a
    /// post-compile edit. Buffers are reallocated only when the data outgrew
    /// them. Triangle indices of emulated quads follow the vertex count
    /// without the caller asking for them.
    ///
    /// A GPU object that can't be created marks the buffer failed.
    pub fn update<N: NativeGl>(&mut self, gl: &mut GlContext<N>, streams: VertexFlags, indices: bool) {
        if self.status != Status::Compiled {
            log::warn!("update on a vertex buffer that isn't compiled");
            return;
        }
        let mut reindex = indices;
        if indices || self.quads_emulated {
            let stale = std::mem::take(&mut self.draw_indices);
            self.synthesize_indices(gl.quads_supported());
            reindex |= self.draw_indices != stale;
        }
        if self.storage == Storage::ClientArrays {
            // Client arrays are read on every bind.
            return;
        }

        let previous = gl.state().array_buffer;
        let mut ok = true;
        for stream in self.flags.streams().filter(|s| streams.contains(s.flag())) {
            if !self.upload(gl, BufferTarget::Array, stream.slot()) {
                log::error!("failed to create a buffer object for the {stream:?} stream");
                ok = false;
                break;
            }
        }
        gl.bind_buffer(BufferTarget::Array, previous);

        if ok && reindex && !self.draw_indices.is_empty() {
            let previous = gl.state().element_buffer;
            if !self.upload(gl, BufferTarget::ElementArray, ELEMENT_SLOT) {
                log::error!("failed to create the index buffer object");
                ok = false;
            }
            gl.bind_buffer(BufferTarget::ElementArray, previous);
        }

        if !ok {
            self.release_gpu(gl);
            self.status = Status::Failed;
        }
    }

    /// Writes one stream (or the indices for [`ELEMENT_SLOT`]) into its buffer
    /// object, creating it if compile had nothing to upload. Leaves the buffer
    /// bound to `target`.
    fn upload<N: NativeGl>(&mut self, gl: &mut GlContext<N>, target: BufferTarget, slot: usize) -> bool {
        let buf = if slot == ELEMENT_SLOT { self.element } else { self.gpu[slot] };
        let fresh = buf.id == 0;
        let id = if fresh {
            match gl.gen_buffer() {
                Some(id) => id,
                None => return false,
            }
        } else {
            buf.id
        };

        let bytes: &[u8] = match self.flags.streams().find(|s| s.slot() == slot) {
            Some(stream) if slot != ELEMENT_SLOT => self.stream_bytes(stream),
            _ => bytemuck::cast_slice(&self.draw_indices),
        };
        let len = bytes.len();
        gl.bind_buffer(target, id);
        let capacity = if !fresh && len <= buf.capacity {
            gl.buffer_sub_data(target, 0, bytes);
            buf.capacity
        } else {
            gl.buffer_data(target, bytes, self.usage);
            len
        };

        let updated = GpuBuffer { id, capacity };
        if slot == ELEMENT_SLOT {
            self.element = updated;
        } else {
            self.gpu[slot] = updated;
        }
        true
    }

    // ── drawing ───────────────────────────────────────────────────────────

    /// Points the context's vertex streams at this buffer. Compiles first if
    /// needed.
    pub fn bind<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        if self.status == Status::Open {
            self.compile(gl);
        }
        if self.status != Status::Compiled {
            return;
        }

        let previous = gl.state().array_buffer;
        let textured = self.flags.is_textured();
        for stream in self.flags.streams() {
            let (size, ty, normalized) = match stream {
                VertexStream::Color => (4, ComponentType::U8, true),
                _ => (2, ComponentType::F32, false),
            };
            let data = match self.storage {
                Storage::BufferObjects => {
                    gl.bind_buffer(BufferTarget::Array, self.gpu[stream.slot()].id);
                    AttribData::Offset(0)
                }
                Storage::ClientArrays => AttribData::Client(self.stream_bytes(stream)),
            };
            let ptr = AttribPointer { size, ty, normalized, stride: 0, data };
            match stream {
                VertexStream::Position => {
                    gl.enable_client_state(ClientArray::Vertex);
                    gl.vertex_pointer(&ptr);
                }
                VertexStream::Color => {
                    gl.enable_client_state(ClientArray::Color);
                    gl.color_pointer(&ptr);
                }
                VertexStream::TexCoord(unit) => {
                    gl.client_active_texture(unit as u32);
                    gl.enable_client_state(ClientArray::TexCoord);
                    gl.tex_coord_pointer(&ptr);
                }
            }
        }
        if self.storage == Storage::BufferObjects {
            gl.bind_buffer(BufferTarget::Array, previous);
        }
        if textured {
            gl.client_active_texture(0);
        } else {
            gl.disable(Capability::Texture2D);
        }
        if !self.flags.contains(VertexFlags::COLOR) {
            gl.disable_client_state(ClientArray::Color);
        }
    }

    /// Issues one draw covering every vertex, or the element count set with
    /// [`set_element_num`](Self::set_element_num). A no-op on a buffer that
    /// isn't compiled or holds nothing.
    pub fn draw<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        if self.status != Status::Compiled || self.positions.is_empty() {
            return;
        }
        if self.storage == Storage::BufferObjects && self.flags.streams().any(|s| self.gpu[s.slot()].id == 0) {
            log::warn!("vertex data appended after an empty compile was never uploaded; call update()");
            return;
        }

        let indexed = !self.draw_indices.is_empty();
        let (mode, total) = match (indexed, self.quads_emulated) {
            (_, true) => (PrimitiveType::Triangles, self.draw_indices.len()),
            (true, false) => (self.mode, self.draw_indices.len()),
            (false, false) => (self.mode, self.positions.len()),
        };
        // Element counts are given in caller units: four per quad.
        let count = match self.element_num {
            Some(n) if self.quads_emulated => (n / 4 * 6).min(total),
            Some(n) => n.min(total),
            None => total,
        };
        if count == 0 {
            return;
        }

        if !indexed {
            gl.draw_arrays(mode, 0, count);
            return;
        }
        match self.storage {
            Storage::BufferObjects => {
                let previous = gl.state().element_buffer;
                gl.bind_buffer(BufferTarget::ElementArray, self.element.id);
                gl.draw_elements(mode, count, IndexData::Offset(0));
                gl.bind_buffer(BufferTarget::ElementArray, previous);
            }
            Storage::ClientArrays => gl.draw_elements(mode, count, IndexData::Client(&self.draw_indices)),
        }
    }

    /// Disables the streams [`bind`](Self::bind) enabled.
    pub fn unbind<N: NativeGl>(&self, gl: &mut GlContext<N>) {
        for stream in self.flags.streams() {
            match stream {
                VertexStream::Position => gl.disable_client_state(ClientArray::Vertex),
                VertexStream::Color => gl.disable_client_state(ClientArray::Color),
                VertexStream::TexCoord(unit) => {
                    gl.client_active_texture(unit as u32);
                    gl.disable_client_state(ClientArray::TexCoord);
                }
            }
        }
        if self.flags.is_textured() {
            gl.client_active_texture(0);
        }
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    fn release_gpu<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        for buf in self.gpu.iter_mut().chain(std::iter::once(&mut self.element)) {
            if buf.id != 0 {
                gl.delete_buffer(buf.id);
            }
            *buf = GpuBuffer::default();
        }
    }

    /// Deletes the GPU objects and empties every stream. Flags, mode and
    /// usage are kept so the buffer can be refilled.
    pub fn clear<N: NativeGl>(&mut self, gl: &mut GlContext<N>) {
        self.release_gpu(gl);
        self.positions.clear();
        self.tex_coords.iter_mut().for_each(Vec::clear);
        self.colors.clear();
        self.indices.clear();
        self.draw_indices.clear();
        self.quads_emulated = false;
        self.element_num = None;
        self.grid = (0, 0);
        self.status = Status::Open;
    }

    /// Re-uploads everything from the CPU copies, e.g. after a context loss.
    /// Safe to call repeatedly and on buffers that never compiled.
    pub fn reload<N: NativeGl>(&mut self, gl: &mut GlContext<N>) -> bool {
        // Handles from a lost context are gone; deleting them is harmless.
        self.release_gpu(gl);
        self.status = Status::Open;
        self.compile(gl)
    }
}

/// Pseudo slot addressing the index buffer in `upload`.
const ELEMENT_SLOT: usize = usize::MAX;

#[inline]
fn unit_slot(unit: u8) -> usize {
    (unit as usize).min(MAX_TEXTURE_UNITS - 1)
}

/// Corners of an axis-aligned box, counter-clockwise on screen from the
/// top-left.
fn quad_corners(pos: Vec2, size: Vec2) -> [Vec2; 4] {
    [
        pos,
        Vec2::new(pos.x, pos.y + size.y),
        Vec2::new(pos.x + size.x, pos.y + size.y),
        Vec2::new(pos.x + size.x, pos.y),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Viewport;
    use crate::gl::GlConfig;
    use crate::headless::HeadlessGl;

    fn ctx(native: HeadlessGl) -> GlContext<HeadlessGl> {
        let mut gl = GlContext::new(native, GlConfig::default());
        gl.set_ortho_2d(Viewport::new(8.0, 8.0));
        gl
    }

    fn full_quad(gl: &GlContext<HeadlessGl>, color: Color) -> VertexBuffer {
        let mut vb = VertexBuffer::new(gl, VertexFlags::PRIMITIVE, PrimitiveType::Quads, 4, 0, BufferUsage::Static);
        vb.add_quad(Vec2::zero(), Vec2::splat(8.0), color);
        vb
    }

    // ── quads ─────────────────────────────────────────────────────────────

    #[test]
    fn quad_becomes_two_triangles_without_native_quads() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = full_quad(&gl, Color::RED);
        assert!(vb.compile(&mut gl));
        assert_eq!(vb.draw_indices(), &[0, 1, 2, 0, 2, 3]);

        vb.bind(&mut gl);
        vb.draw(&mut gl);
        vb.unbind(&mut gl);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Triangles, 6)));
        assert_eq!(gl.native().pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(gl.native().pixel(6, 6), [255, 0, 0, 255]);
    }

    #[test]
    fn quads_stay_native_on_legacy() {
        let mut gl = ctx(HeadlessGl::legacy(8, 8));
        let mut vb = full_quad(&gl, Color::GREEN);
        assert!(vb.compile(&mut gl));
        assert!(vb.draw_indices().is_empty());
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Quads, 4)));
        assert_eq!(gl.native().pixel(4, 4), [0, 255, 0, 255]);
    }

    #[test]
    fn indexed_quads_are_reindexed() {
        let mut gl = ctx(HeadlessGl::mobile(8, 8));
        let flags = VertexFlags::PRIMITIVE | VertexFlags::USE_INDICES;
        let mut vb = VertexBuffer::new(&gl, flags, PrimitiveType::Quads, 4, 4, BufferUsage::Static);
        vb.add_quad(Vec2::zero(), Vec2::splat(8.0), Color::BLUE);
        for i in [3, 2, 1, 0] {
            vb.add_index(i);
        }
        assert!(vb.compile(&mut gl));
        assert_eq!(vb.draw_indices(), &[3, 2, 1, 3, 1, 0]);
    }

    #[test]
    fn element_num_counts_caller_quads() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::PRIMITIVE, PrimitiveType::Quads, 8, 0, BufferUsage::Static);
        vb.add_quad(Vec2::zero(), Vec2::splat(4.0), Color::RED);
        vb.add_quad(Vec2::splat(4.0), Vec2::splat(4.0), Color::RED);
        assert!(vb.compile(&mut gl));
        vb.set_element_num(Some(4));
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Triangles, 6)));
    }

    // ── compile contract ──────────────────────────────────────────────────

    #[test]
    fn empty_buffer_compiles_and_draws_nothing() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::PRIMITIVE, PrimitiveType::Triangles, 0, 0, BufferUsage::Static);
        assert!(vb.compile(&mut gl));
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().draw_count(), 0);
    }

    #[test]
    fn second_compile_is_refused() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = full_quad(&gl, Color::RED);
        assert!(vb.compile(&mut gl));
        assert!(!vb.compile(&mut gl));
        assert!(vb.is_compiled());
    }

    #[test]
    fn mismatched_streams_fail() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::PRIMITIVE, PrimitiveType::Triangles, 3, 0, BufferUsage::Static);
        for p in [Vec2::zero(), Vec2::new(8.0, 0.0), Vec2::new(0.0, 8.0)] {
            vb.add_position(p);
        }
        vb.add_color(Color::RED);
        assert!(!vb.compile(&mut gl));
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().draw_count(), 0);
    }

    #[test]
    fn failed_buffer_creation_blocks_draws_until_reload() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        gl.native_mut().fail_buffer_creation(true);
        let mut vb = full_quad(&gl, Color::RED);
        assert!(!vb.compile(&mut gl));
        assert!(vb.is_failed());
        vb.draw(&mut gl);
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().draw_count(), 0);

        gl.native_mut().fail_buffer_creation(false);
        assert!(vb.reload(&mut gl));
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().draw_count(), 1);
    }

    // ── update / clear / reload ───────────────────────────────────────────

    #[test]
    fn update_reuses_buffers_that_fit() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = full_quad(&gl, Color::RED);
        assert!(vb.compile(&mut gl));
        let buffers = gl.native().buffer_count();

        gl.native_mut().clear_calls();
        for i in 0..vb.vertex_count() {
            vb.set_color(i, Color::BLUE);
        }
        vb.update(&mut gl, VertexFlags::COLOR, false);
        assert_eq!(gl.native().count_calls("buffer_sub_data"), 1);
        assert_eq!(gl.native().count_calls("buffer_data"), 0);
        assert_eq!(gl.native().buffer_count(), buffers);

        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().pixel(4, 4), [0, 0, 255, 255]);
    }

    #[test]
    fn update_grows_buffers_that_overflow() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = full_quad(&gl, Color::RED);
        assert!(vb.compile(&mut gl));
        vb.add_quad(Vec2::zero(), Vec2::splat(2.0), Color::RED);
        gl.native_mut().clear_calls();
        vb.update(&mut gl, VertexFlags::POSITION, true);
        // Position stream plus the synthesized indices.
        assert_eq!(gl.native().count_calls("buffer_data"), 2);
        assert_eq!(vb.draw_indices().len(), 12);
    }

    #[test]
    fn appended_quads_draw_after_a_stream_update() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::PRIMITIVE, PrimitiveType::Quads, 4, 0, BufferUsage::Dynamic);
        vb.add_quad(Vec2::zero(), Vec2::splat(4.0), Color::RED);
        assert!(vb.compile(&mut gl));

        vb.add_quad(Vec2::splat(4.0), Vec2::splat(4.0), Color::BLUE);
        vb.update(&mut gl, VertexFlags::PRIMITIVE, false);
        vb.bind(&mut gl);
        vb.draw(&mut gl);

        assert_eq!(gl.native().last_draw(), Some((PrimitiveType::Triangles, 12)));
        assert_eq!(gl.native().pixel(1, 1), [255, 0, 0, 255]);
        assert_eq!(gl.native().pixel(6, 6), [0, 0, 255, 255]);
    }

    #[test]
    fn update_fills_a_buffer_compiled_empty() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::PRIMITIVE, PrimitiveType::Triangles, 0, 0, BufferUsage::Dynamic);
        assert!(vb.compile(&mut gl));

        for p in [Vec2::zero(), Vec2::new(0.0, 8.0), Vec2::new(8.0, 0.0)] {
            vb.add_position(p);
            vb.add_color(Color::GREEN);
        }
        vb.update(&mut gl, VertexFlags::PRIMITIVE, false);
        vb.bind(&mut gl);
        vb.draw(&mut gl);

        assert_eq!(gl.native().draw_count(), 1);
        assert_eq!(gl.error_count(), 0);
        assert_eq!(gl.native().pixel(1, 1), [0, 255, 0, 255]);
    }

    #[test]
    fn appended_data_without_update_is_not_drawn() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::PRIMITIVE, PrimitiveType::Triangles, 0, 0, BufferUsage::Dynamic);
        assert!(vb.compile(&mut gl));
        for p in [Vec2::zero(), Vec2::new(0.0, 8.0), Vec2::new(8.0, 0.0)] {
            vb.add_position(p);
            vb.add_color(Color::GREEN);
        }
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().draw_count(), 0);
    }

    #[test]
    fn update_that_cannot_create_buffers_fails_the_buffer() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::PRIMITIVE, PrimitiveType::Triangles, 0, 0, BufferUsage::Dynamic);
        assert!(vb.compile(&mut gl));
        vb.add_position(Vec2::zero());
        vb.add_color(Color::GREEN);
        gl.native_mut().fail_buffer_creation(true);
        vb.update(&mut gl, VertexFlags::PRIMITIVE, false);
        assert!(vb.is_failed());
    }

    #[test]
    fn clear_keeps_descriptor() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = full_quad(&gl, Color::RED);
        assert!(vb.compile(&mut gl));
        let before = gl.native().buffer_count();
        vb.clear(&mut gl);
        assert_eq!(vb.vertex_count(), 0);
        assert!(!vb.is_compiled());
        assert_eq!(vb.flags(), VertexFlags::PRIMITIVE);
        assert_eq!(vb.mode(), PrimitiveType::Quads);
        assert!(gl.native().buffer_count() < before);

        vb.add_quad(Vec2::zero(), Vec2::splat(8.0), Color::GREEN);
        assert!(vb.compile(&mut gl));
    }

    #[test]
    fn reload_is_idempotent() {
        let mut gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = full_quad(&gl, Color::RED);
        assert!(vb.compile(&mut gl));

        gl.native_mut().lose_context();
        gl.native_mut().restore_context();
        gl.reload();
        gl.set_ortho_2d(Viewport::new(8.0, 8.0));
        assert!(vb.reload(&mut gl));
        let buffers = gl.native().buffer_count();
        assert!(vb.reload(&mut gl));
        assert_eq!(gl.native().buffer_count(), buffers);

        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().pixel(4, 4), [255, 0, 0, 255]);
    }

    // ── client arrays / grid ──────────────────────────────────────────────

    #[test]
    fn vertex_array_creates_no_buffers() {
        let mut gl = ctx(HeadlessGl::mobile(8, 8));
        let mut vb = VertexBuffer::new_vertex_array(VertexFlags::PRIMITIVE, PrimitiveType::Quads, 4, 0, BufferUsage::Stream);
        vb.add_quad(Vec2::zero(), Vec2::splat(8.0), Color::RED);
        let before = gl.native().buffer_count();
        assert!(vb.compile(&mut gl));
        assert_eq!(gl.native().buffer_count(), before);
        vb.bind(&mut gl);
        vb.draw(&mut gl);
        assert_eq!(gl.native().pixel(4, 4), [255, 0, 0, 255]);
    }

    #[test]
    fn grid_quads_are_addressable() {
        let gl = ctx(HeadlessGl::core(8, 8));
        let mut vb = VertexBuffer::new(&gl, VertexFlags::DEFAULT, PrimitiveType::Quads, 0, 0, BufferUsage::Dynamic);
        vb.set_grid_size(2, 2);
        assert_eq!(vb.vertex_count(), 16);
        assert_eq!(vb.tex_coords(0).len(), 16);

        vb.set_quad(1, 1, Vec2::new(4.0, 4.0), Vec2::splat(4.0), Color::BLUE);
        assert_eq!(vb.positions()[12], Vec2::new(4.0, 4.0));
        assert_eq!(vb.positions()[14], Vec2::new(8.0, 8.0));
        assert_eq!(vb.color(13), Some(Color::BLUE));

        vb.set_quad_tex_coords(1, 0, Rect::new(0.5, 0.0, 0.5, 0.5), 0);
        assert_eq!(vb.tex_coords(0)[4], Vec2::new(0.5, 0.0));
        assert_eq!(vb.tex_coords(0)[6], Vec2::new(1.0, 0.5));

        // Out of range is ignored.
        vb.set_quad_color(2, 0, Color::RED);
        assert!(vb.colors().iter().all(|c| *c != Color::RED));
    }
}
