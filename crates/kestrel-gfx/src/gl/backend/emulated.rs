use crate::coords::Mat4;
use crate::gl::matrix_stack::MatrixStacks;
use crate::gl::native::NativeGl;
use crate::gl::types::{AttribPointer, ClientArray, MatrixMode, ShaderKind, MAX_CLIP_PLANES};
use crate::shader::{builtin, Dialect};

/// Attribute slot of a client array: vertex 0, color 1, texture units 2..6.
#[inline]
pub(crate) fn attrib_slot(array: ClientArray, client_unit: usize) -> usize {
    match array {
        ClientArray::Vertex => 0,
        ClientArray::Color => 1,
        ClientArray::TexCoord => 2 + client_unit.min(3),
    }
}

/// Locations of the `dgl_*` names in the current program.
#[derive(Debug, Clone, Default)]
struct Locations {
    attribs: [Option<u32>; 6],
    projection: Option<i32>,
    modelview: Option<i32>,
    tex_active: Option<i32>,
    point_sprite: Option<i32>,
    point_size: Option<i32>,
    clipping: Option<i32>,
    clip_enabled: [Option<i32>; MAX_CLIP_PLANES],
    clip_plane: [Option<i32>; MAX_CLIP_PLANES],
}

impl Locations {
    fn resolve<N: NativeGl>(native: &N, program: u32) -> Self {
        let mut attribs = [None; 6];
        attribs[0] = native.attrib_location(program, builtin::ATTR_VERTEX);
        attribs[1] = native.attrib_location(program, builtin::ATTR_COLOR);
        for (i, name) in builtin::ATTR_TEXCOORD.iter().enumerate() {
            attribs[2 + i] = native.attrib_location(program, name);
        }

        let uniform = |name: &str| native.uniform_location(program, name);
        Self {
            attribs,
            projection: uniform(builtin::UNIFORM_PROJECTION),
            modelview: uniform(builtin::UNIFORM_MODELVIEW),
            tex_active: uniform(builtin::UNIFORM_TEX_ACTIVE),
            point_sprite: uniform(builtin::UNIFORM_POINT_SPRITE),
            point_size: uniform(builtin::UNIFORM_POINT_SIZE),
            clipping: uniform(builtin::UNIFORM_CLIPPING),
            clip_enabled: std::array::from_fn(|i| uniform(&format!("{}[{i}]", builtin::UNIFORM_CLIP_ENABLED))),
            clip_plane: std::array::from_fn(|i| uniform(&format!("{}[{i}]", builtin::UNIFORM_CLIP_PLANE))),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Dirty {
    texture: bool,
    point: bool,
    clip: bool,
}

impl Dirty {
    const ALL: Dirty = Dirty { texture: true, point: true, clip: true };
}

/// Fixed-function emulation shared by the core and mobile backends.
///
/// Legacy state lives here as plain values; uploads happen in
/// [`before_draw`](Self::before_draw) for whatever changed since the last draw.
#[derive(Debug)]
pub(crate) struct Emulation {
    dialect: Dialect,
    base_program: u32,
    program: u32,
    locs: Locations,
    client_unit: usize,
    enabled: [bool; 6],
    tex_active: bool,
    point_sprite: bool,
    point_size: f32,
    clip_planes: [[f32; 4]; MAX_CLIP_PLANES],
    clip_enabled: [bool; MAX_CLIP_PLANES],
    dirty: Dirty,
}

impl Emulation {
    pub fn new<N: NativeGl>(native: &mut N, dialect: Dialect) -> Self {
        let mut emu = Self {
            dialect,
            base_program: 0,
            program: 0,
            locs: Locations::default(),
            client_unit: 0,
            enabled: [false; 6],
            tex_active: false,
            point_sprite: false,
            point_size: 1.0,
            clip_planes: [[0.0; 4]; MAX_CLIP_PLANES],
            clip_enabled: [false; MAX_CLIP_PLANES],
            dirty: Dirty::ALL,
        };
        emu.base_program = build_base_program(native, dialect).unwrap_or(0);
        emu.use_program(native, None);
        emu
    }

    #[inline]
    pub fn program(&self) -> u32 {
        self.program
    }

    #[inline]
    pub fn base_program(&self) -> u32 {
        self.base_program
    }

    /// Switches to `program`, or back to the base program on `None`.
    ///
    /// Attribute bindings are tied to the old program's locations, so enabled
    /// arrays are turned off and pointers must be specified again.
    pub fn use_program<N: NativeGl>(&mut self, native: &mut N, program: Option<u32>) {
        let target = program.unwrap_or(self.base_program);
        for slot in 0..6 {
            if self.enabled[slot] {
                if let Some(loc) = self.locs.attribs[slot] {
                    native.disable_vertex_attrib_array(loc);
                }
                self.enabled[slot] = false;
            }
        }

        native.use_program(target);
        self.program = target;
        self.locs = if target != 0 {
            Locations::resolve(native, target)
        } else {
            Locations::default()
        };
        self.dirty = Dirty::ALL;
    }

    pub fn set_client_unit(&mut self, unit: usize) {
        self.client_unit = unit.min(3);
    }

    fn location(&self, array: ClientArray) -> (usize, Option<u32>) {
        let slot = attrib_slot(array, self.client_unit);
        (slot, self.locs.attribs[slot])
    }

    pub fn enable_array<N: NativeGl>(&mut self, native: &mut N, array: ClientArray) {
        let (slot, loc) = self.location(array);
        if let Some(loc) = loc {
            native.enable_vertex_attrib_array(loc);
            self.enabled[slot] = true;
        }
    }

    pub fn disable_array<N: NativeGl>(&mut self, native: &mut N, array: ClientArray) {
        let (slot, loc) = self.location(array);
        if let Some(loc) = loc {
            native.disable_vertex_attrib_array(loc);
            self.enabled[slot] = false;
        }
    }

    /// Attribute slot and location for a pointer call; location is `None`
    /// when the program doesn't read that stream.
    pub fn pointer_target(&self, array: ClientArray) -> (usize, Option<u32>) {
        self.location(array)
    }

    pub fn pointer<N: NativeGl>(&mut self, native: &mut N, array: ClientArray, ptr: &AttribPointer<'_>) {
        if let (_, Some(loc)) = self.location(array) {
            native.vertex_attrib_pointer(loc, ptr);
        }
    }

    pub fn set_texture_active(&mut self, active: bool) {
        if self.tex_active != active {
            self.tex_active = active;
            self.dirty.texture = true;
        }
    }

    pub fn set_point_sprite(&mut self, active: bool) {
        if self.point_sprite != active {
            self.point_sprite = active;
            self.dirty.point = true;
        }
    }

    pub fn set_point_size(&mut self, size: f32) {
        if self.point_size != size {
            self.point_size = size;
            self.dirty.point = true;
        }
    }

    pub fn set_clip_enabled(&mut self, index: usize, enabled: bool) {
        if let Some(e) = self.clip_enabled.get_mut(index) {
            *e = enabled;
            self.dirty.clip = true;
        }
    }

    /// Stores an object-space plane, moved to eye space with `modelview`
    /// (the `glClipPlane` rule).
    pub fn set_clip_plane(&mut self, index: usize, equation: [f32; 4], modelview: &Mat4) {
        let Some(slot) = self.clip_planes.get_mut(index) else { return };
        *slot = match modelview.inverse() {
            Some(inv) => inv.transform_plane(equation),
            None => equation,
        };
        self.dirty.clip = true;
    }

    /// Uploads pending emulated state. Called exactly once before each draw.
    pub fn before_draw<N: NativeGl>(&mut self, native: &mut N, matrices: &mut MatrixStacks) {
        if self.program == 0 {
            return;
        }

        if matrices.take_dirty(MatrixMode::Projection) {
            if let Some(loc) = self.locs.projection {
                native.uniform_matrix4(loc, &matrices.current(MatrixMode::Projection).m);
            }
        }
        if matrices.take_dirty(MatrixMode::ModelView) {
            if let Some(loc) = self.locs.modelview {
                native.uniform_matrix4(loc, &matrices.current(MatrixMode::ModelView).m);
            }
        }
        // No texture-matrix uniform in the base programs.
        matrices.take_dirty(MatrixMode::Texture);

        if self.dirty.texture {
            if let Some(loc) = self.locs.tex_active {
                native.uniform_1i(loc, self.tex_active as i32);
            }
        }
        if self.dirty.point {
            if let Some(loc) = self.locs.point_sprite {
                native.uniform_1i(loc, self.point_sprite as i32);
            }
            if let Some(loc) = self.locs.point_size {
                native.uniform_1f(loc, self.point_size);
            }
        }
        if self.dirty.clip {
            if let Some(loc) = self.locs.clipping {
                native.uniform_1i(loc, self.clip_enabled.iter().any(|e| *e) as i32);
            }
            for i in 0..MAX_CLIP_PLANES {
                if let Some(loc) = self.locs.clip_enabled[i] {
                    native.uniform_1i(loc, self.clip_enabled[i] as i32);
                }
                if let Some(loc) = self.locs.clip_plane[i] {
                    native.uniform_4f(loc, self.clip_planes[i]);
                }
            }
        }

        self.dirty = Dirty { texture: false, point: false, clip: false };
    }

    /// Rebuilds the base program after a context loss and marks every piece
    /// of emulated state for upload.
    pub fn reload<N: NativeGl>(&mut self, native: &mut N) {
        self.base_program = build_base_program(native, self.dialect).unwrap_or(0);
        self.enabled = [false; 6];
        self.use_program(native, None);
    }

    /// Deletes the base program. The user program, if any, stays the
    /// caller's.
    pub fn release<N: NativeGl>(&mut self, native: &mut N) {
        if self.program == self.base_program {
            native.use_program(0);
            self.program = 0;
        }
        if self.base_program != 0 {
            native.delete_program(self.base_program);
            self.base_program = 0;
        }
    }
}

fn build_base_program<N: NativeGl>(native: &mut N, dialect: Dialect) -> Option<u32> {
    let mut shaders = Vec::with_capacity(2);
    for (kind, source) in [
        (ShaderKind::Vertex, builtin::base_vertex_shader(dialect)),
        (ShaderKind::Fragment, builtin::base_fragment_shader(dialect)),
    ] {
        let Some(shader) = native.create_shader(kind) else {
            log::error!("failed to create the base {kind:?} shader");
            return None;
        };
        if !native.compile_shader(shader, source) {
            log::error!("base {kind:?} shader failed to compile: {}", native.shader_info_log(shader));
            native.delete_shader(shader);
            return None;
        }
        shaders.push(shader);
    }

    let program = native.create_program()?;
    for &s in &shaders {
        native.attach_shader(program, s);
    }
    let linked = native.link_program(program);
    for s in shaders {
        native.delete_shader(s);
    }
    if !linked {
        log::error!("base program failed to link: {}", native.program_info_log(program));
        native.delete_program(program);
        return None;
    }

    log::debug!("base {dialect:?} program ready (id {program})");
    Some(program)
}
