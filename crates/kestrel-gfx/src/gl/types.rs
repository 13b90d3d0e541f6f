//! Strongly-typed stand-ins for the GL enums used by the state layer.

use std::fmt;

/// Target of the matrix operations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MatrixMode {
    ModelView,
    Projection,
    Texture,
}

impl MatrixMode {
    pub const ALL: [MatrixMode; 3] = [MatrixMode::ModelView, MatrixMode::Projection, MatrixMode::Texture];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            MatrixMode::ModelView => 0,
            MatrixMode::Projection => 1,
            MatrixMode::Texture => 2,
        }
    }
}

/// Legacy client-side vertex arrays.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ClientArray {
    Vertex,
    Color,
    /// Texture coordinates of the unit selected by `client_active_texture`.
    TexCoord,
}

/// Component type of a vertex attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComponentType {
    F32,
    U8,
}

impl ComponentType {
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            ComponentType::F32 => 4,
            ComponentType::U8 => 1,
        }
    }
}

/// Primitive assembly mode of a draw call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
    /// Native on the legacy backend only; emulated elsewhere.
    Quads,
    /// Convex polygon. Native on the legacy backend only; drawn as a fan elsewhere.
    Polygon,
}

impl PrimitiveType {
    /// Modes whose vertices form a single connected primitive, so unrelated
    /// shapes can't share a draw call.
    #[inline]
    pub const fn is_connected(self) -> bool {
        matches!(
            self,
            PrimitiveType::LineLoop
                | PrimitiveType::LineStrip
                | PrimitiveType::TriangleStrip
                | PrimitiveType::TriangleFan
                | PrimitiveType::Polygon
        )
    }

    #[inline]
    pub const fn is_line(self) -> bool {
        matches!(self, PrimitiveType::Lines | PrimitiveType::LineLoop | PrimitiveType::LineStrip)
    }
}

/// Corner order turning one quad (`v0..v3` around the perimeter) into two triangles.
pub const QUAD_TRIANGLE_ORDER: [usize; 6] = [0, 1, 2, 0, 2, 3];

/// Polygon rasterization mode.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FillMode {
    #[default]
    Fill,
    Line,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendEquation {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Server-side capabilities toggled with `enable` / `disable`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    Texture2D,
    Blend,
    ScissorTest,
    LineSmooth,
    PointSprite,
    /// User clip plane `0..MAX_CLIP_PLANES`.
    ClipPlane(u8),
}

/// Number of user clip planes exposed by every backend.
pub const MAX_CLIP_PLANES: usize = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Array,
    ElementArray,
}

/// GPU usage hint for buffer objects.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StringName {
    Vendor,
    Renderer,
    Version,
    ShadingLanguageVersion,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
}

/// Error codes reported by the native `get_error` query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GlError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    StackOverflow,
    StackUnderflow,
    OutOfMemory,
    InvalidFramebufferOperation,
}

impl fmt::Display for GlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GlError::InvalidEnum => "GL_INVALID_ENUM",
            GlError::InvalidValue => "GL_INVALID_VALUE",
            GlError::InvalidOperation => "GL_INVALID_OPERATION",
            GlError::StackOverflow => "GL_STACK_OVERFLOW",
            GlError::StackUnderflow => "GL_STACK_UNDERFLOW",
            GlError::OutOfMemory => "GL_OUT_OF_MEMORY",
            GlError::InvalidFramebufferOperation => "GL_INVALID_FRAMEBUFFER_OPERATION",
        };
        f.write_str(s)
    }
}

/// Source of attribute data for a pointer call.
///
/// `Client` bytes are captured when the pointer is specified, which is the
/// point where every draw path in this crate has its data final.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AttribData<'a> {
    Client(&'a [u8]),
    /// Byte offset into the buffer bound to `BufferTarget::Array`.
    Offset(usize),
}

/// Source of index data for `draw_elements`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum IndexData<'a> {
    Client(&'a [u32]),
    /// Byte offset into the buffer bound to `BufferTarget::ElementArray`.
    Offset(usize),
}

/// "Pointer plus stride plus type" description of one vertex stream.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AttribPointer<'a> {
    /// Components per vertex (1..=4).
    pub size: u8,
    pub ty: ComponentType,
    /// `U8` components are mapped to `[0, 1]` when set.
    pub normalized: bool,
    /// Byte distance between consecutive vertices; 0 means tightly packed.
    pub stride: usize,
    pub data: AttribData<'a>,
}

impl AttribPointer<'_> {
    #[inline]
    pub fn effective_stride(&self) -> usize {
        if self.stride == 0 {
            self.size as usize * self.ty.size()
        } else {
            self.stride
        }
    }
}

/// Expands quad index groups (4 per quad) to triangle lists (6 per quad).
/// A trailing partial quad is dropped.
pub fn quads_to_triangles(indices: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(indices.len() / 4 * 6);
    for quad in indices.chunks_exact(4) {
        out.extend(QUAD_TRIANGLE_ORDER.iter().map(|&i| quad[i]));
    }
    out
}
