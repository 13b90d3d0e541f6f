//! Vertex storage with a compile/draw contract over [`GlContext`](crate::gl::GlContext).

mod buffer;
mod flags;

pub use buffer::{Storage, VertexBuffer};
pub use flags::{VertexFlags, VertexStream, MAX_TEXTURE_UNITS};
pub use crate::gl::BufferUsage;
