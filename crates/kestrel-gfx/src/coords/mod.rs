//! Geometry types shared by the GL state layer, the batcher and the shape layer.
//!
//! Canonical 2D space (after `GlContext::set_ortho_2d`):
//! - origin top-left
//! - +X right, +Y down
//!
//! Matrices follow GL conventions: column-major storage, column vectors,
//! `A * B` applies `B` first.

mod mat4;
mod rect;
mod vec2;
mod viewport;

pub use mat4::Mat4;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
