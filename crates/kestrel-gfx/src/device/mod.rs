//! The wgpu native device.
//!
//! [`Gpu`] owns the wgpu device and the window surface. [`WgpuGl`] is the
//! [`NativeGl`](crate::gl::NativeGl) a [`GlContext`](crate::gl::GlContext)
//! drives on top of it, and [`GlReplay`] puts each of its frames on screen.

mod gpu;
mod replay;
mod wgpu_gl;

pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
pub use replay::GlReplay;
pub use wgpu_gl::{WgpuGl, WGPU_GL_VERSION};
