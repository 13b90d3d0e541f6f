//! Kestrel graphics crate.
//!
//! A CPU-side model of 2D GL state that drives legacy fixed-function,
//! core-profile and GLES 2 devices through one API, plus the rendering layers
//! built on it: vertex buffers, an implicit batcher and shape primitives.
//!
//! Devices implement [`gl::NativeGl`]. [`headless::HeadlessGl`] rasterizes in
//! software; [`device::WgpuGl`] renders through wgpu for the windowed runtime.

pub mod coords;
pub mod paint;

pub mod gl;
pub mod shader;
pub mod vertex;
pub mod batch;
pub mod primitives;

pub mod headless;
pub mod device;

pub mod window;
pub mod core;
pub mod time;
pub mod logging;
