//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the windows, each with its GPU surface and
//! graphics context.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
