//! GL state abstraction.
//!
//! [`GlContext`] tracks state on the CPU and drives a [`NativeGl`] through
//! one of three backends picked from [`GlVersion`]:
//! legacy fixed function, core-profile emulation or mobile emulation.

mod backend;
mod caps;
mod check;
mod clip;
mod context;
mod global;
mod matrix_stack;
mod native;
mod types;

pub use caps::{Capabilities, Extension, GlVersion};
pub use clip::{ClipStack, DEFAULT_CLIP_DEPTH};
pub use context::{GlConfig, GlContext, GlState};
pub use global::{create_singleton, destroy_singleton, exists, with_instance};
pub use matrix_stack::{MatrixStacks, MAX_STACK_DEPTH};
pub use native::NativeGl;
pub use types::*;
