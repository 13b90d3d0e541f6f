//! Shader objects and linked programs.
//!
//! Sources written against the legacy built-ins are rewritten for the
//! context's GLSL dialect before compilation, see [`convert`].

pub mod builtin;
pub mod convert;
pub(crate) mod reflect;

mod program;
mod shader;

pub use program::ShaderProgram;
pub use shader::Shader;

use crate::gl::GlVersion;

/// GLSL flavor accepted by a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `#version 120`, legacy built-ins available.
    Glsl120,
    /// `#version 330`, no built-ins.
    Glsl330,
    /// GLSL ES 1.00.
    GlslEs100,
}

impl Dialect {
    pub fn from_version(version: GlVersion) -> Self {
        match version {
            GlVersion::Legacy => Dialect::Glsl120,
            GlVersion::Core => Dialect::Glsl330,
            GlVersion::Mobile => Dialect::GlslEs100,
        }
    }
}
