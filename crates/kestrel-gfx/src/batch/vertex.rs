use bytemuck::{Pod, Zeroable};

use crate::coords::Vec2;
use crate::paint::Color;

/// Interleaved vertex of the batch renderer: position, texture coordinate,
/// straight RGBA8 color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct BatchVertex {
    pub pos: Vec2,
    pub tex: Vec2,
    pub color: Color,
}

impl BatchVertex {
    pub const STRIDE: usize = std::mem::size_of::<BatchVertex>();
    pub const TEX_OFFSET: usize = std::mem::size_of::<Vec2>();
    pub const COLOR_OFFSET: usize = 2 * std::mem::size_of::<Vec2>();

    #[inline]
    pub const fn new(pos: Vec2, tex: Vec2, color: Color) -> Self {
        Self { pos, tex, color }
    }
}
