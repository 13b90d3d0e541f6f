//! Color and blending.

pub mod blend;
pub mod color;

pub use blend::{BlendFunc, BlendMode};
pub use color::Color;
