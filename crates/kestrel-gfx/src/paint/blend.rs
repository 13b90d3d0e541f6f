use crate::gl::{BlendEquation, BlendFactor};

/// Blend presets plus a fully specified custom mode.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Standard straight-alpha "over".
    #[default]
    Alpha,
    Add,
    Multiply,
    Screen,
    /// Blending disabled; source replaces destination.
    None,
    Custom(BlendFunc),
}

/// Separate color/alpha factors and equations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub eq_rgb: BlendEquation,
    pub eq_alpha: BlendEquation,
}

impl BlendFunc {
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            src_rgb: src,
            dst_rgb: dst,
            src_alpha: src,
            dst_alpha: dst,
            eq_rgb: BlendEquation::Add,
            eq_alpha: BlendEquation::Add,
        }
    }

    /// Whether color and alpha use different factors.
    #[inline]
    pub fn is_separate(&self) -> bool {
        self.src_rgb != self.src_alpha || self.dst_rgb != self.dst_alpha
    }
}

impl BlendMode {
    /// Factors for this mode; `None` when blending is disabled.
    pub fn func(self) -> Option<BlendFunc> {
        use BlendFactor::*;
        match self {
            BlendMode::Alpha => Some(BlendFunc {
                src_alpha: One,
                ..BlendFunc::new(SrcAlpha, OneMinusSrcAlpha)
            }),
            BlendMode::Add => Some(BlendFunc::new(SrcAlpha, One)),
            BlendMode::Multiply => Some(BlendFunc::new(DstColor, Zero)),
            BlendMode::Screen => Some(BlendFunc::new(One, OneMinusSrcColor)),
            BlendMode::None => None,
            BlendMode::Custom(f) => Some(f),
        }
    }
}
