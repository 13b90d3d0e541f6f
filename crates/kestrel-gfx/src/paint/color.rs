/// Straight-alpha RGBA color, one byte per channel.
///
/// This is the per-vertex color format of the batcher and vertex buffers
/// (uploaded as normalized `u8x4`).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    pub const RED: Color = Color::rgba(255, 0, 0, 255);
    pub const GREEN: Color = Color::rgba(0, 255, 0, 255);
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Parses `0xRRGGBBAA`.
    #[inline]
    pub const fn from_hex(v: u32) -> Self {
        Self::rgba((v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8)
    }

    /// Builds a color from `[0, 1]` floats; out-of-range values are clamped.
    pub fn from_f32(rgba: [f32; 4]) -> Self {
        fn f(v: f32) -> u8 {
            (v.clamp(0.0, 1.0) * 255.0 + 0.5).floor() as u8
        }
        Self::rgba(f(rgba[0]), f(rgba[1]), f(rgba[2]), f(rgba[3]))
    }

    #[inline]
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }
}

impl From<[u8; 4]> for Color {
    #[inline]
    fn from(v: [u8; 4]) -> Self {
        Color::rgba(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_rrggbbaa() {
        assert_eq!(Color::from_hex(0x11223344), Color::rgba(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn float_conversion_clamps_and_rounds() {
        assert_eq!(Color::from_f32([1.5, 0.5, -1.0, 1.0]), Color::rgba(255, 128, 0, 255));
        assert_eq!(Color::RED.to_f32(), [1.0, 0.0, 0.0, 1.0]);
    }
}
