use bitflags::bitflags;

bitflags! {
    /// Per-vertex streams a [`VertexBuffer`](super::VertexBuffer) carries.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct VertexFlags: u32 {
        const POSITION = 1 << 0;
        const TEXTURE0 = 1 << 1;
        const TEXTURE1 = 1 << 2;
        const TEXTURE2 = 1 << 3;
        const TEXTURE3 = 1 << 4;
        const COLOR = 1 << 5;
        /// Draw through the index array instead of vertex order.
        const USE_INDICES = 1 << 6;

        /// Textured, colored geometry.
        const DEFAULT = Self::POSITION.bits() | Self::TEXTURE0.bits() | Self::COLOR.bits();
        /// Untextured, colored geometry.
        const PRIMITIVE = Self::POSITION.bits() | Self::COLOR.bits();
    }
}

impl Default for VertexFlags {
    fn default() -> Self {
        VertexFlags::DEFAULT
    }
}

/// Number of texture-coordinate sets a buffer can hold.
pub const MAX_TEXTURE_UNITS: usize = 4;

/// One per-vertex data stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexStream {
    Position,
    /// Texture coordinates for unit `0..MAX_TEXTURE_UNITS`.
    TexCoord(u8),
    Color,
}

impl VertexStream {
    pub const ALL: [VertexStream; 6] = [
        VertexStream::Position,
        VertexStream::TexCoord(0),
        VertexStream::TexCoord(1),
        VertexStream::TexCoord(2),
        VertexStream::TexCoord(3),
        VertexStream::Color,
    ];

    pub fn flag(self) -> VertexFlags {
        match self {
            VertexStream::Position => VertexFlags::POSITION,
            VertexStream::TexCoord(0) => VertexFlags::TEXTURE0,
            VertexStream::TexCoord(1) => VertexFlags::TEXTURE1,
            VertexStream::TexCoord(2) => VertexFlags::TEXTURE2,
            VertexStream::TexCoord(_) => VertexFlags::TEXTURE3,
            VertexStream::Color => VertexFlags::COLOR,
        }
    }

    /// Slot in per-stream tables, matching the order of [`ALL`](Self::ALL).
    #[inline]
    pub(crate) fn slot(self) -> usize {
        match self {
            VertexStream::Position => 0,
            VertexStream::TexCoord(unit) => 1 + (unit as usize).min(MAX_TEXTURE_UNITS - 1),
            VertexStream::Color => 5,
        }
    }
}

impl VertexFlags {
    /// Streams enabled in `self`, position first.
    pub fn streams(self) -> impl Iterator<Item = VertexStream> {
        VertexStream::ALL.into_iter().filter(move |s| self.contains(s.flag()))
    }

    pub fn is_textured(self) -> bool {
        self.intersects(VertexFlags::TEXTURE0 | VertexFlags::TEXTURE1 | VertexFlags::TEXTURE2 | VertexFlags::TEXTURE3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert!(VertexFlags::DEFAULT.is_textured());
        assert!(!VertexFlags::PRIMITIVE.is_textured());
        assert_eq!(VertexFlags::default(), VertexFlags::DEFAULT);
    }

    #[test]
    fn streams_follow_slot_order() {
        let streams: Vec<_> = (VertexFlags::COLOR | VertexFlags::POSITION | VertexFlags::TEXTURE1).streams().collect();
        assert_eq!(streams, vec![VertexStream::Position, VertexStream::TexCoord(1), VertexStream::Color]);
        for (i, s) in VertexStream::ALL.iter().enumerate() {
            assert_eq!(s.slot(), i);
        }
    }
}
