use crate::gl::{FillMode, PrimitiveType};
use crate::paint::BlendMode;

/// GL state an open batch was started with. Every vertex of a batch is drawn
/// under exactly this state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BatchState {
    pub texture: Option<u32>,
    pub shader: Option<u32>,
    pub blend: BlendMode,
    pub mode: PrimitiveType,
    pub fill: FillMode,
}

impl Default for BatchState {
    fn default() -> Self {
        Self {
            texture: None,
            shader: None,
            blend: BlendMode::Alpha,
            mode: PrimitiveType::Quads,
            fill: FillMode::Fill,
        }
    }
}

/// Whether switching from `open` to `requested` must submit the `pending`
/// vertices first. Makes no GL calls.
#[inline]
pub fn needs_flush(open: &BatchState, pending: usize, requested: &BatchState) -> bool {
    pending > 0 && open != requested
}

/// Whether `adding` more vertices overflow a batch capped at `max` that
/// already holds `pending`.
#[inline]
pub fn exceeds_capacity(pending: usize, adding: usize, max: usize) -> bool {
    pending > 0 && pending + adding > max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_never_flushes() {
        let a = BatchState::default();
        let b = BatchState { texture: Some(3), ..a };
        assert!(!needs_flush(&a, 0, &b));
    }

    #[test]
    fn every_tracked_field_flushes() {
        let a = BatchState::default();
        let changes = [
            BatchState { texture: Some(1), ..a },
            BatchState { shader: Some(7), ..a },
            BatchState { blend: BlendMode::Add, ..a },
            BatchState { mode: PrimitiveType::Triangles, ..a },
            BatchState { fill: FillMode::Line, ..a },
        ];
        for b in changes {
            assert!(needs_flush(&a, 4, &b), "{b:?}");
        }
        assert!(!needs_flush(&a, 4, &a));
    }

    #[test]
    fn capacity() {
        assert!(!exceeds_capacity(0, 10_000, 4096));
        assert!(!exceeds_capacity(4090, 6, 4096));
        assert!(exceeds_capacity(4092, 6, 4096));
    }
}
