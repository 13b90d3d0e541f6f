use crate::coords::Rect;

/// Default maximum nesting of 2D clip rectangles.
pub const DEFAULT_CLIP_DEPTH: usize = 6;

/// Stack of effective 2D clip rectangles.
///
/// Each entry is already intersected with its parent, so the top is always
/// the region currently drawable.
#[derive(Debug, Clone)]
pub struct ClipStack {
    rects: Vec<Rect>,
    max_depth: usize,
}

impl Default for ClipStack {
    fn default() -> Self {
        Self::new(DEFAULT_CLIP_DEPTH)
    }
}

impl ClipStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            rects: Vec::with_capacity(max_depth),
            max_depth,
        }
    }

    /// Pushes `rect` intersected with the current top and returns the
    /// effective rectangle.
    ///
    /// Overflow is refused: `None` is returned and the stack is unchanged.
    pub fn push(&mut self, rect: Rect) -> Option<Rect> {
        if self.rects.len() >= self.max_depth {
            return None;
        }
        let effective = match self.rects.last() {
            Some(parent) => parent.intersect_or_empty(rect),
            None => rect.normalized(),
        };
        self.rects.push(effective);
        Some(effective)
    }

    /// Pops the top entry. Returns `false` when the stack was already empty.
    pub fn pop(&mut self) -> bool {
        self.rects.pop().is_some()
    }

    #[inline]
    pub fn top(&self) -> Option<Rect> {
        self.rects.last().copied()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.rects.len()
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_clip_is_intersection_and_pop_restores_parent() {
        let mut s = ClipStack::default();
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 25.0, 100.0, 50.0);

        assert_eq!(s.push(a), Some(a));
        assert_eq!(s.push(b), Some(Rect::new(50.0, 25.0, 50.0, 50.0)));
        assert!(s.pop());
        assert_eq!(s.top(), Some(a));
    }

    #[test]
    fn disjoint_child_clips_everything() {
        let mut s = ClipStack::default();
        s.push(Rect::new(0.0, 0.0, 10.0, 10.0));
        let e = s.push(Rect::new(20.0, 20.0, 5.0, 5.0)).unwrap();
        assert!(e.is_empty());
    }

    #[test]
    fn overflow_is_refused_without_side_effects() {
        let mut s = ClipStack::new(2);
        s.push(Rect::new(0.0, 0.0, 10.0, 10.0));
        s.push(Rect::new(1.0, 1.0, 8.0, 8.0));
        assert_eq!(s.push(Rect::new(2.0, 2.0, 2.0, 2.0)), None);
        assert_eq!(s.depth(), 2);
        assert_eq!(s.top(), Some(Rect::new(1.0, 1.0, 8.0, 8.0)));
    }

    #[test]
    fn pop_on_empty_reports_false() {
        let mut s = ClipStack::default();
        assert!(!s.pop());
    }
}
