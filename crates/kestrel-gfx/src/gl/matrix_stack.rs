use crate::coords::Mat4;

use super::types::MatrixMode;

/// Upper bound per stack; the legacy API guarantees at least 32 model-view entries.
pub const MAX_STACK_DEPTH: usize = 32;

/// CPU copy of the model-view, projection and texture stacks.
///
/// Every mutation of a stack's top marks that mode dirty. The emulation
/// backends consume the flags right before a draw so each matrix is uploaded
/// at most once per draw.
#[derive(Debug, Clone)]
pub struct MatrixStacks {
    mode: MatrixMode,
    stacks: [Vec<Mat4>; 3],
    dirty: [bool; 3],
}

impl Default for MatrixStacks {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStacks {
    pub fn new() -> Self {
        Self {
            mode: MatrixMode::ModelView,
            stacks: [vec![Mat4::IDENTITY], vec![Mat4::IDENTITY], vec![Mat4::IDENTITY]],
            dirty: [true; 3],
        }
    }

    #[inline]
    pub fn mode(&self) -> MatrixMode {
        self.mode
    }

    #[inline]
    pub fn set_mode(&mut self, mode: MatrixMode) {
        self.mode = mode;
    }

    #[inline]
    pub fn current(&self, mode: MatrixMode) -> Mat4 {
        // Stacks never drop below one entry.
        self.stacks[mode.index()].last().copied().unwrap_or(Mat4::IDENTITY)
    }

    #[inline]
    pub fn depth(&self, mode: MatrixMode) -> usize {
        self.stacks[mode.index()].len()
    }

    fn top_mut(&mut self) -> &mut Mat4 {
        let i = self.mode.index();
        self.dirty[i] = true;
        let stack = &mut self.stacks[i];
        if stack.is_empty() {
            stack.push(Mat4::IDENTITY);
        }
        let last = stack.len() - 1;
        &mut stack[last]
    }

    /// Duplicates the top of the active stack. Returns `false` on overflow.
    pub fn push(&mut self) -> bool {
        let i = self.mode.index();
        let stack = &mut self.stacks[i];
        if stack.len() >= MAX_STACK_DEPTH {
            log::error!("matrix stack overflow ({:?}, depth {})", self.mode, stack.len());
            return false;
        }
        let top = stack.last().copied().unwrap_or(Mat4::IDENTITY);
        stack.push(top);
        true
    }

    /// Discards the top of the active stack. Returns `false` on underflow,
    /// leaving the stack untouched.
    pub fn pop(&mut self) -> bool {
        let i = self.mode.index();
        let stack = &mut self.stacks[i];
        if stack.len() <= 1 {
            log::error!("matrix stack underflow ({:?})", self.mode);
            return false;
        }
        stack.pop();
        self.dirty[i] = true;
        true
    }

    pub fn load_identity(&mut self) {
        *self.top_mut() = Mat4::IDENTITY;
    }

    pub fn load(&mut self, m: Mat4) {
        *self.top_mut() = m;
    }

    /// Post-multiplies the active top: `top = top * m`.
    pub fn mult(&mut self, m: Mat4) {
        let top = self.top_mut();
        *top = *top * m;
    }

    /// Returns and clears the dirty flag of `mode`.
    #[inline]
    pub fn take_dirty(&mut self, mode: MatrixMode) -> bool {
        std::mem::replace(&mut self.dirty[mode.index()], false)
    }

    #[inline]
    pub fn is_dirty(&self, mode: MatrixMode) -> bool {
        self.dirty[mode.index()]
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty = [true; 3];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_transform_pop_restores_matrix() {
        let mut s = MatrixStacks::new();
        s.mult(Mat4::translation(3.0, 4.0, 0.0));
        let before = s.current(MatrixMode::ModelView);

        assert!(s.push());
        s.mult(Mat4::rotation(45.0, 0.0, 0.0, 1.0));
        s.mult(Mat4::scaling(2.0, 3.0, 1.0));
        s.mult(Mat4::translation(-7.0, 1.0, 0.0));
        assert!(s.pop());

        assert!(s.current(MatrixMode::ModelView).approx_eq(&before, 1e-6));
    }

    #[test]
    fn modes_are_independent() {
        let mut s = MatrixStacks::new();
        s.set_mode(MatrixMode::Projection);
        s.load(Mat4::ortho(0.0, 10.0, 10.0, 0.0, -1.0, 1.0));
        assert_eq!(s.current(MatrixMode::ModelView), Mat4::IDENTITY);
        assert_ne!(s.current(MatrixMode::Projection), Mat4::IDENTITY);
    }

    #[test]
    fn pop_on_last_entry_is_refused() {
        let mut s = MatrixStacks::new();
        s.load(Mat4::translation(1.0, 0.0, 0.0));
        assert!(!s.pop());
        assert_eq!(s.depth(MatrixMode::ModelView), 1);
        assert_eq!(s.current(MatrixMode::ModelView), Mat4::translation(1.0, 0.0, 0.0));
    }

    #[test]
    fn dirty_flags_are_consumed_once() {
        let mut s = MatrixStacks::new();
        assert!(s.take_dirty(MatrixMode::ModelView));
        assert!(!s.take_dirty(MatrixMode::ModelView));

        s.mult(Mat4::scaling(2.0, 2.0, 1.0));
        assert!(s.is_dirty(MatrixMode::ModelView));
        assert!(s.take_dirty(MatrixMode::ModelView));
        assert!(!s.is_dirty(MatrixMode::ModelView));
    }

    #[test]
    fn push_stops_at_max_depth() {
        let mut s = MatrixStacks::new();
        for _ in 1..MAX_STACK_DEPTH {
            assert!(s.push());
        }
        assert!(!s.push());
        assert_eq!(s.depth(MatrixMode::ModelView), MAX_STACK_DEPTH);
    }
}
