use crate::gl::native::NativeGl;
use crate::gl::types::{AttribPointer, ClientArray};

use super::MatrixOp;

/// Fixed-function backend: every call maps to its native counterpart.
#[derive(Debug, Default)]
pub(crate) struct LegacyBackend {
    client_unit: u32,
}

impl LegacyBackend {
    pub fn matrix_op<N: NativeGl>(&mut self, native: &mut N, op: MatrixOp) {
        match op {
            MatrixOp::Mode(mode) => native.ff_matrix_mode(mode),
            MatrixOp::Push => native.ff_push_matrix(),
            MatrixOp::Pop => native.ff_pop_matrix(),
            MatrixOp::Identity => native.ff_load_identity(),
            MatrixOp::Load(m) => native.ff_load_matrix(&m.m),
            MatrixOp::Mult(m) => native.ff_mult_matrix(&m.m),
            MatrixOp::Translate(x, y, z) => native.ff_translate(x, y, z),
            MatrixOp::Rotate(deg, x, y, z) => native.ff_rotate(deg, x, y, z),
            MatrixOp::Scale(x, y, z) => native.ff_scale(x, y, z),
            MatrixOp::Ortho(l, r, b, t, n, f) => native.ff_ortho(l, r, b, t, n, f),
        }
    }

    pub fn set_client_unit<N: NativeGl>(&mut self, native: &mut N, unit: u32) {
        if self.client_unit != unit {
            native.ff_client_active_texture(unit);
            self.client_unit = unit;
        }
    }

    pub fn enable_array<N: NativeGl>(&mut self, native: &mut N, array: ClientArray) {
        native.ff_enable_client_state(array);
    }

    pub fn disable_array<N: NativeGl>(&mut self, native: &mut N, array: ClientArray) {
        native.ff_disable_client_state(array);
    }

    pub fn pointer<N: NativeGl>(&mut self, native: &mut N, array: ClientArray, ptr: &AttribPointer<'_>) {
        native.ff_client_pointer(array, ptr);
    }

    /// Client-unit selection is native state and is lost with the context.
    pub fn reload(&mut self) {
        self.client_unit = 0;
    }
}
