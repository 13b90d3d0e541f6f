//! The three backends behind a `GlContext`, as one closed variant.
//!
//! - `Legacy` forwards to the fixed-function entry points.
//! - `Core` emulates fixed function with shaders and streams client memory
//!   into internal buffer objects.
//! - `Mobile` emulates fixed function with shaders and passes client memory
//!   straight through.

mod emulated;
mod legacy;
mod stream;

use crate::coords::Mat4;
use crate::shader::Dialect;

use super::caps::GlVersion;
use super::matrix_stack::MatrixStacks;
use super::native::NativeGl;
use super::types::{AttribData, AttribPointer, BufferTarget, ClientArray, MatrixMode};

pub(crate) use emulated::Emulation;
pub(crate) use legacy::LegacyBackend;
pub(crate) use stream::StreamBuffers;

/// A matrix call, recorded so the legacy backend can replay it natively.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum MatrixOp {
    Mode(MatrixMode),
    Push,
    Pop,
    Identity,
    Load(Mat4),
    Mult(Mat4),
    Translate(f32, f32, f32),
    Rotate(f32, f32, f32, f32),
    Scale(f32, f32, f32),
    Ortho(f32, f32, f32, f32, f32, f32),
}

pub(crate) struct CoreBackend {
    pub emu: Emulation,
    pub streams: StreamBuffers,
}

pub(crate) struct MobileBackend {
    pub emu: Emulation,
}

pub(crate) enum Backend {
    Legacy(LegacyBackend),
    Core(CoreBackend),
    Mobile(MobileBackend),
}

impl Backend {
    pub fn new<N: NativeGl>(native: &mut N, version: GlVersion) -> Self {
        match version {
            GlVersion::Legacy => Backend::Legacy(LegacyBackend::default()),
            GlVersion::Core => Backend::Core(CoreBackend {
                emu: Emulation::new(native, Dialect::Glsl330),
                streams: StreamBuffers::default(),
            }),
            GlVersion::Mobile => Backend::Mobile(MobileBackend {
                emu: Emulation::new(native, Dialect::GlslEs100),
            }),
        }
    }

    pub fn emulation(&mut self) -> Option<&mut Emulation> {
        match self {
            Backend::Legacy(_) => None,
            Backend::Core(b) => Some(&mut b.emu),
            Backend::Mobile(b) => Some(&mut b.emu),
        }
    }

    pub fn emulation_ref(&self) -> Option<&Emulation> {
        match self {
            Backend::Legacy(_) => None,
            Backend::Core(b) => Some(&b.emu),
            Backend::Mobile(b) => Some(&b.emu),
        }
    }

    /// Legacy replays the call natively; the emulation backends rely on the
    /// dirty flags the CPU stacks already set.
    pub fn matrix_op<N: NativeGl>(&mut self, native: &mut N, op: MatrixOp) {
        if let Backend::Legacy(b) = self {
            b.matrix_op(native, op);
        }
    }

    pub fn client_active_texture<N: NativeGl>(&mut self, native: &mut N, unit: u32) {
        match self {
            Backend::Legacy(b) => b.set_client_unit(native, unit),
            Backend::Core(b) => b.emu.set_client_unit(unit as usize),
            Backend::Mobile(b) => b.emu.set_client_unit(unit as usize),
        }
    }

    pub fn enable_client_state<N: NativeGl>(&mut self, native: &mut N, array: ClientArray) {
        match self {
            Backend::Legacy(b) => b.enable_array(native, array),
            Backend::Core(b) => b.emu.enable_array(native, array),
            Backend::Mobile(b) => b.emu.enable_array(native, array),
        }
    }

    pub fn disable_client_state<N: NativeGl>(&mut self, native: &mut N, array: ClientArray) {
        match self {
            Backend::Legacy(b) => b.disable_array(native, array),
            Backend::Core(b) => b.emu.disable_array(native, array),
            Backend::Mobile(b) => b.emu.disable_array(native, array),
        }
    }

    /// Specifies a vertex stream. `bound_array` is the caller-visible array
    /// buffer binding, restored after the core backend streams client data.
    pub fn pointer<N: NativeGl>(
        &mut self,
        native: &mut N,
        array: ClientArray,
        ptr: &AttribPointer<'_>,
        bound_array: u32,
    ) {
        match self {
            Backend::Legacy(b) => b.pointer(native, array, ptr),
            Backend::Mobile(b) => b.emu.pointer(native, array, ptr),
            Backend::Core(b) => {
                let AttribData::Client(bytes) = ptr.data else {
                    b.emu.pointer(native, array, ptr);
                    return;
                };
                let (slot, loc) = b.emu.pointer_target(array);
                if loc.is_none() {
                    return;
                }
                if b.streams.upload_attrib(native, slot, bytes).is_some() {
                    let streamed = AttribPointer {
                        data: AttribData::Offset(0),
                        ..*ptr
                    };
                    b.emu.pointer(native, array, &streamed);
                }
                native.bind_buffer(BufferTarget::Array, bound_array);
            }
        }
    }

    /// Applies emulated state right before a draw call.
    pub fn before_draw<N: NativeGl>(&mut self, native: &mut N, matrices: &mut MatrixStacks) {
        match self {
            Backend::Legacy(_) => {
                for mode in MatrixMode::ALL {
                    matrices.take_dirty(mode);
                }
            }
            Backend::Core(b) => b.emu.before_draw(native, matrices),
            Backend::Mobile(b) => b.emu.before_draw(native, matrices),
        }
    }

    /// Re-creates backend-owned GPU objects after a context loss.
    pub fn reload<N: NativeGl>(&mut self, native: &mut N) {
        match self {
            Backend::Legacy(b) => b.reload(),
            Backend::Core(b) => {
                b.streams.forget();
                b.emu.reload(native);
            }
            Backend::Mobile(b) => b.emu.reload(native),
        }
    }

    /// Deletes backend-owned GPU objects: streaming buffers and the base
    /// program.
    pub fn release<N: NativeGl>(&mut self, native: &mut N) {
        match self {
            Backend::Legacy(_) => {}
            Backend::Core(b) => {
                b.streams.release(native);
                b.emu.release(native);
            }
            Backend::Mobile(b) => b.emu.release(native),
        }
    }
}
