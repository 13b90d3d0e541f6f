use crate::gl::native::NativeGl;
use crate::gl::types::{BufferTarget, BufferUsage};

/// Number of attribute slots streamed: vertex, color and four texture units.
pub(crate) const STREAM_SLOTS: usize = 6;

#[derive(Debug, Copy, Clone, Default)]
struct StreamSlot {
    buffer: u32,
    capacity: usize,
}

/// Internal buffers the core backend copies client memory into, since core
/// profiles accept attribute data only from buffer objects.
#[derive(Debug, Default)]
pub(crate) struct StreamBuffers {
    slots: [StreamSlot; STREAM_SLOTS],
    index: StreamSlot,
}

impl StreamBuffers {
    /// Uploads `bytes` into the attribute stream `slot`, leaving its buffer
    /// bound to `BufferTarget::Array`. `None` when no buffer could be created.
    pub fn upload_attrib<N: NativeGl>(&mut self, native: &mut N, slot: usize, bytes: &[u8]) -> Option<u32> {
        let slot = self.slots.get_mut(slot)?;
        upload(native, slot, BufferTarget::Array, bytes)
    }

    /// Uploads client indices, leaving the buffer bound to `ElementArray`.
    pub fn upload_indices<N: NativeGl>(&mut self, native: &mut N, indices: &[u32]) -> Option<u32> {
        upload(native, &mut self.index, BufferTarget::ElementArray, bytemuck::cast_slice(indices))
    }

    pub fn release<N: NativeGl>(&mut self, native: &mut N) {
        for slot in self.slots.iter_mut().chain(std::iter::once(&mut self.index)) {
            if slot.buffer != 0 {
                native.delete_buffer(slot.buffer);
            }
            *slot = StreamSlot::default();
        }
    }

    /// Drops every handle without deleting it; used after a context loss.
    pub fn forget(&mut self) {
        *self = Self::default();
    }
}

fn upload<N: NativeGl>(native: &mut N, slot: &mut StreamSlot, target: BufferTarget, bytes: &[u8]) -> Option<u32> {
    if slot.buffer == 0 {
        let Some(buffer) = native.gen_buffer() else {
            log::error!("failed to create a stream buffer for client data");
            return None;
        };
        slot.buffer = buffer;
        slot.capacity = 0;
    }

    native.bind_buffer(target, slot.buffer);
    if bytes.len() > slot.capacity {
        let new_cap = bytes.len().next_power_of_two().max(4096);
        native.buffer_data(target, &vec![0u8; new_cap], BufferUsage::Stream);
        slot.capacity = new_cap;
    }
    native.buffer_sub_data(target, 0, bytes);
    Some(slot.buffer)
}
