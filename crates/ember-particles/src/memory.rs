//! CPU-memory GPU backend for headless runs and tests
//!
//! Buffers are plain byte vectors. State is shared between clones so a
//! caller can keep a handle on the backend after moving a clone into an
//! emitter, and still observe uploads, draws and the final release.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ember_core::{EmberError, Result};

use crate::backend::{DrawCall, GpuBackend};
use crate::particle::SpriteVertex;

/// Handle to a buffer owned by a [`MemoryBackend`]
#[derive(Debug, PartialEq, Eq)]
pub struct MemoryBuffer(u32);

impl MemoryBuffer {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// A recorded backend call
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    Allocate { buffer: u32, size: u64 },
    Upload { buffer: u32, offset: u64, len: usize },
    Draw { buffer: u32, call: DrawCall },
    Release { buffer: u32 },
}

#[derive(Default)]
struct MemoryState {
    buffers: HashMap<u32, Vec<u8>>,
    next_id: u32,
    record_calls: bool,
    calls: Vec<BackendCall>,
    uploads: usize,
    draws: usize,
    releases: usize,
    bytes_uploaded: u64,
    last_draw: Option<DrawCall>,
}

impl MemoryState {
    fn record(&mut self, call: BackendCall) {
        if self.record_calls {
            self.calls.push(call);
        }
    }
}

#[derive(Clone)]
pub struct MemoryBackend {
    state: Rc<RefCell<MemoryState>>,
    vertex_streaming: bool,
    /// Bytes withheld from every allocation, to exercise size checks
    shortfall: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MemoryState::default())),
            vertex_streaming: true,
            shortfall: 0,
        }
    }

    /// Keep a log of every call, readable through [`MemoryBackend::calls`]
    pub fn with_call_log(self) -> Self {
        self.state.borrow_mut().record_calls = true;
        self
    }

    /// Report streaming buffers as unsupported
    pub fn without_vertex_streaming(mut self) -> Self {
        self.vertex_streaming = false;
        self
    }

    /// Allocate `bytes` less than requested
    pub fn with_allocation_shortfall(mut self, bytes: u64) -> Self {
        self.shortfall = bytes;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state.borrow().calls.clone()
    }

    pub fn upload_count(&self) -> usize {
        self.state.borrow().uploads
    }

    pub fn draw_count(&self) -> usize {
        self.state.borrow().draws
    }

    pub fn release_count(&self) -> usize {
        self.state.borrow().releases
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.state.borrow().bytes_uploaded
    }

    pub fn last_draw(&self) -> Option<DrawCall> {
        self.state.borrow().last_draw
    }

    /// Number of buffers allocated and not yet released
    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Decode the first `count` vertices stored in buffer `id`
    pub fn read_vertices(&self, id: u32, count: usize) -> Vec<SpriteVertex> {
        let state = self.state.borrow();
        let Some(bytes) = state.buffers.get(&id) else {
            return Vec::new();
        };
        bytes
            .chunks_exact(std::mem::size_of::<SpriteVertex>())
            .take(count)
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for MemoryBackend {
    type Buffer = MemoryBuffer;

    fn supports_vertex_streaming(&self) -> bool {
        self.vertex_streaming
    }

    fn allocate(&mut self, size: u64) -> Result<MemoryBuffer> {
        let actual = size.saturating_sub(self.shortfall);
        let len = usize::try_from(actual)
            .map_err(|_| EmberError::CapabilityMissing(format!("{size}-byte buffer")))?;

        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.buffers.insert(id, vec![0; len]);
        state.record(BackendCall::Allocate { buffer: id, size });
        Ok(MemoryBuffer(id))
    }

    fn buffer_size(&self, buffer: &MemoryBuffer) -> u64 {
        self.state
            .borrow()
            .buffers
            .get(&buffer.0)
            .map_or(0, |bytes| bytes.len() as u64)
    }

    fn upload(&mut self, buffer: &MemoryBuffer, offset: u64, bytes: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(target) = state.buffers.get_mut(&buffer.0) else {
            log::warn!("upload to unknown buffer {}", buffer.0);
            return;
        };
        let start = (offset as usize).min(target.len());
        let end = (start + bytes.len()).min(target.len());
        if end - start < bytes.len() {
            log::warn!(
                "upload of {} bytes at {offset} overruns buffer {} ({} bytes)",
                bytes.len(),
                buffer.0,
                target.len()
            );
        }
        target[start..end].copy_from_slice(&bytes[..end - start]);

        state.uploads += 1;
        state.bytes_uploaded += bytes.len() as u64;
        state.record(BackendCall::Upload {
            buffer: buffer.0,
            offset,
            len: bytes.len(),
        });
    }

    fn draw(&mut self, buffer: &MemoryBuffer, call: DrawCall) {
        let mut state = self.state.borrow_mut();
        state.draws += 1;
        state.last_draw = Some(call);
        state.record(BackendCall::Draw {
            buffer: buffer.0,
            call,
        });
    }

    fn release(&mut self, buffer: MemoryBuffer) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(&buffer.0).is_some() {
            state.releases += 1;
        }
        state.record(BackendCall::Release { buffer: buffer.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PrimitiveKind;
    use crate::texture::TextureId;

    #[test]
    fn allocate_upload_release() {
        let mut backend = MemoryBackend::new().with_call_log();
        let buffer = backend.allocate(40).unwrap();
        assert_eq!(backend.buffer_size(&buffer), 40);

        let vertex = SpriteVertex {
            position: [1.0, 2.0],
            tex_coords: [0.0, 1.0],
            color: [255, 0, 0, 255],
        };
        backend.upload(&buffer, 0, bytemuck::bytes_of(&vertex));
        assert_eq!(backend.read_vertices(buffer.id(), 1), vec![vertex]);

        let id = buffer.id();
        backend.release(buffer);
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(
            backend.calls(),
            vec![
                BackendCall::Allocate { buffer: id, size: 40 },
                BackendCall::Upload {
                    buffer: id,
                    offset: 0,
                    len: 20
                },
                BackendCall::Release { buffer: id },
            ]
        );
    }

    #[test]
    fn shortfall_shrinks_allocation() {
        let mut backend = MemoryBackend::new().with_allocation_shortfall(8);
        let buffer = backend.allocate(40).unwrap();
        assert_eq!(backend.buffer_size(&buffer), 32);
    }

    #[test]
    fn draws_are_counted_without_log() {
        let mut backend = MemoryBackend::new();
        let buffer = backend.allocate(80).unwrap();
        let call = DrawCall {
            texture: TextureId(0),
            primitive: PrimitiveKind::Quads,
            vertex_count: 4,
        };
        backend.draw(&buffer, call);
        assert_eq!(backend.draw_count(), 1);
        assert_eq!(backend.last_draw(), Some(call));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let observer = MemoryBackend::new();
        let mut backend = observer.clone();
        let buffer = backend.allocate(20).unwrap();
        assert_eq!(observer.live_buffers(), 1);
        backend.release(buffer);
        assert_eq!(observer.release_count(), 1);
    }
}
