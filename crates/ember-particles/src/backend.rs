//! GPU buffer backend interface consumed by the emitter

use ember_core::Result;

use crate::texture::TextureId;

/// How the backend should assemble uploaded vertices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    /// Every four consecutive vertices form one quad
    /// (left-top, right-top, right-bottom, left-bottom).
    Quads,
}

/// One draw over a previously uploaded vertex buffer
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    pub texture: TextureId,
    pub primitive: PrimitiveKind,
    pub vertex_count: u32,
}

/// Minimal buffer-object API: allocate, upload, draw, release.
///
/// An emitter allocates exactly one buffer at construction and releases it
/// exactly once when dropped. Allocation is the only fallible call.
pub trait GpuBackend {
    type Buffer;

    /// Whether streaming vertex buffers are available at all
    fn supports_vertex_streaming(&self) -> bool;

    /// Allocate a buffer of `size` bytes with undefined contents
    fn allocate(&mut self, size: u64) -> Result<Self::Buffer>;

    /// Size the backend actually reserved for `buffer`
    fn buffer_size(&self, buffer: &Self::Buffer) -> u64;

    /// Copy `bytes` into `buffer` starting at `offset`
    fn upload(&mut self, buffer: &Self::Buffer, offset: u64, bytes: &[u8]);

    /// Draw the first `call.vertex_count` vertices of `buffer`
    fn draw(&mut self, buffer: &Self::Buffer, call: DrawCall);

    fn release(&mut self, buffer: Self::Buffer);
}
