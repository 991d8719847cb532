//! wgpu implementation of the particle buffer backend
//!
//! Emitters upload and record draws through [`WgpuBackend`]; the recorded
//! draws are replayed into a render pass by [`WgpuBackend::encode`].

use crate::context::GpuContext;
use crate::sprite_pipeline::{quad_indices, SpritePipeline};
use crate::textures::SpriteTextures;
use ember_core::{EmberError, Result};
use ember_particles::{DrawCall, GpuBackend, PrimitiveKind, SpriteVertex, VERTICES_PER_PARTICLE};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Vertex attributes the sprite pipeline consumes
const REQUIRED_VERTEX_ATTRIBUTES: u32 = 3;

/// Handle to a vertex buffer owned by a [`WgpuBackend`]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct WgpuBuffer(u32);

struct BufferSlot {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct PendingDraw {
    buffer: u32,
    call: DrawCall,
}

pub struct WgpuBackend {
    context: Arc<GpuContext>,
    slots: HashMap<u32, BufferSlot>,
    next_id: u32,
    pending: Vec<PendingDraw>,
}

impl WgpuBackend {
    pub fn new(context: Arc<GpuContext>) -> Self {
        Self {
            context,
            slots: HashMap::new(),
            next_id: 0,
            pending: Vec::new(),
        }
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    /// Draws recorded since the last [`WgpuBackend::encode`]
    pub fn pending_draws(&self) -> usize {
        self.pending.len()
    }

    /// End a frame that is not rendered: drop its draws and submit so the
    /// queue releases the staging memory of this frame's uploads.
    pub fn skip_frame(&mut self) {
        self.pending.clear();
        self.context.queue.submit(std::iter::empty());
        self.context.device.poll(wgpu::Maintain::Poll);
    }

    /// Replay recorded draws into a render pass targeting `view`, then
    /// forget them. `clear` wipes the target first; `None` loads it.
    pub fn encode(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        pipeline: &SpritePipeline,
        textures: &SpriteTextures,
        clear: Option<wgpu::Color>,
    ) {
        let load = match clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Sprite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, &pipeline.viewport_bind_group, &[]);

            for draw in &self.pending {
                let Some(slot) = self.slots.get(&draw.buffer) else {
                    continue;
                };
                let Some(bind_group) = textures.bind_group(draw.call.texture) else {
                    log::warn!("skipping draw with unknown texture {}", draw.call.texture.0);
                    continue;
                };
                let index_count = match draw.call.primitive {
                    PrimitiveKind::Quads => draw.call.vertex_count / 4 * 6,
                };

                pass.set_bind_group(1, bind_group, &[]);
                pass.set_vertex_buffer(0, slot.vertices.slice(..));
                pass.set_index_buffer(slot.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..index_count, 0, 0..1);
            }
        }

        self.pending.clear();
    }
}

impl GpuBackend for WgpuBackend {
    type Buffer = WgpuBuffer;

    fn supports_vertex_streaming(&self) -> bool {
        let limits = self.context.device.limits();
        limits.max_vertex_buffers >= 1
            && limits.max_vertex_attributes >= REQUIRED_VERTEX_ATTRIBUTES
            && limits.max_vertex_buffer_array_stride >= std::mem::size_of::<SpriteVertex>() as u32
    }

    fn allocate(&mut self, size: u64) -> Result<WgpuBuffer> {
        let max = self.context.device.limits().max_buffer_size;
        if size > max {
            return Err(EmberError::CapabilityMissing(format!(
                "vertex buffer of {size} bytes exceeds device limit of {max}"
            )));
        }

        let vertex_size = std::mem::size_of::<SpriteVertex>() as u64;
        let quads = (size / (vertex_size * VERTICES_PER_PARTICLE as u64)) as usize;

        let vertices = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Vertex Buffer"),
            size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indices = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Index Buffer"),
                contents: bytemuck::cast_slice(&quad_indices(quads.max(1))),
                usage: wgpu::BufferUsages::INDEX,
            });

        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert(id, BufferSlot { vertices, indices });
        Ok(WgpuBuffer(id))
    }

    fn buffer_size(&self, buffer: &WgpuBuffer) -> u64 {
        self.slots
            .get(&buffer.0)
            .map(|slot| slot.vertices.size())
            .unwrap_or(0)
    }

    fn upload(&mut self, buffer: &WgpuBuffer, offset: u64, bytes: &[u8]) {
        if let Some(slot) = self.slots.get(&buffer.0) {
            self.context.queue.write_buffer(&slot.vertices, offset, bytes);
        }
    }

    fn draw(&mut self, buffer: &WgpuBuffer, call: DrawCall) {
        self.pending.push(PendingDraw {
            buffer: buffer.0,
            call,
        });
    }

    fn release(&mut self, buffer: WgpuBuffer) {
        self.pending.retain(|draw| draw.buffer != buffer.0);
        if let Some(slot) = self.slots.remove(&buffer.0) {
            slot.vertices.destroy();
            slot.indices.destroy();
        }
    }
}
