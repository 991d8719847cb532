//! Offscreen color target for rendering sprites to an image

use crate::context::{GpuContext, RenderError};
use crate::sprite_pipeline::TARGET_FORMAT;

/// Renders to a texture instead of a window surface
pub struct RenderTarget {
    pub width: u32,
    pub height: u32,
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
}

impl RenderTarget {
    pub fn new(context: &GpuContext, width: u32, height: u32) -> Self {
        let color_texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Color Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            width,
            height,
            color_texture,
            color_view,
        }
    }

    /// Read rendered pixels back as tightly-packed RGBA bytes
    pub async fn read_pixels(&self, context: &GpuContext) -> Result<Vec<u8>, RenderError> {
        let unpadded_bytes_per_row = self.width * 4;
        let padded_bytes_per_row = padded_row_bytes(self.width);

        let staging_buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pixel Readback Buffer"),
            size: (padded_bytes_per_row * self.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        context.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        context.device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?
            .map_err(|e| RenderError::BufferReadFailed(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let pixels = strip_row_padding(
            &data,
            unpadded_bytes_per_row as usize,
            padded_bytes_per_row as usize,
            self.height as usize,
        );
        drop(data);
        staging_buffer.unmap();

        Ok(pixels)
    }
}

/// Bytes per row of a `width`-pixel RGBA copy, rounded up to the copy alignment
fn padded_row_bytes(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * 4).div_ceil(align) * align
}

fn strip_row_padding(data: &[u8], row: usize, padded_row: usize, rows: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(row * rows);
    for r in 0..rows {
        let start = r * padded_row;
        pixels.extend_from_slice(&data[start..start + row]);
    }
    pixels
}
