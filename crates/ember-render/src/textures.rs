//! GPU sprite textures: uploads RGBA images and resolves sprite names

use crate::context::{GpuContext, RenderError};
use crate::sprite_pipeline::SpritePipeline;
use ember_particles::{Sprite, SpriteAtlas, TextureId, TextureProvider, TextureRegion};
use std::collections::HashMap;
use std::path::Path;
use wgpu::util::DeviceExt;

/// A GPU-resident texture with its view, sampler and sprite bind group
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

/// Uploaded textures keyed by [`TextureId`], plus the sprites cut from them
#[derive(Default)]
pub struct SpriteTextures {
    textures: HashMap<TextureId, GpuTexture>,
    atlas: SpriteAtlas,
    next_id: u32,
}

impl SpriteTextures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload tightly-packed RGBA8 pixels and register them as sprite `name`
    pub fn add_rgba(
        &mut self,
        context: &GpuContext,
        pipeline: &SpritePipeline,
        name: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Sprite, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTexture(format!(
                "'{name}' has zero size {width}x{height}"
            )));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::InvalidTexture(format!(
                "'{name}' expected {expected} bytes, got {}",
                pixels.len()
            )));
        }

        let texture = context.device.create_texture_with_data(
            &context.queue,
            &wgpu::TextureDescriptor {
                label: Some(name),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            pixels,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{} Sampler", name)),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &pipeline.texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
            label: Some(&format!("{} Bind Group", name)),
        });

        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(
            id,
            GpuTexture {
                texture,
                view,
                sampler,
                bind_group,
                width,
                height,
            },
        );

        let sprite = Sprite {
            width,
            height,
            region: TextureRegion::full(id),
        };
        self.atlas.insert(name, sprite);
        log::debug!("uploaded sprite '{name}' ({width}x{height}) as texture {}", id.0);
        Ok(sprite)
    }

    /// Load an image file from disk and register it as sprite `name`
    pub fn load_file(
        &mut self,
        context: &GpuContext,
        pipeline: &SpritePipeline,
        name: &str,
        path: &Path,
    ) -> Result<Sprite, RenderError> {
        let img = image::open(path).map_err(|e| {
            RenderError::InvalidTexture(format!("failed to open '{}': {}", path.display(), e))
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        self.add_rgba(context, pipeline, name, width, height, &rgba)
    }

    /// Register sprite `name` as a pixel rectangle of an uploaded texture
    pub fn add_region(
        &mut self,
        name: &str,
        texture: TextureId,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<Sprite, RenderError> {
        let gpu = self.textures.get(&texture).ok_or_else(|| {
            RenderError::InvalidTexture(format!("no texture with id {}", texture.0))
        })?;
        let sprite = region_sprite(texture, gpu.width, gpu.height, x, y, width, height)
            .ok_or_else(|| {
                RenderError::InvalidTexture(format!(
                    "region {x},{y} {width}x{height} outside {}x{} texture",
                    gpu.width, gpu.height
                ))
            })?;
        self.atlas.insert(name, sprite);
        Ok(sprite)
    }

    pub fn get(&self, texture: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&texture)
    }

    pub fn bind_group(&self, texture: TextureId) -> Option<&wgpu::BindGroup> {
        self.textures.get(&texture).map(|t| &t.bind_group)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureProvider for SpriteTextures {
    fn sprite(&self, name: &str) -> Option<Sprite> {
        self.atlas.sprite(name)
    }
}

/// Sprite for a pixel rectangle of a `texture_width` x `texture_height`
/// texture, or `None` if the rectangle is empty or out of bounds.
fn region_sprite(
    texture: TextureId,
    texture_width: u32,
    texture_height: u32,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> Option<Sprite> {
    if width == 0 || height == 0 {
        return None;
    }
    let right = x.checked_add(width)?;
    let bottom = y.checked_add(height)?;
    if right > texture_width || bottom > texture_height {
        return None;
    }
    let tw = texture_width as f32;
    let th = texture_height as f32;
    Some(Sprite {
        width,
        height,
        region: TextureRegion {
            texture,
            left: x as f32 / tw,
            top: y as f32 / th,
            right: right as f32 / tw,
            bottom: bottom as f32 / th,
        },
    })
}
