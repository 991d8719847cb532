//! Ember Render - wgpu sprite renderer for particle emitters
//!
//! Provides a [`GpuBackend`](ember_particles::GpuBackend) over wgpu, a
//! screen-space sprite pipeline, GPU sprite textures and an offscreen
//! render target with pixel readback.

mod backend;
mod context;
pub mod sprite_pipeline;
mod target;
mod textures;

pub use backend::{WgpuBackend, WgpuBuffer};
pub use context::{GpuContext, RenderError};
pub use sprite_pipeline::{SpritePipeline, TARGET_FORMAT};
pub use target::RenderTarget;
pub use textures::{GpuTexture, SpriteTextures};

#[cfg(test)]
mod tests {
    #[test]
    fn sprite_shader_wgsl_parses() {
        let source = include_str!("sprite_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("sprite_shader.wgsl failed to parse");
    }

    #[test]
    fn sprite_shader_exposes_both_entry_points() {
        let module = naga::front::wgsl::parse_str(include_str!("sprite_shader.wgsl"))
            .expect("sprite_shader.wgsl failed to parse");
        let names: Vec<&str> = module.entry_points.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"vs_sprite"));
        assert!(names.contains(&"fs_sprite"));
    }
}
