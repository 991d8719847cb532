//! Headless scenario-to-PNG render command

use crate::scenario::Scenario;
use crate::sprites;
use anyhow::{Context, Result};
use ember_particles::{Emitter, GpuBackend, TextureProvider};
use ember_render::{GpuContext, RenderTarget, SpritePipeline, SpriteTextures, WgpuBackend, TARGET_FORMAT};
use std::path::Path;
use std::sync::Arc;

use super::simulate::{simulate, SimulationReport};

const SPRITE_NAME: &str = "particle";

pub struct RenderArgs {
    pub scenario: Option<String>,
    pub output: String,
    pub frames: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Background as 0xRRGGBB
    pub background: u32,
}

pub fn run(args: RenderArgs) -> Result<()> {
    let mut scenario = Scenario::load(args.scenario.as_deref())?;
    if let Some(frames) = args.frames {
        scenario.frames = frames;
    }
    let (width, height) = viewport_size(args.width, args.height, &scenario)?;

    let context = Arc::new(
        pollster::block_on(GpuContext::headless()).context("Failed to create GPU context")?,
    );
    let pipeline = SpritePipeline::new(&context.device, TARGET_FORMAT);
    pipeline.set_viewport(&context.queue, width, height);

    let mut textures = SpriteTextures::new();
    match &scenario.sprite.image {
        Some(image) => {
            textures
                .load_file(&context, &pipeline, SPRITE_NAME, Path::new(image))
                .context("Failed to load sprite image")?;
        }
        None => {
            let pixels = sprites::rasterize(
                scenario.sprite.shape,
                scenario.sprite.width,
                scenario.sprite.height,
            );
            textures.add_rgba(
                &context,
                &pipeline,
                SPRITE_NAME,
                scenario.sprite.width,
                scenario.sprite.height,
                &pixels,
            )?;
        }
    }
    if textures.sprite(SPRITE_NAME).is_none() {
        anyhow::bail!("Sprite '{}' was not registered", SPRITE_NAME);
    }

    let backend = WgpuBackend::new(Arc::clone(&context));
    let mut emitter = Emitter::new(backend, &textures, SPRITE_NAME, scenario.emitter.clone())
        .context("Failed to create emitter")?;

    let target = RenderTarget::new(&context, width, height);
    let report = run_frames(&scenario, &mut emitter, |_, backend: &mut WgpuBackend| {
        backend.skip_frame()
    })?;

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Sprite Encoder"),
        });
    emitter.backend_mut().encode(
        &mut encoder,
        &target.color_view,
        &pipeline,
        &textures,
        Some(background_color(args.background)),
    );
    context.queue.submit(std::iter::once(encoder.finish()));

    let pixels =
        pollster::block_on(target.read_pixels(&context)).context("Failed to read pixels")?;
    let img = image::RgbaImage::from_raw(width, height, pixels)
        .context("Failed to create image from pixel data")?;
    img.save(&args.output)
        .with_context(|| format!("Failed to save image to '{}'", args.output))?;

    println!(
        "Rendered {} live particles after {} frames to {} ({}x{})",
        report.final_live, report.frames, args.output, width, height
    );
    Ok(())
}

/// Image size from the command line, falling back to the scenario's
fn viewport_size(
    width: Option<u32>,
    height: Option<u32>,
    scenario: &Scenario,
) -> Result<(u32, u32)> {
    let width = width.unwrap_or(scenario.width);
    let height = height.unwrap_or(scenario.height);
    if width == 0 || height == 0 {
        anyhow::bail!("viewport must be non-empty, got {}x{}", width, height);
    }
    Ok((width, height))
}

/// Simulate every frame; all but the last are handed to `skip` once drawn.
fn run_frames<B, F>(
    scenario: &Scenario,
    emitter: &mut Emitter<B>,
    mut skip: F,
) -> Result<SimulationReport>
where
    B: GpuBackend,
    F: FnMut(u32, &mut B),
{
    let last_frame = scenario.frames.saturating_sub(1);
    simulate(scenario, emitter, false, |frame, emitter, _| {
        if frame < last_frame {
            skip(frame, emitter.backend_mut());
        }
    })
}

/// Linear clear color for an sRGB 0xRRGGBB value
fn background_color(hex: u32) -> wgpu::Color {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xFF) as f64 / 255.0);
    wgpu::Color {
        r: channel(16),
        g: channel(8),
        b: channel(0),
        a: 1.0,
    }
}

fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
