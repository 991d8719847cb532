//! Emitter configuration (parsed from TOML) and the emitter itself

use ember_core::{EmberError, Result};

use crate::backend::{DrawCall, GpuBackend, PrimitiveKind};
use crate::packer::QuadPacker;
use crate::particle::{Particle, SpriteVertex, VERTICES_PER_PARTICLE};
use crate::store::ParticleStore;
use crate::texture::{Sprite, TextureId, TextureProvider};
use crate::trig;

/// Upper bound on `max_particles` accepted from configuration
pub const MAX_PARTICLES_LIMIT: usize = 1 << 20;

/// Configuration for one emitter, usually parsed from a TOML table
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    /// Ring buffer capacity
    pub max_particles: usize,
    /// Added to every particle's vertical velocity per unit time
    pub gravity: f32,
    /// Fixed sub-step length. When set, emitted particles' rates are scaled
    /// by it and their lifetime divided by it.
    pub step: Option<f32>,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_particles: 1024,
            gravity: 0.0,
            step: None,
        }
    }
}

impl EmitterConfig {
    /// Parse an EmitterConfig from a TOML table. Keys of the wrong type are
    /// rejected; integers are accepted where a float is expected.
    pub fn from_toml(table: &toml::value::Table) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = table.get("max_particles") {
            config.max_particles = v
                .as_integer()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| {
                    EmberError::InvalidConfig(format!(
                        "max_particles must be a non-negative integer, got {v}"
                    ))
                })?;
        }
        if let Some(v) = table.get("gravity") {
            config.gravity = toml_f32("gravity", v)?;
        }
        if let Some(v) = table.get("step") {
            config.step = Some(toml_f32("step", v)?);
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_particles == 0 || self.max_particles > MAX_PARTICLES_LIMIT {
            return Err(EmberError::InvalidConfig(format!(
                "max_particles must be between 1 and {MAX_PARTICLES_LIMIT}, got {}",
                self.max_particles
            )));
        }
        if !self.gravity.is_finite() {
            return Err(EmberError::InvalidConfig(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        if let Some(step) = self.step {
            if !(step.is_finite() && step > 0.0) {
                return Err(EmberError::InvalidConfig(format!(
                    "step must be a positive number, got {step}"
                )));
            }
        }
        Ok(())
    }
}

/// A sprite particle emitter bound to one GPU buffer.
///
/// Per frame: any number of [`Emitter::emit`] calls, then one
/// [`Emitter::update`] (ages, packs and uploads), then [`Emitter::draw`].
/// The GPU buffer is allocated in [`Emitter::new`] and released on drop.
pub struct Emitter<B: GpuBackend> {
    backend: B,
    /// Always `Some` until drop
    buffer: Option<B::Buffer>,
    texture: TextureId,
    store: ParticleStore,
    packer: QuadPacker,
    gravity: f32,
    step: Option<f32>,
    evictions: u64,
}

impl<B: GpuBackend> Emitter<B> {
    /// Create an emitter drawing the sprite `sprite_name` from `textures`
    pub fn new(
        backend: B,
        textures: &impl TextureProvider,
        sprite_name: &str,
        config: EmitterConfig,
    ) -> Result<Self> {
        let sprite = textures
            .sprite(sprite_name)
            .ok_or_else(|| EmberError::SpriteNotFound(sprite_name.to_string()))?;
        Self::with_sprite(backend, sprite, config)
    }

    /// Create an emitter drawing `sprite`
    pub fn with_sprite(mut backend: B, sprite: Sprite, config: EmitterConfig) -> Result<Self> {
        config.validate()?;
        trig::init();

        if !backend.supports_vertex_streaming() {
            return Err(EmberError::CapabilityMissing(
                "streaming vertex buffers".to_string(),
            ));
        }

        let capacity = config.max_particles;
        let requested =
            (capacity * VERTICES_PER_PARTICLE * std::mem::size_of::<SpriteVertex>()) as u64;
        let buffer = backend.allocate(requested)?;
        let actual = backend.buffer_size(&buffer);
        if actual != requested {
            backend.release(buffer);
            return Err(EmberError::BufferSizeMismatch { requested, actual });
        }
        log::debug!("emitter allocated {requested}-byte vertex buffer for {capacity} particles");

        Ok(Self {
            backend,
            buffer: Some(buffer),
            texture: sprite.region.texture,
            store: ParticleStore::new(capacity),
            packer: QuadPacker::new(capacity, &sprite),
            gravity: config.gravity,
            step: config.step,
            evictions: 0,
        })
    }

    /// Add a particle, evicting the oldest one if the emitter is full
    pub fn emit(&mut self, particle: Particle) -> bool {
        let particle = match self.step {
            Some(step) => particle.with_step(step),
            None => particle,
        };
        let evicted = self.store.emit(particle);
        if evicted {
            self.evictions += 1;
        }
        evicted
    }

    /// Age every particle by `dt`, then pack and upload the live ones.
    /// A negative or NaN `dt` is rejected before anything changes.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        if dt.is_nan() || dt < 0.0 {
            return Err(EmberError::NegativeTimeStep(dt));
        }

        self.store.update_all(dt, self.gravity);

        if self.store.live_count() > 0 {
            self.packer.pack(&self.store);
            if let Some(buffer) = &self.buffer {
                self.backend.upload(buffer, 0, self.packer.packed_bytes());
            }
        }
        Ok(())
    }

    /// Draw every live particle in one call. Does nothing when empty.
    pub fn draw(&mut self) {
        let count = self.store.live_count();
        if count == 0 {
            return;
        }
        if let Some(buffer) = &self.buffer {
            self.backend.draw(
                buffer,
                DrawCall {
                    texture: self.texture,
                    primitive: PrimitiveKind::Quads,
                    vertex_count: (count * VERTICES_PER_PARTICLE) as u32,
                },
            );
        }
    }

    pub fn live_count(&self) -> usize {
        self.store.live_count()
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Live particles eldest first, as of the last emit/update
    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.store.iter()
    }

    /// Vertices packed by the last update
    pub fn packed_vertices(&self) -> &[SpriteVertex] {
        self.packer.vertices()
    }

    /// Live particles overwritten by emits since creation
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Kill every particle. The GPU buffer is kept.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: GpuBackend> Drop for Emitter<B> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.backend.release(buffer);
            log::debug!("emitter released its vertex buffer");
        }
    }
}

// ── TOML helpers (handle integer/float coercion) ──

fn toml_f32(key: &str, v: &toml::Value) -> Result<f32> {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .ok_or_else(|| EmberError::InvalidConfig(format!("{key} must be a number, got {v}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BackendCall, MemoryBackend};
    use crate::texture::{SpriteAtlas, TextureRegion};

    const STRIDE: u64 = 20;

    fn sprite() -> Sprite {
        Sprite {
            width: 4,
            height: 4,
            region: TextureRegion::full(TextureId(7)),
        }
    }

    fn emitter(capacity: usize, backend: &MemoryBackend) -> Emitter<MemoryBackend> {
        let config = EmitterConfig {
            max_particles: capacity,
            ..Default::default()
        };
        Emitter::with_sprite(backend.clone(), sprite(), config).unwrap()
    }

    fn tagged(tag: f32) -> Particle {
        Particle::new(tag, 0.0).with_time_to_live(100.0)
    }

    #[test]
    fn default_config_is_sane() {
        let config = EmitterConfig::default();
        assert!(config.max_particles > 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_from_toml() {
        let toml_str = r#"
max_particles = 150000
gravity = 0.5
step = 0.25
"#;
        let table: toml::value::Table = toml::from_str(toml_str).unwrap();
        let config = EmitterConfig::from_toml(&table).unwrap();
        assert_eq!(config.max_particles, 150_000);
        assert!((config.gravity - 0.5).abs() < 0.01);
        assert_eq!(config.step, Some(0.25));
    }

    #[test]
    fn toml_integer_float_coercion() {
        let table: toml::value::Table = toml::from_str("gravity = -10\nstep = 2").unwrap();
        let config = EmitterConfig::from_toml(&table).unwrap();
        assert!((config.gravity - (-10.0)).abs() < 0.01);
        assert_eq!(config.step, Some(2.0));
    }

    #[test]
    fn toml_wrong_types_are_rejected() {
        for source in [
            "max_particles = 1.5e5",
            "max_particles = -3",
            "max_particles = \"many\"",
            "step = \"fast\"",
            "gravity = true",
        ] {
            let table: toml::value::Table = toml::from_str(source).unwrap();
            match EmitterConfig::from_toml(&table) {
                Err(EmberError::InvalidConfig(_)) => {}
                other => panic!("{source}: expected InvalidConfig, got {other:?}"),
            }
        }
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero = EmitterConfig {
            max_particles: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(EmberError::InvalidConfig(_))));

        let bad_step = EmitterConfig {
            step: Some(0.0),
            ..Default::default()
        };
        assert!(bad_step.validate().is_err());

        let backend = MemoryBackend::new();
        assert!(Emitter::with_sprite(backend.clone(), sprite(), zero).is_err());
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn allocates_full_capacity_and_releases_once() {
        let backend = MemoryBackend::new().with_call_log();
        {
            let e = emitter(10, &backend);
            assert_eq!(e.capacity(), 10);
            assert_eq!(backend.live_buffers(), 1);
        }
        assert_eq!(backend.release_count(), 1);
        assert_eq!(backend.live_buffers(), 0);
        let calls = backend.calls();
        assert_eq!(
            calls.first(),
            Some(&BackendCall::Allocate {
                buffer: 0,
                size: 10 * 4 * STRIDE
            })
        );
        assert_eq!(calls.last(), Some(&BackendCall::Release { buffer: 0 }));
    }

    #[test]
    fn missing_capability_is_fatal() {
        let backend = MemoryBackend::new().without_vertex_streaming();
        let result = Emitter::with_sprite(backend.clone(), sprite(), EmitterConfig::default());
        assert!(matches!(result, Err(EmberError::CapabilityMissing(_))));
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn size_mismatch_is_fatal_and_frees_buffer() {
        let backend = MemoryBackend::new().with_allocation_shortfall(4);
        let result = Emitter::with_sprite(backend.clone(), sprite(), EmitterConfig::default());
        match result {
            Err(EmberError::BufferSizeMismatch { requested, actual }) => {
                assert_eq!(requested - actual, 4);
            }
            _ => panic!("expected BufferSizeMismatch"),
        }
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.release_count(), 1);
    }

    #[test]
    fn unknown_sprite_is_reported() {
        let atlas = SpriteAtlas::new();
        let result = Emitter::new(MemoryBackend::new(), &atlas, "spark", EmitterConfig::default());
        assert!(matches!(result, Err(EmberError::SpriteNotFound(name)) if name == "spark"));
    }

    #[test]
    fn sprite_resolved_through_provider() {
        let mut atlas = SpriteAtlas::new();
        atlas.insert("spark", sprite());
        let backend = MemoryBackend::new();
        let mut e = Emitter::new(backend.clone(), &atlas, "spark", EmitterConfig::default()).unwrap();
        e.emit(tagged(1.0));
        e.update(1.0).unwrap();
        e.draw();
        assert_eq!(backend.last_draw().map(|d| d.texture), Some(TextureId(7)));
    }

    #[test]
    fn capacity_evicts_two_oldest_of_six() {
        let backend = MemoryBackend::new();
        let mut e = emitter(4, &backend);
        for tag in 1..=6 {
            e.emit(tagged(tag as f32));
            assert!(e.live_count() <= 4);
        }
        assert_eq!(e.live_count(), 4);
        assert_eq!(e.evictions(), 2);
        let tags: Vec<f32> = e.particles().map(|p| p.x).collect();
        assert_eq!(tags, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn live_count_drops_on_the_frame_of_death() {
        let backend = MemoryBackend::new();
        let mut e = emitter(4, &backend);
        e.emit(Particle::new(0.0, 0.0).with_time_to_live(1.0));
        e.emit(tagged(1.0));
        assert_eq!(e.live_count(), 2);
        e.update(1.0).unwrap();
        assert_eq!(e.live_count(), 1);
    }

    #[test]
    fn negative_dt_is_rejected_without_mutation() {
        let backend = MemoryBackend::new();
        let mut e = emitter(4, &backend);
        e.emit(tagged(1.0).with_velocity(1.0, 1.0));
        let before: Vec<Particle> = e.particles().copied().collect();

        assert!(matches!(e.update(-1.0), Err(EmberError::NegativeTimeStep(_))));
        assert!(e.update(f32::NAN).is_err());

        let after: Vec<Particle> = e.particles().copied().collect();
        assert_eq!(before, after);
        assert_eq!(e.live_count(), 1);
        assert_eq!(backend.upload_count(), 0);
    }

    #[test]
    fn zero_dt_leaves_particles_unchanged() {
        let backend = MemoryBackend::new();
        let mut e = emitter(4, &backend);
        e.emit(
            tagged(1.0)
                .with_velocity(2.0, 3.0)
                .with_angular_velocity(5.0)
                .with_zoom(0.1)
                .with_fade(4.0),
        );
        let before: Vec<Particle> = e.particles().copied().collect();
        e.update(0.0).unwrap();
        let after: Vec<Particle> = e.particles().copied().collect();
        assert_eq!(before, after);
        assert_eq!(e.live_count(), 1);
    }

    #[test]
    fn update_uploads_only_live_prefix_once() {
        let backend = MemoryBackend::new().with_call_log();
        let mut e = emitter(16, &backend);
        e.emit(tagged(1.0));
        e.emit(tagged(2.0));
        e.emit(tagged(3.0));
        e.update(0.5).unwrap();

        assert_eq!(backend.upload_count(), 1);
        assert_eq!(backend.bytes_uploaded(), 3 * 4 * STRIDE);
        assert!(backend.calls().contains(&BackendCall::Upload {
            buffer: 0,
            offset: 0,
            len: (3 * 4 * STRIDE) as usize,
        }));

        let uploaded = backend.read_vertices(0, 12);
        assert_eq!(uploaded, e.packed_vertices());
    }

    #[test]
    fn empty_update_and_draw_touch_nothing() {
        let backend = MemoryBackend::new();
        let mut e = emitter(4, &backend);
        e.update(1.0).unwrap();
        e.draw();
        assert_eq!(backend.upload_count(), 0);
        assert_eq!(backend.draw_count(), 0);
    }

    #[test]
    fn draw_covers_four_vertices_per_particle() {
        let backend = MemoryBackend::new();
        let mut e = emitter(8, &backend);
        for tag in 0..5 {
            e.emit(tagged(tag as f32));
        }
        e.update(1.0).unwrap();
        e.draw();
        assert_eq!(backend.draw_count(), 1);
        assert_eq!(
            backend.last_draw(),
            Some(DrawCall {
                texture: TextureId(7),
                primitive: PrimitiveKind::Quads,
                vertex_count: 20,
            })
        );
    }

    #[test]
    fn uploaded_order_survives_wraparound() {
        let backend = MemoryBackend::new();
        let mut e = emitter(3, &backend);
        for tag in 1..=3 {
            e.emit(tagged(tag as f32 * 10.0));
        }
        e.update(0.0).unwrap();
        e.emit(tagged(40.0));
        e.update(0.0).unwrap();

        let pivots: Vec<f32> = backend
            .read_vertices(0, 12)
            .chunks_exact(4)
            .map(|quad| (quad[0].position[0] + quad[1].position[0]) / 2.0)
            .collect();
        assert_eq!(pivots, vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn fixed_step_scales_emitted_particles() {
        let config = EmitterConfig {
            max_particles: 2,
            step: Some(0.5),
            ..Default::default()
        };
        let mut e = Emitter::with_sprite(MemoryBackend::new(), sprite(), config).unwrap();
        e.emit(Particle::new(0.0, 0.0).with_time_to_live(3.0).with_velocity(4.0, 0.0));
        let p = e.particles().next().copied().unwrap();
        assert_eq!(p.time_to_live, 6.0);
        assert_eq!(p.velocity_x, 2.0);
    }

    #[test]
    fn gravity_applies_to_every_particle() {
        let config = EmitterConfig {
            max_particles: 2,
            gravity: 2.0,
            ..Default::default()
        };
        let mut e = Emitter::with_sprite(MemoryBackend::new(), sprite(), config).unwrap();
        e.emit(tagged(0.0));
        e.update(1.0).unwrap();
        let p = e.particles().next().copied().unwrap();
        assert_eq!(p.velocity_y, 2.0);
        assert_eq!(p.y, 2.0);
    }

    #[test]
    fn clear_empties_but_keeps_buffer() {
        let backend = MemoryBackend::new();
        let mut e = emitter(4, &backend);
        e.emit(tagged(1.0));
        e.clear();
        assert_eq!(e.live_count(), 0);
        assert_eq!(backend.live_buffers(), 1);
    }
}
