//! Scenario files: emitter settings, sprite shape and spawn bursts

use anyhow::{Context, Result};
use ember_core::Color;
use ember_particles::rand::ParticleRng;
use ember_particles::{Emitter, EmitterConfig, GpuBackend, Particle};
use serde::Deserialize;
use std::path::Path;

/// Built-in scenario: a steady aqua fountain plus one spinning marker
pub const DEFAULT_SCENARIO: &str = r#"
frames = 120
dt = 1.0
frame_rate = 60.0
width = 800
height = 600
seed = 1

[emitter]
max_particles = 150000

[sprite]
shape = "arrow"
width = 32
height = 32

[[burst]]
x = 400.0
y = 300.0
count = 1000
color = 0x00FFFF
scale = 0.1
fade = 0.3
speed = 0.16666667
time_to_live = 1000.0

[[burst]]
x = 400.0
y = 300.0
count = 1
frames = 1
fade = 10.0
angular_velocity = 10.0
time_to_live = 300.0
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpriteShape {
    Arrow,
    Disc,
    Square,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    pub shape: SpriteShape,
    pub width: u32,
    pub height: u32,
    /// Image file used instead of the procedural shape (render only)
    pub image: Option<String>,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            shape: SpriteShape::Arrow,
            width: 32,
            height: 32,
            image: None,
        }
    }
}

/// A spawn pattern: `count` particles per frame at one point, with random
/// velocity spread
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Burst {
    pub x: f32,
    pub y: f32,
    pub count: u32,
    /// First frame this burst fires on
    pub start_frame: u32,
    /// Number of frames it fires for; forever when absent
    pub frames: Option<u32>,
    /// RGB as 0xRRGGBB
    pub color: u32,
    pub alpha: f32,
    pub scale: f32,
    pub zoom: f32,
    pub fade: f32,
    pub friction: f32,
    pub time_to_live: f32,
    /// Velocity components are drawn from [-speed, speed)
    pub speed: f32,
    /// Starting angle in degrees
    pub angle: f32,
    pub random_angle: bool,
    /// Degrees per time unit
    pub angular_velocity: f32,
}

impl Default for Burst {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            count: 1,
            start_frame: 0,
            frames: None,
            color: 0xFFFFFF,
            alpha: 1.0,
            scale: 1.0,
            zoom: 0.0,
            fade: 0.0,
            friction: 0.0,
            time_to_live: 100.0,
            speed: 0.0,
            angle: 0.0,
            random_angle: false,
            angular_velocity: 0.0,
        }
    }
}

impl Burst {
    pub fn fires_on(&self, frame: u32) -> bool {
        if frame < self.start_frame {
            return false;
        }
        match self.frames {
            Some(n) => frame - self.start_frame < n,
            None => true,
        }
    }

    /// Build one particle of this burst
    pub fn particle(&self, rng: &mut ParticleRng) -> Particle {
        let mut color = Color::from_hex(self.color);
        color.a = self.alpha;

        let mut particle = Particle::new(self.x, self.y)
            .with_color(color)
            .with_scale(self.scale)
            .with_zoom(self.zoom)
            .with_fade(self.fade)
            .with_friction(self.friction)
            .with_angular_velocity_degrees(self.angular_velocity)
            .with_time_to_live(self.time_to_live);

        if self.speed != 0.0 {
            let vx = rng.range(-self.speed, self.speed);
            let vy = rng.range(-self.speed, self.speed);
            particle = particle.with_velocity(vx, vy);
        }

        if self.random_angle {
            particle.with_angle(rng.angle())
        } else {
            particle.with_angle_degrees(self.angle)
        }
    }

    /// Emit this burst's particles for `frame`, returning how many were emitted
    pub fn spawn<B: GpuBackend>(
        &self,
        frame: u32,
        rng: &mut ParticleRng,
        emitter: &mut Emitter<B>,
    ) -> u32 {
        if !self.fires_on(frame) {
            return 0;
        }
        for _ in 0..self.count {
            emitter.emit(self.particle(rng));
        }
        self.count
    }
}

/// Top-level keys other than `[emitter]`, which goes through
/// [`EmitterConfig::from_toml`]
#[derive(Debug, Deserialize)]
#[serde(default)]
struct ScenarioFile {
    frames: u32,
    dt: f32,
    frame_rate: f64,
    width: u32,
    height: u32,
    seed: u32,
    sprite: SpriteConfig,
    burst: Vec<Burst>,
}

impl Default for ScenarioFile {
    fn default() -> Self {
        Self {
            frames: 60,
            dt: 1.0,
            frame_rate: 60.0,
            width: 800,
            height: 600,
            seed: 1,
            sprite: SpriteConfig::default(),
            burst: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub emitter: EmitterConfig,
    pub sprite: SpriteConfig,
    pub bursts: Vec<Burst>,
    pub frames: u32,
    /// Time passed to each emitter update
    pub dt: f32,
    /// Frames per second when run against the wall clock
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub seed: u32,
}

impl Scenario {
    pub fn parse(source: &str) -> Result<Self> {
        let value: toml::Value = toml::from_str(source).context("Failed to parse scenario")?;
        let emitter = match value.get("emitter").and_then(|v| v.as_table()) {
            Some(table) => EmitterConfig::from_toml(table)?,
            None => EmitterConfig::default(),
        };
        emitter.validate()?;

        let file: ScenarioFile = value.try_into().context("Invalid scenario")?;
        if !(file.dt.is_finite() && file.dt >= 0.0) {
            anyhow::bail!("dt must be a non-negative number, got {}", file.dt);
        }
        if !(file.frame_rate.is_finite() && file.frame_rate > 0.0) {
            anyhow::bail!("frame_rate must be positive, got {}", file.frame_rate);
        }
        if file.width == 0 || file.height == 0 {
            anyhow::bail!("viewport must be non-empty, got {}x{}", file.width, file.height);
        }
        if file.sprite.width == 0 || file.sprite.height == 0 {
            anyhow::bail!(
                "sprite must be non-empty, got {}x{}",
                file.sprite.width,
                file.sprite.height
            );
        }

        Ok(Self {
            emitter,
            sprite: file.sprite,
            bursts: file.burst,
            frames: file.frames,
            dt: file.dt,
            frame_rate: file.frame_rate,
            width: file.width,
            height: file.height,
            seed: file.seed,
        })
    }

    /// Load from `path`, or the built-in scenario when `None`
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let source = std::fs::read_to_string(Path::new(path))
                    .with_context(|| format!("Failed to read scenario '{}'", path))?;
                Self::parse(&source)
            }
            None => Self::parse(DEFAULT_SCENARIO),
        }
    }

    /// Spawn every burst that fires on `frame`
    pub fn spawn<B: GpuBackend>(
        &self,
        frame: u32,
        rng: &mut ParticleRng,
        emitter: &mut Emitter<B>,
    ) -> u32 {
        self.bursts
            .iter()
            .map(|burst| burst.spawn(frame, rng, emitter))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scenario_parses() {
        let scenario = Scenario::parse(DEFAULT_SCENARIO).unwrap();
        assert_eq!(scenario.emitter.max_particles, 150_000);
        assert_eq!(scenario.frames, 120);
        assert_eq!(scenario.bursts.len(), 2);
        assert_eq!(scenario.sprite.shape, SpriteShape::Arrow);

        let fountain = &scenario.bursts[0];
        assert_eq!(fountain.count, 1000);
        assert_eq!(fountain.color, 0x00FFFF);
        assert!((fountain.scale - 0.1).abs() < 1e-6);
        assert!(fountain.frames.is_none());

        let marker = &scenario.bursts[1];
        assert_eq!(marker.frames, Some(1));
        assert!((marker.angular_velocity - 10.0).abs() < 1e-6);
    }

    #[test]
    fn empty_scenario_uses_defaults() {
        let scenario = Scenario::parse("").unwrap();
        assert_eq!(scenario.emitter, EmitterConfig::default());
        assert!(scenario.bursts.is_empty());
        assert_eq!(scenario.width, 800);
    }

    #[test]
    fn invalid_emitter_rejected() {
        assert!(Scenario::parse("[emitter]\nmax_particles = 0\n").is_err());
    }

    #[test]
    fn mistyped_emitter_key_rejected() {
        assert!(Scenario::parse("[emitter]\nmax_particles = 1.5e5\n").is_err());
        assert!(Scenario::parse("[emitter]\nstep = \"fast\"\n").is_err());
    }

    #[test]
    fn negative_dt_rejected() {
        assert!(Scenario::parse("dt = -1.0\n").is_err());
    }

    #[test]
    fn unknown_shape_rejected() {
        assert!(Scenario::parse("[sprite]\nshape = \"hexagon\"\n").is_err());
    }

    #[test]
    fn burst_window() {
        let burst = Burst {
            start_frame: 2,
            frames: Some(3),
            ..Burst::default()
        };
        assert!(!burst.fires_on(1));
        assert!(burst.fires_on(2));
        assert!(burst.fires_on(4));
        assert!(!burst.fires_on(5));

        let forever = Burst::default();
        assert!(forever.fires_on(0));
        assert!(forever.fires_on(1_000_000));
    }

    #[test]
    fn burst_particle_spread_stays_in_range() {
        let burst = Burst {
            x: 10.0,
            y: 20.0,
            speed: 0.5,
            color: 0x00FFFF,
            ..Burst::default()
        };
        let mut rng = ParticleRng::new(9);
        for _ in 0..100 {
            let p = burst.particle(&mut rng);
            assert_eq!((p.x, p.y), (10.0, 20.0));
            assert!((-0.5..0.5).contains(&p.velocity_x));
            assert!((-0.5..0.5).contains(&p.velocity_y));
            assert_eq!(p.color.to_rgba8(), [0, 255, 255, 255]);
            assert!(p.is_alive());
        }
    }

    #[test]
    fn burst_particles_deterministic_per_seed() {
        let burst = Burst {
            speed: 1.0,
            random_angle: true,
            ..Burst::default()
        };
        let mut a = ParticleRng::new(5);
        let mut b = ParticleRng::new(5);
        for _ in 0..10 {
            assert_eq!(burst.particle(&mut a), burst.particle(&mut b));
        }
    }
}
