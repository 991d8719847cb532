//! Particle types: CPU simulation state and GPU vertex data

use bytemuck::{Pod, Zeroable};
use ember_core::Color;

use crate::trig;

/// CPU-side particle state (not sent to GPU)
///
/// A particle has no identity beyond the store slot it occupies. It is alive
/// while `time_to_live > 0`; every other death condition (fully faded,
/// shrunk to nothing) is folded into that field by [`Particle::advance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    /// Pivot as a fraction of sprite size: 0.0 puts the left/upper edge at
    /// (x, y), 1.0 the right/lower edge. Default 0.5.
    pub center_x: f32,
    pub center_y: f32,
    /// Position change per unit time
    pub velocity_x: f32,
    pub velocity_y: f32,
    /// Rotation in trig table units, kept in [0, LOOKUPS_PER_CIRCLE)
    pub angle: f32,
    /// Table units per unit time
    pub angular_velocity: f32,
    pub color: Color,
    /// Alpha lost per unit time, in 1/255 steps
    pub fade: f32,
    pub scale: f32,
    /// Scale gained per unit time
    pub zoom: f32,
    /// Fraction of velocity lost per unit time
    pub friction: f32,
    pub time_to_live: f32,
}

impl Particle {
    /// A fresh particle at (x, y). It has no lifetime yet: give it one with
    /// [`Particle::with_time_to_live`] before emitting.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            center_x: 0.5,
            center_y: 0.5,
            velocity_x: 0.0,
            velocity_y: 0.0,
            angle: 0.0,
            angular_velocity: 0.0,
            color: Color::WHITE,
            fade: 0.0,
            scale: 1.0,
            zoom: 0.0,
            friction: 0.0,
            time_to_live: 0.0,
        }
    }

    pub fn dead() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Liveness flag consumed by the store and packer
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.time_to_live > 0.0
    }

    /// Whether every liveness condition holds
    fn meets_liveness(&self) -> bool {
        self.time_to_live > 0.0 && self.color.a > 0.0 && self.scale > 0.0
    }

    /// Force `time_to_live` to 0 if any liveness condition fails
    pub(crate) fn settle_liveness(&mut self) {
        if !self.meets_liveness() {
            self.time_to_live = 0.0;
        }
    }

    /// Advance by one time step of length `dt`, with `gravity` added to the
    /// vertical velocity per unit time.
    pub fn advance(&mut self, dt: f32, gravity: f32) {
        let drag = 1.0 - self.friction * dt;
        self.velocity_x *= drag;
        self.velocity_y *= drag;

        self.velocity_y += gravity * dt;

        self.x += self.velocity_x * dt;
        self.y += self.velocity_y * dt;

        self.angle = trig::normalize_index(self.angle + self.angular_velocity * dt);

        self.scale += self.zoom * dt;

        self.color.a -= (self.fade / 255.0) * dt;

        self.time_to_live -= dt;

        self.settle_liveness();
    }

    /// Rates expressed per second, stepped in sub-steps of `step` seconds:
    /// every rate is scaled by `step`, while the lifetime (a duration) is
    /// divided by it.
    pub fn with_step(mut self, step: f32) -> Self {
        self.velocity_x *= step;
        self.velocity_y *= step;
        self.angular_velocity *= step;
        self.fade *= step;
        self.zoom *= step;
        self.friction *= step;
        self.time_to_live /= step;
        self
    }

    pub fn with_time_to_live(mut self, time_to_live: f32) -> Self {
        self.time_to_live = time_to_live;
        self
    }

    /// Rotation in screen degrees (clockwise, 0 = up)
    pub fn with_angle_degrees(mut self, degrees: f32) -> Self {
        self.angle = trig::degrees_to_index(degrees);
        self
    }

    /// Rotation in table units
    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = trig::normalize_index(angle);
        self
    }

    /// Spin in screen degrees per unit time, wrapped into one forward turn.
    /// For a backwards spin at fractional time steps use
    /// [`Particle::with_angular_velocity`] with a negative rate.
    pub fn with_angular_velocity_degrees(mut self, degrees: f32) -> Self {
        self.angular_velocity = trig::degrees_to_index(degrees);
        self
    }

    /// Spin in table units per unit time (may be negative)
    pub fn with_angular_velocity(mut self, rate: f32) -> Self {
        self.angular_velocity = rate;
        self
    }

    pub fn with_velocity(mut self, velocity_x: f32, velocity_y: f32) -> Self {
        self.velocity_x = velocity_x;
        self.velocity_y = velocity_y;
        self
    }

    pub fn with_center(mut self, center_x: f32, center_y: f32) -> Self {
        self.center_x = center_x;
        self.center_y = center_y;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_zoom(mut self, zoom: f32) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_fade(mut self, fade: f32) -> Self {
        self.fade = fade;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }
}

impl Default for Particle {
    fn default() -> Self {
        Self::dead()
    }
}

/// GPU vertex data for one of the four corners of a particle quad.
/// 20 bytes, interleaved position / texture coordinates / RGBA8 color.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    pub color: [u8; 4],
}

/// Vertices emitted per particle
pub const VERTICES_PER_PARTICLE: usize = 4;
