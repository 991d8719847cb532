//! Ember Particles - fixed-capacity sprite particle simulation
//!
//! Provides one-buffer-per-emitter particle simulation with:
//! - Lookup-table rotation (tenths of a degree, exact at cardinals)
//! - Ring-buffer particle store with oldest-first recycling
//! - Emission-ordered quad packing into a preallocated vertex stream
//! - Backend-agnostic GPU buffer interface plus an in-memory backend

pub mod backend;
pub mod emitter;
pub mod memory;
pub mod packer;
pub mod particle;
pub mod rand;
pub mod store;
pub mod texture;
pub mod trig;

pub use backend::{DrawCall, GpuBackend, PrimitiveKind};
pub use emitter::{Emitter, EmitterConfig};
pub use memory::{BackendCall, MemoryBackend, MemoryBuffer};
pub use packer::{quad_corners, QuadPacker};
pub use particle::{Particle, SpriteVertex, VERTICES_PER_PARTICLE};
pub use store::ParticleStore;
pub use texture::{Sprite, SpriteAtlas, TextureId, TextureProvider, TextureRegion};
