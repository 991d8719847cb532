//! Packs live particles into the interleaved quad vertex stream
//!
//! The staging array is sized for the whole store once, at construction.
//! Packing only overwrites a prefix of it, so the per-frame path never
//! allocates.

use crate::particle::{Particle, SpriteVertex, VERTICES_PER_PARTICLE};
use crate::store::ParticleStore;
use crate::texture::Sprite;
use crate::trig;

/// Corner positions of a particle's rotated, pivot-offset quad, in winding
/// order left-top, right-top, right-bottom, left-bottom.
pub fn quad_corners(particle: &Particle, width: f32, height: f32) -> [[f32; 2]; 4] {
    let size_x = width * particle.scale;
    let size_y = height * particle.scale;

    let index = trig::index_of(particle.angle);
    // Unit offset of "up" for this rotation.
    let offs_x = trig::lookup_sin(index);
    let offs_y = -trig::lookup_cos(index);

    let cx = particle.center_x;
    let cy = particle.center_y;

    let to_left = [offs_y * size_x * cx, -offs_x * size_x * cx];
    let to_right = [-offs_y * size_x * (1.0 - cx), offs_x * size_x * (1.0 - cx)];
    let to_top = [offs_x * size_y * cy, offs_y * size_y * cy];
    let to_bottom = [-offs_x * size_y * (1.0 - cy), -offs_y * size_y * (1.0 - cy)];

    let corner = |h: [f32; 2], v: [f32; 2]| [particle.x + h[0] + v[0], particle.y + h[1] + v[1]];

    [
        corner(to_left, to_top),
        corner(to_right, to_top),
        corner(to_right, to_bottom),
        corner(to_left, to_bottom),
    ]
}

/// Staging vertex stream for one emitter
pub struct QuadPacker {
    vertices: Vec<SpriteVertex>,
    width: f32,
    height: f32,
    packed: usize,
}

impl QuadPacker {
    pub fn new(capacity: usize, sprite: &Sprite) -> Self {
        let tex_coords = sprite.region.corners();
        let mut vertices = vec![SpriteVertex::default(); capacity * VERTICES_PER_PARTICLE];
        // Texture coordinates are the same for every quad; prefill them all.
        for (vertex, uv) in vertices.iter_mut().zip(tex_coords.iter().cycle()) {
            vertex.tex_coords = *uv;
        }
        Self {
            vertices,
            width: sprite.width as f32,
            height: sprite.height as f32,
            packed: 0,
        }
    }

    /// Rewrite the staging stream from `store`, oldest particle first.
    /// Returns the number of quads written.
    pub fn pack(&mut self, store: &ParticleStore) -> usize {
        let (older, newer) = store.segments();
        let written = self.write_quads(0, older);
        let total = written + self.write_quads(written, newer);
        debug_assert_eq!(total, store.live_count());
        self.packed = total;
        total
    }

    /// Write the live particles of `particles` as consecutive quads starting
    /// at quad `first_quad`. Returns the number of quads written.
    /// Texture coordinates are left as prefilled.
    fn write_quads(&mut self, first_quad: usize, particles: &[Particle]) -> usize {
        let mut quad = first_quad;
        for particle in particles.iter().filter(|p| p.is_alive()) {
            let corners = quad_corners(particle, self.width, self.height);
            let color = particle.color.to_rgba8();
            let start = quad * VERTICES_PER_PARTICLE;
            let quad_vertices = &mut self.vertices[start..start + VERTICES_PER_PARTICLE];
            for (vertex, position) in quad_vertices.iter_mut().zip(corners) {
                vertex.position = position;
                vertex.color = color;
            }
            quad += 1;
        }
        quad - first_quad
    }

    /// Quads written by the last [`QuadPacker::pack`]
    pub fn packed_quads(&self) -> usize {
        self.packed
    }

    /// The packed prefix of the staging stream
    pub fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices[..self.packed * VERTICES_PER_PARTICLE]
    }

    /// Bytes of the packed prefix, ready for upload
    pub fn packed_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.vertices())
    }

    /// Bytes of the whole staging stream
    pub fn staging_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{TextureId, TextureRegion};
    use ember_core::Color;

    fn sprite(width: u32, height: u32) -> Sprite {
        Sprite {
            width,
            height,
            region: TextureRegion {
                texture: TextureId(1),
                left: 0.0,
                top: 0.0,
                right: 0.5,
                bottom: 0.25,
            },
        }
    }

    fn tagged(tag: f32) -> Particle {
        Particle::new(tag * 100.0, 0.0).with_time_to_live(100.0)
    }

    /// x position of each packed quad's pivot, as a particle tag
    fn packed_tags(packer: &QuadPacker) -> Vec<f32> {
        packer
            .vertices()
            .chunks_exact(VERTICES_PER_PARTICLE)
            .map(|quad| ((quad[0].position[0] + quad[1].position[0]) / 2.0 / 100.0).round())
            .collect()
    }

    #[test]
    fn upright_quad_with_corner_pivot() {
        let p = Particle::new(10.0, 20.0).with_center(0.0, 0.0);
        let corners = quad_corners(&p, 8.0, 4.0);
        assert_eq!(corners, [[10.0, 20.0], [18.0, 20.0], [18.0, 24.0], [10.0, 24.0]]);
    }

    #[test]
    fn centered_quad_scales_around_pivot() {
        let p = Particle::new(0.0, 0.0).with_scale(2.0);
        let corners = quad_corners(&p, 4.0, 2.0);
        assert_eq!(corners, [[-4.0, -2.0], [4.0, -2.0], [4.0, 2.0], [-4.0, 2.0]]);
    }

    #[test]
    fn quarter_turn_rotates_clockwise() {
        let p = Particle::new(0.0, 0.0).with_angle_degrees(90.0);
        let corners = quad_corners(&p, 4.0, 2.0);
        // The sprite's top now faces +x, its left edge faces -y.
        assert_eq!(corners, [[1.0, -2.0], [1.0, 2.0], [-1.0, 2.0], [-1.0, -2.0]]);
    }

    #[test]
    fn pack_preserves_emission_order() {
        let mut store = ParticleStore::new(5);
        for tag in 1..=5 {
            store.emit(tagged(tag as f32));
        }
        let mut packer = QuadPacker::new(5, &sprite(2, 2));
        assert_eq!(packer.pack(&store), 5);
        assert_eq!(packed_tags(&packer), vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        // One wraparound: tag 1 evicted, tag 6 newest.
        store.emit(tagged(6.0));
        packer.pack(&store);
        assert_eq!(packed_tags(&packer), vec![2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn pack_skips_dead_slots_without_gaps() {
        let mut store = ParticleStore::new(4);
        store.emit(tagged(1.0));
        store.emit(Particle::new(200.0, 0.0).with_time_to_live(0.5));
        store.emit(tagged(3.0));
        store.emit(tagged(4.0));
        store.emit(tagged(5.0)); // evicts 1, cursor now at slot 1
        store.update_all(1.0, 0.0); // kills 2

        let mut packer = QuadPacker::new(4, &sprite(2, 2));
        assert_eq!(packer.pack(&store), 3);
        assert_eq!(packed_tags(&packer), vec![3.0, 4.0, 5.0]);
        assert_eq!(packer.vertices().len(), 12);
    }

    #[test]
    fn every_corner_carries_color_and_region() {
        let mut store = ParticleStore::new(2);
        store.emit(tagged(1.0).with_color(Color::new(1.0, 0.0, 0.0, 0.5)));
        let mut packer = QuadPacker::new(2, &sprite(2, 2));
        packer.pack(&store);

        let quad = packer.vertices();
        for vertex in quad {
            assert_eq!(vertex.color, [255, 0, 0, 127]);
        }
        let uvs: Vec<[f32; 2]> = quad.iter().map(|v| v.tex_coords).collect();
        assert_eq!(uvs, vec![[0.0, 0.0], [0.5, 0.0], [0.5, 0.25], [0.0, 0.25]]);
    }

    #[test]
    fn region_survives_repacking() {
        let mut store = ParticleStore::new(3);
        let mut packer = QuadPacker::new(3, &sprite(2, 2));
        for tag in 1..=5 {
            store.emit(tagged(tag as f32));
            packer.pack(&store);
        }
        store.update_all(150.0, 0.0);
        packer.pack(&store);
        store.emit(tagged(6.0));
        assert_eq!(packer.pack(&store), 1);

        let staged: &[SpriteVertex] = bytemuck::cast_slice(packer.staging_bytes());
        for quad in staged.chunks_exact(VERTICES_PER_PARTICLE) {
            let uvs: Vec<[f32; 2]> = quad.iter().map(|v| v.tex_coords).collect();
            assert_eq!(uvs, vec![[0.0, 0.0], [0.5, 0.0], [0.5, 0.25], [0.0, 0.25]]);
        }
    }

    #[test]
    fn packed_bytes_cover_only_live_quads() {
        let mut store = ParticleStore::new(8);
        store.emit(tagged(1.0));
        store.emit(tagged(2.0));
        let mut packer = QuadPacker::new(8, &sprite(2, 2));
        packer.pack(&store);
        assert_eq!(packer.packed_bytes().len(), 2 * 4 * 20);
        assert_eq!(packer.staging_bytes().len(), 8 * 4 * 20);
    }
}
