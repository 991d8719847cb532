//! Sprite lookup: pixel size plus the sprite's region inside its texture

use std::collections::HashMap;

/// Opaque identifier of a backing texture, assigned by the renderer
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct TextureId(pub u32);

/// Bounds of a sprite inside its backing texture, in texture coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureRegion {
    pub texture: TextureId,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextureRegion {
    /// The whole of `texture`
    pub fn full(texture: TextureId) -> Self {
        Self {
            texture,
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        }
    }

    /// Corner coordinates in quad winding order: left-top, right-top,
    /// right-bottom, left-bottom.
    pub fn corners(&self) -> [[f32; 2]; 4] {
        [
            [self.left, self.top],
            [self.right, self.top],
            [self.right, self.bottom],
            [self.left, self.bottom],
        ]
    }
}

/// A drawable sprite: its pixel size and where it lives in a texture
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pub region: TextureRegion,
}

/// Resolves sprite names to sprite descriptions
pub trait TextureProvider {
    fn sprite(&self, name: &str) -> Option<Sprite>;
}

/// Name-keyed sprite table
#[derive(Debug, Default)]
pub struct SpriteAtlas {
    sprites: HashMap<String, Sprite>,
}

impl SpriteAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, sprite: Sprite) {
        self.sprites.insert(name.into(), sprite);
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl TextureProvider for SpriteAtlas {
    fn sprite(&self, name: &str) -> Option<Sprite> {
        self.sprites.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_follow_quad_winding() {
        let region = TextureRegion {
            texture: TextureId(3),
            left: 0.25,
            top: 0.5,
            right: 0.75,
            bottom: 1.0,
        };
        assert_eq!(
            region.corners(),
            [[0.25, 0.5], [0.75, 0.5], [0.75, 1.0], [0.25, 1.0]]
        );
    }

    #[test]
    fn atlas_lookup() {
        let mut atlas = SpriteAtlas::new();
        assert!(atlas.is_empty());
        atlas.insert(
            "spark",
            Sprite {
                width: 16,
                height: 8,
                region: TextureRegion::full(TextureId(1)),
            },
        );
        assert_eq!(atlas.len(), 1);
        let sprite = atlas.sprite("spark").unwrap();
        assert_eq!((sprite.width, sprite.height), (16, 8));
        assert!(atlas.sprite("smoke").is_none());
    }
}
