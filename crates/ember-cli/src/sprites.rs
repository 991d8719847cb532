//! Procedural sprite images
//!
//! Sprites are white with an alpha mask so particle colors tint them.
//! The arrow points up, which is angle 0.

use crate::scenario::SpriteShape;

/// RGBA8 pixels for `shape` at `width` x `height`
pub fn rasterize(shape: SpriteShape, width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            // Sample at pixel centers in [0, 1]
            let u = (x as f32 + 0.5) / width as f32;
            let v = (y as f32 + 0.5) / height as f32;
            let alpha = if covers(shape, u, v) { 255 } else { 0 };
            pixels.extend_from_slice(&[255, 255, 255, alpha]);
        }
    }
    pixels
}

fn covers(shape: SpriteShape, u: f32, v: f32) -> bool {
    match shape {
        SpriteShape::Square => true,
        SpriteShape::Disc => {
            let dx = u - 0.5;
            let dy = v - 0.5;
            dx * dx + dy * dy <= 0.25
        }
        SpriteShape::Arrow => {
            let dx = (u - 0.5).abs();
            if v < 0.5 {
                // Head: widens from the tip to the full width
                dx <= v
            } else {
                // Shaft
                dx <= 0.125
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_at(pixels: &[u8], width: u32, x: u32, y: u32) -> u8 {
        pixels[((y * width + x) * 4 + 3) as usize]
    }

    #[test]
    fn rasterized_size() {
        assert_eq!(rasterize(SpriteShape::Disc, 8, 4).len(), 8 * 4 * 4);
    }

    #[test]
    fn square_is_opaque() {
        let pixels = rasterize(SpriteShape::Square, 4, 4);
        assert!(pixels.chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
    }

    #[test]
    fn disc_corners_transparent() {
        let pixels = rasterize(SpriteShape::Disc, 16, 16);
        assert_eq!(alpha_at(&pixels, 16, 0, 0), 0);
        assert_eq!(alpha_at(&pixels, 16, 15, 15), 0);
        assert_eq!(alpha_at(&pixels, 16, 8, 8), 255);
    }

    #[test]
    fn arrow_points_up() {
        let pixels = rasterize(SpriteShape::Arrow, 32, 32);
        // Narrow near the tip, wide across the base of the head
        assert_eq!(alpha_at(&pixels, 32, 2, 1), 0);
        assert_eq!(alpha_at(&pixels, 32, 16, 1), 255);
        assert_eq!(alpha_at(&pixels, 32, 2, 14), 255);
        // Shaft is centered
        assert_eq!(alpha_at(&pixels, 32, 2, 28), 0);
        assert_eq!(alpha_at(&pixels, 32, 16, 28), 255);
    }
}
