//! Lookup-table sine/cosine indexed in tenths of a degree
//!
//! Angles are screen-oriented: index 0 points up, indices grow clockwise on a
//! y-down screen. The offset of a unit vector at angle `a` is
//! `(lookup_sin(a), -lookup_cos(a))`.

use std::sync::OnceLock;

/// Table steps per degree
pub const LOOKUPS_PER_DEGREE: usize = 10;

/// Table steps in a full circle
pub const LOOKUPS_PER_CIRCLE: usize = 360 * LOOKUPS_PER_DEGREE;

/// Table steps in a quarter circle; cosine is sine shifted by this much
pub const LOOKUPS_PER_QUARTER: usize = 90 * LOOKUPS_PER_DEGREE;

/// A full circle plus a repeated first quarter for cosine lookups
pub const TABLE_SIZE: usize = LOOKUPS_PER_CIRCLE + LOOKUPS_PER_QUARTER;

static SINE_TABLE: OnceLock<Box<[f32]>> = OnceLock::new();

/// Build the table. Calls after the first are no-ops.
pub fn init() {
    table();
}

fn table() -> &'static [f32] {
    SINE_TABLE.get_or_init(build_table)
}

fn build_table() -> Box<[f32]> {
    let mut sine = vec![0.0f32; TABLE_SIZE];
    for (i, value) in sine.iter_mut().enumerate() {
        let degrees = i as f64 / LOOKUPS_PER_DEGREE as f64;
        *value = degrees.to_radians().sin() as f32;
    }

    // Exact cardinals: axis-aligned sprites must not jitter.
    for (quarter, exact) in [0.0, 1.0, 0.0, -1.0, 0.0].into_iter().enumerate() {
        sine[quarter * LOOKUPS_PER_QUARTER] = exact;
    }

    log::debug!("built trig lookup table with {TABLE_SIZE} entries");
    sine.into_boxed_slice()
}

/// Sine at a table index. `index` must be below [`TABLE_SIZE`].
#[inline]
pub fn lookup_sin(index: usize) -> f32 {
    table()[index]
}

/// Cosine at a table index. `index` must be below [`LOOKUPS_PER_CIRCLE`].
#[inline]
pub fn lookup_cos(index: usize) -> f32 {
    lookup_sin(index + LOOKUPS_PER_QUARTER)
}

/// Wrap an accumulated angle into `[0, LOOKUPS_PER_CIRCLE)`.
///
/// Adds or subtracts whole circles rather than using `%`, so negative
/// deltas wrap backwards correctly. Non-finite angles reset to 0.
pub fn normalize_index(mut angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let circle = LOOKUPS_PER_CIRCLE as f32;
    // Far out of range, subtracting a circle no longer changes the value.
    if angle.abs() >= circle * 64.0 {
        angle = angle.rem_euclid(circle);
    }
    loop {
        if angle >= circle {
            angle -= circle;
        } else if angle < 0.0 {
            angle += circle;
        } else {
            return angle;
        }
    }
}

/// Convert screen-space degrees into a normalized table index
pub fn degrees_to_index(degrees: f32) -> f32 {
    normalize_index(degrees * LOOKUPS_PER_DEGREE as f32)
}

/// Table slot for a normalized angle
#[inline]
pub fn index_of(angle: f32) -> usize {
    (angle as usize).min(LOOKUPS_PER_CIRCLE - 1)
}
