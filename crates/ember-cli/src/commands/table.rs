//! Trig lookup table dump

use anyhow::Result;
use ember_particles::trig;

pub struct TableArgs {
    /// Degrees between printed rows
    pub step: f32,
}

/// One printed row: table index, degrees, sine, cosine
pub type TableRow = (usize, f32, f32, f32);

pub fn run(args: TableArgs) -> Result<()> {
    let rows = sample(args.step)?;
    println!(
        "{} entries, {} per degree",
        trig::TABLE_SIZE,
        trig::LOOKUPS_PER_DEGREE
    );
    println!("{:>6} {:>8} {:>10} {:>10}", "index", "degrees", "sin", "cos");
    for (index, degrees, sin, cos) in rows {
        println!("{:>6} {:>8.1} {:>10.6} {:>10.6}", index, degrees, sin, cos);
    }
    Ok(())
}

/// Rows every `step` degrees over one full circle
pub fn sample(step: f32) -> Result<Vec<TableRow>> {
    if !(step.is_finite() && step * trig::LOOKUPS_PER_DEGREE as f32 >= 1.0) {
        anyhow::bail!(
            "step must be at least {} degrees, got {}",
            1.0 / trig::LOOKUPS_PER_DEGREE as f32,
            step
        );
    }
    trig::init();

    let stride = (step * trig::LOOKUPS_PER_DEGREE as f32).round() as usize;
    Ok((0..trig::LOOKUPS_PER_CIRCLE)
        .step_by(stride)
        .map(|index| {
            let degrees = index as f32 / trig::LOOKUPS_PER_DEGREE as f32;
            (index, degrees, trig::lookup_sin(index), trig::lookup_cos(index))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_step_hits_cardinals_exactly() {
        let rows = sample(90.0).unwrap();
        let values: Vec<(f32, f32)> = rows.iter().map(|r| (r.2, r.3)).collect();
        assert_eq!(
            values,
            vec![(0.0, 1.0), (1.0, 0.0), (0.0, -1.0), (-1.0, 0.0)]
        );
    }

    #[test]
    fn one_degree_step_covers_circle() {
        let rows = sample(1.0).unwrap();
        assert_eq!(rows.len(), 360);
        assert_eq!(rows[359].0, 3590);
    }

    #[test]
    fn too_fine_step_rejected() {
        assert!(sample(0.01).is_err());
        assert!(sample(f32::NAN).is_err());
    }
}
