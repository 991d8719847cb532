//! Headless simulation on the in-memory backend

use crate::scenario::Scenario;
use anyhow::{Context, Result};
use ember_core::StepClock;
use ember_particles::rand::ParticleRng;
use ember_particles::{
    Emitter, GpuBackend, MemoryBackend, Sprite, SpriteAtlas, TextureId, TextureRegion,
};
use std::time::{Duration, Instant};

pub struct SimulateArgs {
    pub scenario: Option<String>,
    pub frames: Option<u32>,
    pub report_every: u32,
    pub realtime: bool,
}

/// Totals gathered over a run
#[derive(Debug, Default)]
pub struct SimulationReport {
    pub frames: u32,
    pub emitted: u64,
    pub evictions: u64,
    pub final_live: usize,
    pub peak_live: usize,
    pub total_update: Duration,
    pub max_update: Duration,
    /// Clock time covered by the run, in seconds
    pub clock_seconds: f64,
}

impl SimulationReport {
    pub fn average_update(&self) -> Duration {
        if self.frames == 0 {
            Duration::ZERO
        } else {
            self.total_update / self.frames
        }
    }
}

const SPRITE_NAME: &str = "particle";

pub fn run(args: SimulateArgs) -> Result<()> {
    let mut scenario = Scenario::load(args.scenario.as_deref())?;
    if let Some(frames) = args.frames {
        scenario.frames = frames;
    }

    let backend = MemoryBackend::new();
    let mut emitter = build_emitter(&scenario, backend.clone())?;
    println!(
        "Simulating {} frames, capacity {}",
        scenario.frames,
        emitter.capacity()
    );

    let report = simulate(&scenario, &mut emitter, args.realtime, |frame, emitter, elapsed| {
        if args.report_every > 0 && (frame + 1) % args.report_every == 0 {
            println!(
                "frame {:>6}  live {:>8}  update {:>8.3} ms",
                frame + 1,
                emitter.live_count(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
    })?;

    println!();
    println!("Frames:        {}", report.frames);
    println!("Emitted:       {}", report.emitted);
    println!("Evicted:       {}", report.evictions);
    println!("Live at end:   {}", report.final_live);
    println!("Peak live:     {}", report.peak_live);
    println!("Clock time:    {:.3} s", report.clock_seconds);
    println!(
        "Update time:   avg {:.3} ms, max {:.3} ms",
        report.average_update().as_secs_f64() * 1000.0,
        report.max_update.as_secs_f64() * 1000.0
    );
    println!(
        "Backend:       {} uploads ({} bytes), {} draws",
        backend.upload_count(),
        backend.bytes_uploaded(),
        backend.draw_count()
    );

    Ok(())
}

/// Emitter over `backend` sized and textured from the scenario
pub fn build_emitter<B: GpuBackend>(scenario: &Scenario, backend: B) -> Result<Emitter<B>> {
    let mut atlas = SpriteAtlas::new();
    atlas.insert(
        SPRITE_NAME,
        Sprite {
            width: scenario.sprite.width,
            height: scenario.sprite.height,
            region: TextureRegion::full(TextureId(0)),
        },
    );
    Emitter::new(backend, &atlas, SPRITE_NAME, scenario.emitter.clone())
        .context("Failed to create emitter")
}

/// Run every frame of `scenario`: spawn, update, draw. `on_frame` sees the
/// emitter after each frame along with that frame's update time.
pub fn simulate<B, F>(
    scenario: &Scenario,
    emitter: &mut Emitter<B>,
    realtime: bool,
    mut on_frame: F,
) -> Result<SimulationReport>
where
    B: GpuBackend,
    F: FnMut(u32, &mut Emitter<B>, Duration),
{
    let mut rng = ParticleRng::new(scenario.seed);
    let mut clock = StepClock::with_rate(scenario.frame_rate);
    let mut report = SimulationReport::default();
    let evictions_before = emitter.evictions();

    while report.frames < scenario.frames {
        if realtime {
            clock.tick();
            if !clock.should_step() {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }
        } else {
            clock.advance(clock.fixed_step);
        }

        while clock.should_step() && report.frames < scenario.frames {
            clock.consume_step();
            let frame = report.frames;

            let start = Instant::now();
            report.emitted += scenario.spawn(frame, &mut rng, emitter) as u64;
            emitter
                .update(scenario.dt)
                .with_context(|| format!("Update failed on frame {}", frame))?;
            emitter.draw();
            let elapsed = start.elapsed();

            report.total_update += elapsed;
            report.max_update = report.max_update.max(elapsed);
            report.peak_live = report.peak_live.max(emitter.live_count());
            report.frames += 1;
            log::trace!("frame {} live {}", frame, emitter.live_count());

            on_frame(frame, emitter, elapsed);
        }
    }

    report.final_live = emitter.live_count();
    report.clock_seconds = clock.total_time;
    report.evictions = emitter.evictions() - evictions_before;
    Ok(report)
}
