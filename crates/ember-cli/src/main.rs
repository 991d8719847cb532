//! Ember CLI - run sprite particle scenarios headlessly

mod commands;
mod scenario;
mod sprites;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{render, simulate, table};

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "Fixed-capacity sprite particle simulator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario on the in-memory backend and report timings
    Simulate {
        /// Path to scenario file (built-in fountain when omitted)
        scenario: Option<String>,

        /// Override the scenario's frame count
        #[arg(long)]
        frames: Option<u32>,

        /// Print a progress line every N frames (0 disables)
        #[arg(long, default_value = "10")]
        report_every: u32,

        /// Pace frames against the wall clock at the scenario's frame rate
        #[arg(long)]
        realtime: bool,
    },

    /// Run a scenario on the GPU and write the last frame to a PNG image
    Render {
        /// Path to scenario file (built-in fountain when omitted)
        scenario: Option<String>,

        /// Output image path
        #[arg(short, long, default_value = "particles.png")]
        output: String,

        /// Override the scenario's frame count
        #[arg(long)]
        frames: Option<u32>,

        /// Image width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Image height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Background color as RRGGBB hex
        #[arg(long, default_value = "000000", value_parser = parse_hex_color)]
        background: u32,
    },

    /// Print samples of the trig lookup table
    Table {
        /// Degrees between rows
        #[arg(long, default_value = "15")]
        step: f32,
    },
}

fn parse_hex_color(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches('#').trim_start_matches("0x");
    if digits.len() != 6 {
        return Err(format!("expected 6 hex digits, got '{}'", s));
    }
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid color '{}': {}", s, e))
}

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_LEVEL: &str = "info";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_LOG_LEVEL))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            scenario,
            frames,
            report_every,
            realtime,
        } => simulate::run(simulate::SimulateArgs {
            scenario,
            frames,
            report_every,
            realtime,
        }),
        Commands::Render {
            scenario,
            output,
            frames,
            width,
            height,
            background,
        } => render::run(render::RenderArgs {
            scenario,
            output,
            frames,
            width,
            height,
            background,
        }),
        Commands::Table { step } => table::run(table::TableArgs { step }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("00FFFF"), Ok(0x00FFFF));
        assert_eq!(parse_hex_color("#102030"), Ok(0x102030));
        assert!(parse_hex_color("fff").is_err());
        assert!(parse_hex_color("zzzzzz").is_err());
    }

    #[test]
    fn default_log_level_is_info() {
        assert_eq!(DEFAULT_LOG_LEVEL, "info");
        assert_eq!(DEFAULT_LOG_LEVEL.parse::<log::LevelFilter>(), Ok(log::LevelFilter::Info));
    }

    #[test]
    fn cli_parses_render_arguments() {
        let cli = Cli::try_parse_from(["ember", "render", "--frames", "5", "--background", "#FF0000"])
            .unwrap();
        match cli.command {
            Commands::Render {
                frames, background, output, ..
            } => {
                assert_eq!(frames, Some(5));
                assert_eq!(background, 0xFF0000);
                assert_eq!(output, "particles.png");
            }
            _ => panic!("expected render command"),
        }
    }
}
