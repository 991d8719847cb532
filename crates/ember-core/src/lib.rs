//! Ember Core - Foundational types for the Ember particle simulator
//!
//! This crate provides the types that all other Ember crates depend on:
//! - `Color` - RGBA float color with 8-bit quantization
//! - `StepClock` - fixed-step time source for emitters
//! - Error types and Result alias

mod clock;
mod error;
mod types;

pub use clock::StepClock;
pub use error::{EmberError, Result};
pub use types::Color;
