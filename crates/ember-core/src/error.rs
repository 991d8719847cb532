//! Error types for Ember

use thiserror::Error;

/// The main error type for Ember operations
#[derive(Debug, Error)]
pub enum EmberError {
    #[error("Required GPU capability missing: {0}")]
    CapabilityMissing(String),

    #[error("GPU buffer allocation mismatch: requested {requested} bytes, got {actual}")]
    BufferSizeMismatch { requested: u64, actual: u64 },

    #[error("Time step must be >= 0, got {0}")]
    NegativeTimeStep(f32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sprite not found: {0}")]
    SpriteNotFound(String),

}

/// Result type alias for Ember operations
pub type Result<T> = std::result::Result<T, EmberError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_mismatch_message_names_both_sizes() {
        let err = EmberError::BufferSizeMismatch {
            requested: 80,
            actual: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains("80"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn negative_step_message_names_value() {
        assert!(EmberError::NegativeTimeStep(-1.5).to_string().contains("-1.5"));
    }
}
