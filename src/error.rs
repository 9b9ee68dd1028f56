use thiserror::Error;

/// Errors raised by frame sources (cameras and video files).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no capture devices available")]
    NoDevices,

    #[error("failed to open {what}: {reason}")]
    Open { what: String, reason: String },

    #[error("frame read failed: {0}")]
    Read(String),

    #[error("frame decode failed: {0}")]
    Decode(String),

    #[error("end of stream")]
    EndOfStream,
}

/// A single modality's inference failure. Isolated per modality: the other
/// detectors' results for the same tick are unaffected.
#[derive(Debug, Error)]
#[error("{modality} inference failed: {reason}")]
pub struct InferenceError {
    pub modality: &'static str,
    pub reason: String,
}

impl InferenceError {
    pub fn new(modality: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            modality,
            reason: err.to_string(),
        }
    }
}

/// Device switch failures. A failed switch rolls back to the previous device.
#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("device switch already in progress")]
    AlreadySwitching,

    #[error("failed to rebuild models on {device}: {reason}")]
    Rebuild { device: String, reason: String },
}

/// Transmission failures. Telemetry semantics: logged and dropped, no retry.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("datagram send failed: {0}")]
    Socket(#[from] std::io::Error),
}
