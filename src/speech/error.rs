use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("speech synthesis request failed: {message}")]
    Synthesis { message: String },
    #[error("speech service returned status {status}")]
    Status { status: u16 },
    #[error("audio playback failed: {message}")]
    Playback { message: String },
    #[error("playback exceeded watchdog limit ({0:?})")]
    Watchdog(Duration),
}
