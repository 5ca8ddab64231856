use thiserror::Error;

/// Failures inside the audio subsystem. None of these reach the UI; callers
/// log them and degrade to silence.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AudioError {
    #[error("audio output is not available on this platform")]
    Unavailable,
    #[error("audio context did not resume")]
    ResumeFailed,
    #[error("failed to create {0} node")]
    NodeCreation(&'static str),
    #[error("failed to schedule {0}")]
    Scheduling(&'static str),
    #[error("unknown effect kind `{0}`")]
    UnknownEffect(String),
}
