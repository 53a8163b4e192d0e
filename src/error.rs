use thiserror::Error;

/// Failures that surface as a visible connection-state change.
///
/// Per-message send failures are deliberately absent: a dropped audio chunk or
/// video frame is logged and swallowed where it happens, and the session keeps
/// running.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no API credential configured")]
    MissingCredential,

    #[error("media access failed: {0}")]
    MediaAccess(String),

    #[error("live session failed: {0}")]
    Live(String),
}
