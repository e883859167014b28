use std::path::PathBuf;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot open frame source {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("cannot decode frame {index}: {reason}")]
    Decode { index: usize, reason: String },
    #[error("no more frames in source")]
    Exhausted,
}

/// Sequential reader of frames from one capture session.
///
/// Implementations keep a cursor that starts at 0 and advances by exactly
/// one per successful [`read`](FrameSource::read). A source is used from a
/// single thread: `has_next` and `read` mutate internal decoder state and a
/// one-frame lookahead buffer with no synchronization.
///
/// End of source is signaled by `has_next() == false`, not by an error;
/// reading past the end yields [`SourceError::Exhausted`].
pub trait FrameSource {
    /// Reports whether at least one more frame is obtainable.
    ///
    /// For video-backed sources this decodes the next frame into a
    /// single-slot lookahead buffer (the only way to detect end-of-stream
    /// on a sequential decoder is to attempt the decode). Calling it again
    /// without an intervening `read` discards the previous probe and
    /// decodes afresh. For directory-backed sources it is a pure
    /// comparison with no side effect.
    fn has_next(&mut self) -> bool;

    /// Advances the cursor and returns the next decoded frame.
    ///
    /// `has_next` followed by `read` costs exactly one decode, as does
    /// `read` alone; both call patterns are valid.
    fn read(&mut self) -> Result<Frame, SourceError>;

    /// Releases underlying decoder resources. Safe to call repeatedly.
    fn close(&mut self);

    /// Current cursor value.
    fn index(&self) -> usize;
}

#[cfg(test)]
impl std::fmt::Debug for dyn FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("dyn FrameSource")
            .field("index", &self.index())
            .finish_non_exhaustive()
    }
}
