use crate::shared::frame::Frame;
use crate::source::domain::frame_source::SourceError;

/// Sequential access to the decoded frames of one video stream.
///
/// Implementations handle I/O details (container, codec, pixel format);
/// the frame source built on top owns the cursor and lookahead behavior.
/// Releasing the underlying handle happens on drop.
pub trait VideoDecoder {
    /// Decodes and returns the next frame in stream order.
    ///
    /// `Ok(None)` is clean end of stream; `Err` is a frame that exists but
    /// cannot be decoded.
    fn decode_next(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Total frame count as reported by the container metadata.
    fn frame_count(&self) -> usize;
}
