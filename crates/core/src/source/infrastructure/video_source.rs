use crate::config::station_config::StationConfig;
use crate::shared::frame::Frame;
use crate::source::domain::frame_source::{FrameSource, SourceError};
use crate::source::domain::video_decoder::VideoDecoder;
use crate::source::infrastructure::ffmpeg_video_decoder::FfmpegVideoDecoder;

/// Frame source over a sequentially decoded video stream.
///
/// Holds a single-slot lookahead buffer: `has_next` must attempt a decode
/// to detect end-of-stream, and the decoded frame is parked in `pending`
/// so the following `read` can consume it without decoding again. The slot
/// transitions empty -> occupied on `has_next`, occupied -> empty on
/// `read`; a second `has_next` without an intervening `read` overwrites
/// the slot, discarding the earlier probe.
///
/// The decoder handle lives in an `Option` so `close` releases it exactly
/// once and dropping the source without closing releases it as well.
pub struct VideoFrameSource {
    decoder: Option<Box<dyn VideoDecoder>>,
    pending: Option<Frame>,
    index: usize,
    total_frames: usize,
}

impl VideoFrameSource {
    /// Opens `config.video_path` with the ffmpeg-backed decoder. An
    /// unopenable file fails here rather than degrading to an empty
    /// source.
    pub fn new(config: &StationConfig) -> Result<Self, SourceError> {
        let decoder = FfmpegVideoDecoder::open(&config.video_path)?;
        Ok(Self::from_decoder(
            Box::new(decoder),
            config.image_number_offset,
        ))
    }

    /// Builds the source over an already opened decoder and skips to the
    /// configured starting position by consuming `offset + 1` frames,
    /// stopping early if the stream ends first.
    pub fn from_decoder(decoder: Box<dyn VideoDecoder>, offset: usize) -> Self {
        // Container frame counts are off by one in the sources this was
        // written against; keep the +1 compensation.
        let total_frames = decoder.frame_count() + 1;
        let mut source = Self {
            decoder: Some(decoder),
            pending: None,
            index: 0,
            total_frames,
        };

        for _ in 0..=offset {
            if !source.has_next() {
                break;
            }
            // A successful probe fills the lookahead slot, so this read
            // cannot fail.
            let _ = source.read();
        }
        source
    }

    /// Frame total as reported by the container, plus one.
    pub fn total_frames(&self) -> usize {
        self.total_frames
    }
}

impl FrameSource for VideoFrameSource {
    fn has_next(&mut self) -> bool {
        let Some(decoder) = self.decoder.as_mut() else {
            return false;
        };
        match decoder.decode_next() {
            Ok(Some(frame)) => {
                self.pending = Some(frame);
                true
            }
            Ok(None) => {
                self.pending = None;
                false
            }
            Err(e) => {
                log::warn!("lookahead decode failed, treating source as exhausted: {e}");
                self.pending = None;
                false
            }
        }
    }

    fn read(&mut self) -> Result<Frame, SourceError> {
        if let Some(frame) = self.pending.take() {
            self.index += 1;
            return Ok(frame.with_index(self.index));
        }
        let decoder = self.decoder.as_mut().ok_or(SourceError::Exhausted)?;
        match decoder.decode_next()? {
            Some(frame) => {
                self.index += 1;
                Ok(frame.with_index(self.index))
            }
            None => Err(SourceError::Exhausted),
        }
    }

    fn close(&mut self) {
        // Dropping the decoder releases the underlying handle; the Option
        // guard makes repeated closes a no-op.
        self.decoder = None;
        self.pending = None;
    }

    fn index(&self) -> usize {
        self.index
    }
}
