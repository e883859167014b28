use std::path::Path;

use crate::shared::frame::Frame;
use crate::source::domain::frame_source::SourceError;
use crate::source::domain::video_decoder::VideoDecoder;

/// Sequential video decoder backed by ffmpeg-next (libavformat +
/// libavcodec). Every frame is converted to RGB24 through a software
/// scaler before being handed out.
///
/// The demux/decode state is pull-based: `decode_next` feeds packets to
/// the codec until a frame comes out, then flushes the codec with an EOF
/// once the container runs out of packets. The handle is released when the
/// decoder is dropped.
pub struct FfmpegVideoDecoder {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    reported_frames: usize,
    decode_order: usize,
    flushing: bool,
    done: bool,
}

#[cfg(test)]
impl std::fmt::Debug for FfmpegVideoDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegVideoDecoder")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("video_stream_index", &self.video_stream_index)
            .field("reported_frames", &self.reported_frames)
            .field("decode_order", &self.decode_order)
            .field("flushing", &self.flushing)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl FfmpegVideoDecoder {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let open_err = |reason: String| SourceError::Open {
            path: path.to_path_buf(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| open_err(e.to_string()))?;
        let ictx = ffmpeg_next::format::input(path).map_err(|e| open_err(e.to_string()))?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| open_err("no video stream found".to_string()))?;
        let video_stream_index = stream.index();
        let reported_frames = stream.frames().max(0) as usize;

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_err(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| open_err(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| open_err(e.to_string()))?;

        log::debug!(
            "opened video {} ({}x{}, {} reported frames)",
            path.display(),
            width,
            height,
            reported_frames
        );

        Ok(Self {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            reported_frames,
            decode_order: 0,
            flushing: false,
            done: false,
        })
    }

    /// Pulls one frame out of the codec if it has one ready.
    fn receive(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb)
            .map_err(|e| SourceError::Decode {
                index: self.decode_order + 1,
                reason: e.to_string(),
            })?;

        let pixels = strip_row_padding(&rgb, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, 3, self.decode_order);
        self.decode_order += 1;
        Ok(Some(frame))
    }

    /// Demuxes the next packet of the video stream, or `None` at container
    /// end. The stream handle is reduced to its index immediately so the
    /// owned packet can outlive the demux borrow.
    fn next_video_packet(&mut self) -> Option<ffmpeg_next::Packet> {
        loop {
            let (stream_index, packet) = self.ictx.packets().next().map(|(s, p)| (s.index(), p))?;
            if stream_index == self.video_stream_index {
                return Some(packet);
            }
        }
    }
}

impl VideoDecoder for FfmpegVideoDecoder {
    fn decode_next(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.done {
            return Ok(None);
        }

        if let Some(frame) = self.receive()? {
            return Ok(Some(frame));
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some(packet) = self.next_video_packet() else {
                // Container exhausted: flush buffered frames out of the
                // codec before reporting end of stream.
                let _ = self.decoder.send_eof();
                self.flushing = true;
                let frame = self.receive()?;
                if frame.is_none() {
                    self.done = true;
                }
                return Ok(frame);
            };

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn frame_count(&self) -> usize {
        self.reported_frames
    }
}

/// Copies pixel data out of an ffmpeg frame into a tightly packed RGB
/// buffer, dropping any per-row stride padding.
fn strip_row_padding(
    rgb: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}

/// Encodes a short synthetic MPEG4 clip where frame `i` is a solid gray of
/// value `(i * 30) % 256`. Shared by decoder and selector tests.
#[cfg(test)]
pub(crate) fn encode_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
    let fps = 25;
    ffmpeg_next::init().unwrap();

    let mut octx = ffmpeg_next::format::output(path).unwrap();
    let global_header = octx
        .format()
        .flags()
        .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

    let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
    let mut ost = octx.add_stream(Some(codec)).unwrap();

    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .unwrap();
    encoder_ctx.set_width(width);
    encoder_ctx.set_height(height);
    encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
    encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
    if global_header {
        encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
    }

    let mut encoder = encoder_ctx
        .open_with(ffmpeg_next::Dictionary::new())
        .unwrap();
    ost.set_parameters(&encoder);
    octx.write_header().unwrap();
    let ost_time_base = octx.stream(0).unwrap().time_base();

    let write_packets = |encoder: &mut ffmpeg_next::encoder::Video,
                             octx: &mut ffmpeg_next::format::context::Output| {
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            // Without an explicit duration the mp4 edit list ends at the
            // last frame's pts and the demuxer drops that frame.
            encoded.set_duration(1);
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(octx).unwrap();
        }
    };

    for i in 0..num_frames {
        let mut yuv = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
        );
        // Solid gray: luma = value, chroma planes neutral.
        let value = ((i * 30) % 256) as u8;
        for plane in 0..3 {
            let fill = if plane == 0 { value } else { 128 };
            for byte in yuv.data_mut(plane) {
                *byte = fill;
            }
        }
        yuv.set_pts(Some(i as i64));
        encoder.send_frame(&yuv).unwrap();
        write_packets(&mut encoder, &mut octx);
    }

    encoder.send_eof().unwrap();
    write_packets(&mut encoder, &mut octx);
    octx.write_trailer().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::config::station_config::StationConfig;
    use crate::source::infrastructure::video_source::VideoFrameSource;

    fn test_video(dir: &Path, frames: usize) -> PathBuf {
        let path = dir.join("clip.mp4");
        encode_test_video(&path, frames, 64, 48);
        path
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let err = FfmpegVideoDecoder::open(Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(matches!(err, SourceError::Open { .. }));
    }

    #[test]
    fn test_decodes_all_frames_then_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 5);
        let mut decoder = FfmpegVideoDecoder::open(&path).unwrap();

        let mut count = 0;
        while decoder.decode_next().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
        // End of stream is stable.
        assert!(decoder.decode_next().unwrap().is_none());
    }

    #[test]
    fn test_frames_are_packed_rgb() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 3);
        let mut decoder = FfmpegVideoDecoder::open(&path).unwrap();

        let frame = decoder.decode_next().unwrap().unwrap();
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.data().len(), 64 * 48 * 3);
    }

    #[test]
    fn test_frame_count_matches_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 5);
        let decoder = FfmpegVideoDecoder::open(&path).unwrap();
        assert_eq!(decoder.frame_count(), 5);
    }

    #[test]
    fn test_video_source_over_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video(dir.path(), 6);
        let config = StationConfig {
            image_number_offset: 1,
            image_dataset: dir.path().join("no-images"),
            image_path_prefix: String::new(),
            image_path_digits: 4,
            video_path: path,
        };

        use crate::source::domain::frame_source::FrameSource;
        let mut source = VideoFrameSource::new(&config).unwrap();
        // Reported count 6, plus the compensation.
        assert_eq!(source.total_frames(), 7);
        // Offset 1 consumed two frames at construction.
        assert_eq!(source.index(), 2);

        let mut remaining = 0;
        while source.has_next() {
            source.read().unwrap();
            remaining += 1;
        }
        assert_eq!(remaining, 4);
        source.close();
    }

    #[test]
    fn test_video_source_open_error_surfaces() {
        let config = StationConfig {
            image_number_offset: 0,
            image_dataset: PathBuf::from("/nonexistent"),
            image_path_prefix: String::new(),
            image_path_digits: 4,
            video_path: PathBuf::from("/nonexistent/clip.mp4"),
        };
        assert!(matches!(
            VideoFrameSource::new(&config),
            Err(SourceError::Open { .. })
        ));
    }
}
