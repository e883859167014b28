use std::fs;
use std::path::PathBuf;

use crate::config::station_config::StationConfig;
use crate::shared::frame::Frame;
use crate::source::domain::frame_source::{FrameSource, SourceError};

/// Frame source over a directory of numbered still images.
///
/// The file for logical position `i` is `<dir>/<prefix><i + offset>.jpg`
/// with the number zero-padded to the configured width. The total frame
/// count is fixed once at construction by counting directory entries; each
/// `read` decodes its file independently, so decode cost is paid per call
/// and a missing or corrupt file surfaces as a decode error with no retry.
pub struct DirectoryFrameSource {
    dir: PathBuf,
    prefix: String,
    digits: u8,
    offset: usize,
    index: usize,
    total_frames: usize,
}

impl DirectoryFrameSource {
    /// Counts the entries of the image directory once to fix the frame
    /// total. An unreadable directory is an [`SourceError::Open`].
    pub fn new(config: &StationConfig) -> Result<Self, SourceError> {
        let entries = fs::read_dir(&config.image_dataset).map_err(|e| SourceError::Open {
            path: config.image_dataset.clone(),
            reason: e.to_string(),
        })?;
        let total_frames = entries.filter_map(Result::ok).count();
        log::debug!(
            "directory source over {} with {} frames",
            config.image_dataset.display(),
            total_frames
        );

        Ok(Self {
            dir: config.image_dataset.clone(),
            prefix: config.image_path_prefix.clone(),
            digits: config.image_path_digits,
            offset: config.image_number_offset,
            index: 0,
            total_frames,
        })
    }

    /// Repositions the cursor for random access; the next `read` yields
    /// logical frame `index + 1`.
    pub fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    /// Path of the image backing logical position `i`. Widths 3 and 5 are
    /// honored as configured; any other configured width pads to 4.
    fn frame_path(&self, i: usize) -> PathBuf {
        let number = i + self.offset;
        let name = match self.digits {
            5 => format!("{}{:05}.jpg", self.prefix, number),
            3 => format!("{}{:03}.jpg", self.prefix, number),
            _ => format!("{}{:04}.jpg", self.prefix, number),
        };
        self.dir.join(name)
    }
}

impl FrameSource for DirectoryFrameSource {
    fn has_next(&mut self) -> bool {
        self.index < self.total_frames
    }

    fn read(&mut self) -> Result<Frame, SourceError> {
        if self.index >= self.total_frames {
            return Err(SourceError::Exhausted);
        }
        self.index += 1;
        let path = self.frame_path(self.index);
        let image = image::open(&path).map_err(|e| SourceError::Decode {
            index: self.index,
            reason: format!("{}: {e}", path.display()),
        })?;
        let rgb = image.to_rgb8();
        let (width, height) = (rgb.width(), rgb.height());
        Ok(Frame::new(rgb.into_raw(), width, height, 3, self.index))
    }

    fn close(&mut self) {
        // No held resources; each read opens and drops its own file.
    }

    fn index(&self) -> usize {
        self.index
    }
}
