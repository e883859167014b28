use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::station_config::{load_station_config, ConfigError, StationConfig};
use crate::source::domain::frame_source::{FrameSource, SourceError};
use crate::source::infrastructure::directory_source::DirectoryFrameSource;
use crate::source::infrastructure::video_source::VideoFrameSource;

#[derive(Error, Debug)]
pub enum SelectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

/// The two frame-source variants a session can resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Directory,
    Video,
}

/// Decides which variant serves a session: the image directory wins when
/// it holds at least one entry, otherwise the video file is used.
///
/// This is a heuristic on directory population, not an explicit type tag:
/// an existing-but-empty directory means pre-extraction has not been done
/// and reads go to the video. A directory that cannot be listed at all is
/// treated the same way.
pub fn select_variant(config: &StationConfig) -> SourceKind {
    match fs::read_dir(&config.image_dataset) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                SourceKind::Directory
            } else {
                SourceKind::Video
            }
        }
        Err(e) => {
            log::debug!(
                "image directory {} not listable ({e}), falling back to video",
                config.image_dataset.display()
            );
            SourceKind::Video
        }
    }
}

/// Loads the session record from the config store at `config_path` and
/// constructs the frame source chosen by [`select_variant`].
pub fn select(
    config_path: &Path,
    session_key: &str,
) -> Result<Box<dyn FrameSource>, SelectError> {
    let config = load_station_config(config_path, session_key)?;
    match select_variant(&config) {
        SourceKind::Directory => {
            log::info!(
                "session '{session_key}': reading extracted images from {}",
                config.image_dataset.display()
            );
            Ok(Box::new(DirectoryFrameSource::new(&config)?))
        }
        SourceKind::Video => {
            log::info!(
                "session '{session_key}': reading video {}",
                config.video_path.display()
            );
            Ok(Box::new(VideoFrameSource::new(&config)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::source::infrastructure::ffmpeg_video_decoder::encode_test_video;

    fn config_with(image_dataset: PathBuf, video_path: PathBuf) -> StationConfig {
        StationConfig {
            image_number_offset: 0,
            image_dataset,
            image_path_prefix: "img".to_string(),
            image_path_digits: 4,
            video_path,
        }
    }

    fn write_store(dir: &Path, config: &StationConfig) -> PathBuf {
        let mut store = std::collections::HashMap::new();
        store.insert("1".to_string(), config.clone());
        let path = dir.join("station.json");
        fs::write(&path, serde_json::to_string(&store).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_populated_directory_selects_directory_variant() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();
        fs::write(images.join("img0001.jpg"), b"stub").unwrap();

        let config = config_with(images, PathBuf::from("/unused.mp4"));
        assert_eq!(select_variant(&config), SourceKind::Directory);
    }

    #[test]
    fn test_empty_directory_selects_video_variant() {
        // Existing but empty means pre-extraction has not run yet.
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();

        let config = config_with(images, PathBuf::from("/unused.mp4"));
        assert_eq!(select_variant(&config), SourceKind::Video);
    }

    #[test]
    fn test_missing_directory_selects_video_variant() {
        let config = config_with(
            PathBuf::from("/nonexistent/images"),
            PathBuf::from("/unused.mp4"),
        );
        assert_eq!(select_variant(&config), SourceKind::Video);
    }

    #[test]
    fn test_select_builds_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
        img.save(images.join("img0001.jpg")).unwrap();

        let config = config_with(images, PathBuf::from("/unused.mp4"));
        let store_path = write_store(dir.path(), &config);

        let mut source = select(&store_path, "1").unwrap();
        assert!(source.has_next());
        let frame = source.read().unwrap();
        assert_eq!(frame.index(), 1);
        assert!(!source.has_next());
        source.close();
    }

    #[test]
    fn test_select_builds_video_source() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();
        let video = dir.path().join("clip.mp4");
        encode_test_video(&video, 3, 64, 48);

        let config = config_with(images, video);
        let store_path = write_store(dir.path(), &config);

        let mut source = select(&store_path, "1").unwrap();
        // Offset 0: one frame consumed during construction skip.
        assert_eq!(source.index(), 1);
        let frame = source.read().unwrap();
        assert_eq!(frame.channels(), 3);
        source.close();
    }

    #[test]
    fn test_select_unknown_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_with(dir.path().to_path_buf(), PathBuf::from("/unused.mp4"));
        let store_path = write_store(dir.path(), &config);

        let err = select(&store_path, "99").unwrap_err();
        assert!(matches!(
            err,
            SelectError::Config(ConfigError::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_select_missing_video_is_open_error() {
        // Empty image dir routes to video, and the unopenable video fails
        // loudly at construction instead of posing as an empty source.
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();

        let config = config_with(images, PathBuf::from("/nonexistent/clip.mp4"));
        let store_path = write_store(dir.path(), &config);

        let err = select(&store_path, "1").unwrap_err();
        assert!(matches!(err, SelectError::Source(SourceError::Open { .. })));
    }
}
