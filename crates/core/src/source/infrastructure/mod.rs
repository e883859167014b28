pub mod directory_source;
pub mod ffmpeg_video_decoder;
pub mod image_file_writer;
pub mod source_selector;
pub mod video_source;
