pub mod frame_source;
pub mod image_writer;
pub mod video_decoder;
