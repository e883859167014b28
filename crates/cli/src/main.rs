use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use frameflow_core::config::station_config::default_config_dir;
use frameflow_core::source::domain::frame_source::FrameSource;
use frameflow_core::source::domain::image_writer::ImageWriter;
use frameflow_core::source::infrastructure::image_file_writer::ImageFileWriter;
use frameflow_core::source::infrastructure::source_selector;

const SAVED_FRAME_PATH: &str = "tmp.jpg";

/// Reads one frame from a station capture session and reports or saves it.
///
/// The session is served by the directory of pre-extracted images named in
/// its config when that directory is populated, and by the configured
/// video file otherwise.
#[derive(Parser)]
#[command(name = "frameflow")]
struct Cli {
    /// Name of the station whose config store to load.
    station_name: String,

    /// Session key inside the station's config store.
    video_identifier: String,

    /// Save the decoded frame to tmp.jpg instead of printing a summary.
    #[arg(short, long)]
    save: bool,

    /// Directory containing station config stores (default: the platform
    /// config dir, e.g. ~/.config/frameflow).
    #[arg(short, long)]
    path: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_dir = cli.path.unwrap_or_else(default_config_dir);
    let config_path = config_dir.join(format!("{}.json", cli.station_name));
    log::debug!("loading config store {}", config_path.display());

    let mut source = source_selector::select(&config_path, &cli.video_identifier)?;
    let result = read_one_frame(source.as_mut(), cli.save);
    source.close();
    result
}

fn read_one_frame(source: &mut dyn FrameSource, save: bool) -> Result<(), Box<dyn std::error::Error>> {
    let frame = source.read()?;

    if save {
        let writer = ImageFileWriter::new();
        writer.write(Path::new(SAVED_FRAME_PATH), &frame)?;
        log::info!("frame {} saved to {SAVED_FRAME_PATH}", frame.index());
    } else {
        println!(
            "frame {}: {}x{} ({} channels)",
            frame.index(),
            frame.width(),
            frame.height(),
            frame.channels()
        );
    }
    Ok(())
}
