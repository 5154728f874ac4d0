mod core;
mod renderer;
mod ui;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::core::format::{FrameGeometry, PixelFormat};
use crate::core::frame_source::FrameSource;
use crate::core::navigator::NavigationController;
use crate::renderer::{DisplayManager, DisplayMode};
use crate::ui::input::TerminalIntents;
use crate::utils::config::Config;
use crate::utils::logger::{self, Level};

/// Step through the frames of a raw, headerless YUV file in the terminal.
///
/// Keys: Right/Space next, Left previous, r rewind, q quit.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raw YUV file (concatenated frames, no header)
    file: PathBuf,
    /// Frame width in pixels
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    width: u32,
    /// Frame height in pixels
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    height: u32,
    /// Pixel format: YV12, IYUV, YUY2, UYVY or YVYU
    #[arg(value_parser = parse_format)]
    format: PixelFormat,
    /// Terminal rendering mode (defaults to the config file, then gray)
    #[arg(short, long, value_enum)]
    mode: Option<DisplayMode>,
    /// Print the frame layout and frame count as JSON, then exit
    #[arg(long, default_value_t = false)]
    info: bool,
    /// Log at debug level
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_format(tag: &str) -> Result<PixelFormat, crate::core::error::FrameError> {
    tag.parse()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("⚠️  {:#}; using defaults", e);
        Config::default()
    });

    let debug = cli.debug || config.debug || std::env::var_os("YUV_VIEW_DEBUG").is_some();
    let log_path = cli.log_file.clone().unwrap_or_else(|| config.log_path());
    if let Err(e) = logger::init(&log_path, if debug { Level::Debug } else { Level::Info }) {
        eprintln!("⚠️  {:#}; logging disabled", e);
    }

    let geometry = FrameGeometry::new(cli.format, cli.width, cli.height)?;
    logger::info(&format!(
        "{} {}x{}: {} pixels, {} bytes per frame (luma {}, chroma {} x2)",
        geometry.format(),
        geometry.width(),
        geometry.height(),
        geometry.pixel_count(),
        geometry.frame_size(),
        geometry.luma_size(),
        geometry.chroma_plane_size()
    ));

    let mut source = FrameSource::open(&cli.file, geometry)?;

    if cli.info {
        print_info(&cli.file, &mut source)?;
        source.close();
        return Ok(());
    }

    let mode = resolve_mode(cli.mode, &config);
    let mut navigator = NavigationController::new(display_name(&cli.file), &geometry);
    {
        let mut display = DisplayManager::new(mode)?;
        navigator.run(&mut source, &mut display, TerminalIntents);
    }
    source.close();

    logger::info(&format!(
        "Viewer closed on frame {}",
        navigator.current().map_or(0, |index| index.get())
    ));
    Ok(())
}

/// A `--mode` flag wins over the config file.
fn resolve_mode(flag: Option<DisplayMode>, config: &Config) -> DisplayMode {
    flag.unwrap_or(config.mode)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

fn print_info(path: &Path, source: &mut FrameSource<std::fs::File>) -> Result<()> {
    let count = source
        .frame_count()
        .with_context(|| format!("Failed to measure {}", path.display()))?;
    let geometry = *source.geometry();

    let info = json!({
        "file": path,
        "geometry": geometry,
        "layout": geometry.format().layout(),
        "planes": geometry.planes(),
        "frames": count.frames,
        "trailing_bytes": count.trailing_bytes,
    });
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
