use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Camera index (logical, before the configured vcam offset)
    #[arg(short, long, default_value_t = 0)]
    pub cam_index: usize,

    /// Process a video file instead of a camera
    #[arg(long)]
    pub video: Option<PathBuf>,

    /// Initial compute device slot (0 = CPU, 1.. = accelerators)
    #[arg(short, long, default_value_t = 0)]
    pub device: usize,

    /// List available cameras and compute devices
    #[arg(long)]
    pub list: bool,

    /// Path to the config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
