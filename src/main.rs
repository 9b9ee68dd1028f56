use std::path::Path;

use anyhow::bail;
use clap::Parser;
use colored::*;

use pose_sender::args::Args;
use pose_sender::backend::{self, device_for_index};
use pose_sender::config::AppConfig;
use pose_sender::driver::{PipelineDriver, TickOutcome, DEFAULT_TICK_PERIOD};
use pose_sender::extractor::{LandmarkExtractor, ModelPaths};
use pose_sender::output::WindowOutput;
use pose_sender::sender::UdpSender;
use pose_sender::source;

fn key_to_slot(key: minifb::Key) -> Option<usize> {
    use minifb::Key::*;
    match key {
        Key0 => Some(0),
        Key1 => Some(1),
        Key2 => Some(2),
        Key3 => Some(3),
        Key4 => Some(4),
        Key5 => Some(5),
        Key6 => Some(6),
        Key7 => Some(7),
        Key8 => Some(8),
        Key9 => Some(9),
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    // 0. Config and external enumeration
    let config = AppConfig::load(args.config.as_deref())?;
    if let Some(exe) = &config.capture.camera_enum_path {
        source::run_camera_enum(exe);
    }

    let cameras = source::list_cameras(Path::new(&config.capture.camera_list_path));
    let devices = backend::enumerate_devices();

    if args.list {
        println!("{}", "Available Cameras:".green());
        if cameras.is_empty() {
            println!("  (none found)");
        }
        for (i, name) in cameras.iter().enumerate() {
            println!("  {:<3} | {}", i, name);
        }
        println!("{}", "Available Devices:".green());
        for (i, name) in devices.iter().enumerate() {
            println!("  {:<3} | {}", i, name);
        }
        return Ok(());
    }

    // 1. Inference setup
    if args.device >= devices.len() {
        bail!(
            "device slot {} out of range ({} available)",
            args.device,
            devices.len()
        );
    }
    let device = device_for_index(args.device);
    let extractor = LandmarkExtractor::new(ModelPaths::from(&config.models), device)?;
    log::info!("inference device: {} ({})", device, devices[args.device]);

    // 2. Transmission setup
    let sender = UdpSender::new(config.network.ip.clone(), config.network.port);
    log::info!("streaming landmarks to {}", sender.endpoint());

    // 3. Pipeline driver
    let mut driver = PipelineDriver::new(
        extractor,
        sender,
        DEFAULT_TICK_PERIOD,
        (config.display.width, config.display.height),
        config.display.mirror,
    );

    let mut cam_index = args.cam_index;
    if let Some(video) = &args.video {
        driver.open_video(video)?;
    } else {
        if cameras.is_empty() {
            bail!("no cameras available; run with --video <file> or fix enumeration");
        }
        if cam_index >= cameras.len() {
            bail!("camera index {} out of range ({} available)", cam_index, cameras.len());
        }
        driver.start_camera(cam_index, config.capture.vcam_offset)?;
    }

    // 4. Preview window and loop
    let mut window = WindowOutput::new(
        "Pose Sender",
        config.display.width as usize,
        config.display.height as usize,
    )?;
    let mut hide_preview = config.display.hide_preview;

    println!(
        "Controls: [0-{}] device | [C] camera on/off | [M] mirror | [H] hide preview | [Esc] quit",
        devices.len() - 1
    );

    while window.is_open() && !window.is_key_down(minifb::Key::Escape) {
        for key in window.keys_pressed() {
            match key {
                minifb::Key::M => driver.mirror = !driver.mirror,
                minifb::Key::H => hide_preview = !hide_preview,
                minifb::Key::C => {
                    if driver.has_source() {
                        driver.stop();
                    } else if cameras.is_empty() {
                        log::warn!("no cameras available to start");
                    } else {
                        cam_index = cam_index.min(cameras.len() - 1);
                        if let Err(e) = driver.start_camera(cam_index, config.capture.vcam_offset)
                        {
                            log::error!("could not start camera {}: {}", cam_index, e);
                        }
                    }
                }
                key => {
                    if let Some(slot) = key_to_slot(key) {
                        if slot < devices.len() {
                            driver.switch_device(device_for_index(slot));
                        }
                    }
                }
            }
        }

        match driver.tick() {
            TickOutcome::Frame(frame) => {
                if hide_preview {
                    window.pump();
                } else {
                    window.present(&frame)?;
                }
            }
            TickOutcome::EndOfStream => {
                log::info!("video finished");
                window.pump();
            }
            TickOutcome::Idle | TickOutcome::Deferred | TickOutcome::Skipped => {
                window.pump();
                std::thread::sleep(std::time::Duration::from_millis(1));
            }
        }
    }

    Ok(())
}
