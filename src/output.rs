use anyhow::Result;
use image::RgbImage;

/// Preview window display sink. Presentation only: takes the annotated RGB
/// frame from the driver and blits it; all processing happened upstream.
pub struct WindowOutput {
    window: minifb::Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl WindowOutput {
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = minifb::Window::new(
            title,
            width,
            height,
            minifb::WindowOptions {
                resize: true,
                ..minifb::WindowOptions::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("failed to create window: {}", e))?;

        window.limit_update_rate(Some(std::time::Duration::from_micros(16600)));

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn is_key_down(&self, key: minifb::Key) -> bool {
        self.window.is_key_down(key)
    }

    pub fn keys_pressed(&self) -> Vec<minifb::Key> {
        self.window.get_keys_pressed(minifb::KeyRepeat::No)
    }

    /// Blit one RGB frame, following its dimensions if they changed.
    pub fn present(&mut self, frame: &RgbImage) -> Result<()> {
        let (w, h) = (frame.width() as usize, frame.height() as usize);
        if w != self.width || h != self.height {
            self.width = w;
            self.height = h;
            self.buffer.resize(w * h, 0);
        }

        for (i, pixel) in frame.pixels().enumerate() {
            let r = pixel[0] as u32;
            let g = pixel[1] as u32;
            let b = pixel[2] as u32;
            self.buffer[i] = (r << 16) | (g << 8) | b;
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| anyhow::anyhow!("window update failed: {}", e))
    }

    /// Pump window events without presenting a new frame (hidden preview,
    /// deferred ticks).
    pub fn pump(&mut self) {
        self.window.update();
    }
}
