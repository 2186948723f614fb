//! Where the finished image goes: the e-paper panel or a preview file.

use image::{GrayImage, Luma, RgbaImage, imageops};
use log::{error, info};
use std::{fmt::Debug, path::PathBuf};
use thiserror::Error;

use crate::Config;

#[cfg(feature = "epd")]
pub mod epd;

const LIGHT: Luma<u8> = Luma([255]);

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Display driver unavailable: {0}")]
    DriverUnavailable(String),

    #[error("Initializing display failed: {0}")]
    Init(String),

    #[error("Failed to display image: {0}")]
    Update(String),

    #[error("Failed to write preview image {}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The capabilities the pipeline needs from a physical panel.
pub trait DisplayDriver: Debug {
    fn init(&mut self) -> Result<(), OutputError>;

    fn clear(&mut self) -> Result<(), OutputError>;

    /// Panel size in pixels as `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Packs a single-bit canvas into the panel's frame buffer layout.
    ///
    /// The default packs rows MSB first with 1 for light pixels.
    fn buffer(&self, canvas: &GrayImage) -> Vec<u8> {
        pack_rows(canvas, |px| px[0] >= 128)
    }

    /// Blocks until the panel has finished refreshing.
    fn display(&mut self, buffer: &[u8]) -> Result<(), OutputError>;
}

#[derive(Debug)]
pub enum OutputSink {
    Device(Box<dyn DisplayDriver>),
    File {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

impl OutputSink {
    /// Chooses the device or preview variant once, from configuration.
    pub fn from_config(config: &Config, width: u32, height: u32) -> Result<Self, OutputError> {
        if !config.display.update_display {
            return Ok(OutputSink::File {
                path: config.display.preview_path.clone(),
                width,
                height,
            });
        }

        device_driver().map(OutputSink::Device)
    }

    pub fn present(&mut self, image: &RgbaImage) -> Result<(), OutputError> {
        match self {
            OutputSink::Device(driver) => show_on_device(driver.as_mut(), image),
            OutputSink::File {
                path,
                width,
                height,
            } => {
                let canvas = to_single_bit(image, *width, *height);
                canvas.save(&*path).map_err(|source| {
                    let err = OutputError::Save {
                        path: path.clone(),
                        source,
                    };
                    error!("Failed output: {err}");
                    err
                })?;
                info!("Preview image written to {}.", path.display());
                Ok(())
            }
        }
    }
}

#[cfg(feature = "epd")]
fn device_driver() -> Result<Box<dyn DisplayDriver>, OutputError> {
    Ok(Box::new(epd::Epd7in5V2::default()))
}

#[cfg(not(feature = "epd"))]
fn device_driver() -> Result<Box<dyn DisplayDriver>, OutputError> {
    Err(OutputError::DriverUnavailable(
        "built without the `epd` feature; rebuild with `--features epd` or disable UPDATE_DISPLAY"
            .to_string(),
    ))
}

fn show_on_device(driver: &mut dyn DisplayDriver, image: &RgbaImage) -> Result<(), OutputError> {
    driver.init()?;
    driver.clear()?;

    let (width, height) = driver.size();
    let canvas = to_single_bit(image, width, height);
    let buffer = driver.buffer(&canvas);
    driver.display(&buffer)?;

    info!("Image displayed on e-paper successfully.");
    Ok(())
}

/// Pastes `image` at the origin of a light `width` x `height` canvas and
/// dithers it down to pure black and white.
pub fn to_single_bit(image: &RgbaImage, width: u32, height: u32) -> GrayImage {
    let mut gray = imageops::grayscale(image);
    imageops::dither(&mut gray, &imageops::BiLevel);

    let mut canvas = GrayImage::from_pixel(width, height, LIGHT);
    imageops::replace(&mut canvas, &gray, 0, 0);
    canvas
}

/// Packs rows eight pixels to a byte, most significant bit first, padding each
/// row to a whole byte.
pub fn pack_rows<F>(canvas: &GrayImage, is_set: F) -> Vec<u8>
where
    F: Fn(&Luma<u8>) -> bool,
{
    let (width, height) = canvas.dimensions();
    let stride = width.div_ceil(8) as usize;
    let mut buffer = vec![0u8; stride * height as usize];

    for (x, y, px) in canvas.enumerate_pixels() {
        if is_set(px) {
            let idx = y as usize * stride + x as usize / 8;
            buffer[idx] |= 0x80 >> (x % 8);
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Calls {
        init: usize,
        clear: usize,
        frames: Vec<Vec<u8>>,
    }

    #[derive(Debug)]
    struct FakePanel {
        width: u32,
        height: u32,
        fail_init: bool,
        calls: Arc<Mutex<Calls>>,
    }

    impl FakePanel {
        fn new(width: u32, height: u32) -> (Self, Arc<Mutex<Calls>>) {
            let calls = Arc::new(Mutex::new(Calls::default()));
            let panel = Self {
                width,
                height,
                fail_init: false,
                calls: Arc::clone(&calls),
            };
            (panel, calls)
        }
    }

    impl DisplayDriver for FakePanel {
        fn init(&mut self) -> Result<(), OutputError> {
            if self.fail_init {
                return Err(OutputError::Init("no panel on SPI bus".into()));
            }
            self.calls.lock().unwrap().init += 1;
            Ok(())
        }

        fn clear(&mut self) -> Result<(), OutputError> {
            self.calls.lock().unwrap().clear += 1;
            Ok(())
        }

        fn size(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn display(&mut self, buffer: &[u8]) -> Result<(), OutputError> {
            self.calls.lock().unwrap().frames.push(buffer.to_vec());
            Ok(())
        }
    }

    fn black_square(size: u32) -> RgbaImage {
        RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn single_bit_canvas_is_light_outside_the_image() {
        let canvas = to_single_bit(&black_square(4), 10, 6);

        assert_eq!(canvas.dimensions(), (10, 6));
        assert_eq!(canvas.get_pixel(0, 0)[0], 0);
        assert_eq!(canvas.get_pixel(3, 3)[0], 0);
        assert_eq!(canvas.get_pixel(4, 0)[0], 255);
        assert_eq!(canvas.get_pixel(9, 5)[0], 255);
    }

    #[test]
    fn oversized_image_is_cropped_to_the_canvas() {
        let canvas = to_single_bit(&black_square(20), 8, 8);
        assert_eq!(canvas.dimensions(), (8, 8));
        assert!(canvas.pixels().all(|px| px[0] == 0));
    }

    #[test]
    fn rows_pack_msb_first_and_pad_to_bytes() {
        let mut canvas = GrayImage::from_pixel(10, 2, Luma([0]));
        canvas.put_pixel(0, 0, LIGHT);
        canvas.put_pixel(9, 0, LIGHT);
        canvas.put_pixel(7, 1, LIGHT);

        let buffer = pack_rows(&canvas, |px| px[0] >= 128);
        assert_eq!(buffer, vec![0b1000_0000, 0b0100_0000, 0b0000_0001, 0b0000_0000]);
    }

    #[test]
    fn device_variant_inits_clears_and_displays_once() {
        let (panel, calls) = FakePanel::new(16, 4);
        let mut sink = OutputSink::Device(Box::new(panel));

        sink.present(&black_square(8)).expect("display must succeed");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.init, 1);
        assert_eq!(calls.clear, 1);
        assert_eq!(calls.frames.len(), 1);
        // 16 px wide: left byte black (0), right byte light (1s).
        assert_eq!(&calls.frames[0][..2], &[0x00, 0xFF]);
        assert_eq!(calls.frames[0].len(), 2 * 4);
    }

    #[test]
    fn device_init_failure_is_fatal_and_nothing_is_drawn() {
        let (mut panel, calls) = FakePanel::new(16, 4);
        panel.fail_init = true;
        let mut sink = OutputSink::Device(Box::new(panel));

        let err = sink.present(&black_square(8)).unwrap_err();
        assert!(matches!(err, OutputError::Init(_)));
        assert!(calls.lock().unwrap().frames.is_empty());
    }

    #[test]
    fn file_variant_writes_a_panel_sized_preview() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.png");
        let mut sink = OutputSink::File {
            path: path.clone(),
            width: 800,
            height: 480,
        };

        sink.present(&black_square(100)).expect("preview must be written");

        let written = image::open(&path).unwrap().to_luma8();
        assert_eq!(written.dimensions(), (800, 480));
        assert_eq!(written.get_pixel(50, 50)[0], 0);
        assert_eq!(written.get_pixel(700, 400)[0], 255);
    }

    #[test]
    fn file_write_failure_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = OutputSink::File {
            path: dir.path().join("missing").join("test.png"),
            width: 800,
            height: 480,
        };

        let err = sink.present(&black_square(10)).unwrap_err();
        assert!(matches!(err, OutputError::Save { .. }));
    }

    #[test]
    fn preview_is_chosen_when_display_updates_are_off() {
        let cfg = Config::default();
        let sink = OutputSink::from_config(&cfg, 800, 480).unwrap();
        assert!(matches!(sink, OutputSink::File { width: 800, height: 480, .. }));
    }

    #[cfg(not(feature = "epd"))]
    #[test]
    fn device_variant_needs_the_epd_feature() {
        let mut cfg = Config::default();
        cfg.display.update_display = true;

        let err = OutputSink::from_config(&cfg, 800, 480).unwrap_err();
        assert!(matches!(err, OutputError::DriverUnavailable(_)));
    }
}
