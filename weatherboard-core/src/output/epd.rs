//! Waveshare 7.5" V2 panel on a Raspberry Pi HAT, driven over spidev and sysfs GPIO.

use epd_waveshare::{
    epd7in5_v2::{self, Epd7in5},
    prelude::WaveshareDisplay,
};
use image::GrayImage;
use linux_embedded_hal::{
    Delay, SpidevDevice, SysfsPin,
    spidev::{SpiModeFlags, SpidevOptions},
    sysfs_gpio::Direction,
};
use log::{debug, warn};
use std::fmt;

use super::{DisplayDriver, OutputError, pack_rows};

type Panel = Epd7in5<SpidevDevice, SysfsPin, SysfsPin, SysfsPin, Delay>;

/// BCM pin numbers and SPI device of the HAT.
#[derive(Debug, Clone)]
struct Wiring {
    spi_device: String,
    busy: u64,
    dc: u64,
    rst: u64,
}

impl Default for Wiring {
    fn default() -> Self {
        Self {
            spi_device: "/dev/spidev0.0".into(),
            busy: 24,
            dc: 25,
            rst: 17,
        }
    }
}

struct Hardware {
    spi: SpidevDevice,
    delay: Delay,
    panel: Panel,
}

#[derive(Default)]
pub struct Epd7in5V2 {
    wiring: Wiring,
    hardware: Option<Hardware>,
}

impl fmt::Debug for Epd7in5V2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Epd7in5V2")
            .field("wiring", &self.wiring)
            .field("open", &self.hardware.is_some())
            .finish()
    }
}

impl Epd7in5V2 {
    fn hardware(&mut self) -> Result<&mut Hardware, OutputError> {
        self.hardware
            .as_mut()
            .ok_or_else(|| OutputError::Update("display used before init".into()))
    }
}

fn pin(number: u64, direction: Direction) -> Result<SysfsPin, OutputError> {
    let pin = SysfsPin::new(number);
    pin.export()
        .and_then(|()| pin.set_direction(direction))
        .map_err(|e| OutputError::Init(format!("GPIO {number}: {e}")))?;
    Ok(pin)
}

impl DisplayDriver for Epd7in5V2 {
    fn init(&mut self) -> Result<(), OutputError> {
        let mut spi = SpidevDevice::open(&self.wiring.spi_device)
            .map_err(|e| OutputError::Init(format!("{}: {e}", self.wiring.spi_device)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| OutputError::Init(format!("configuring SPI: {e}")))?;

        let busy = pin(self.wiring.busy, Direction::In)?;
        let dc = pin(self.wiring.dc, Direction::Out)?;
        let rst = pin(self.wiring.rst, Direction::Out)?;

        let mut delay = Delay;
        let panel = Epd7in5::new(&mut spi, busy, dc, rst, &mut delay, None)
            .map_err(|e| OutputError::Init(format!("{e:?}")))?;

        debug!("E-paper panel initialized on {}", self.wiring.spi_device);
        self.hardware = Some(Hardware { spi, delay, panel });
        Ok(())
    }

    fn clear(&mut self) -> Result<(), OutputError> {
        let hw = self.hardware()?;
        hw.panel
            .clear_frame(&mut hw.spi, &mut hw.delay)
            .and_then(|()| hw.panel.display_frame(&mut hw.spi, &mut hw.delay))
            .map_err(|e| OutputError::Init(format!("clearing panel: {e:?}")))
    }

    fn size(&self) -> (u32, u32) {
        (epd7in5_v2::WIDTH, epd7in5_v2::HEIGHT)
    }

    // The V2 controller reads a set bit as black.
    fn buffer(&self, canvas: &GrayImage) -> Vec<u8> {
        pack_rows(canvas, |px| px[0] < 128)
    }

    fn display(&mut self, buffer: &[u8]) -> Result<(), OutputError> {
        let hw = self.hardware()?;
        hw.panel
            .update_and_display_frame(&mut hw.spi, buffer, &mut hw.delay)
            .map_err(|e| OutputError::Update(format!("{e:?}")))?;

        if let Err(e) = hw.panel.sleep(&mut hw.spi, &mut hw.delay) {
            warn!("Failed to put panel to sleep: {e:?}");
        }
        Ok(())
    }
}
