//! Pixel positions for everything drawn on the panel.
//!
//! Coordinates are absolute and match the background art in
//! `pic/template.png`; another panel size means another [`Layout`].

use image::Rgba;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ink {
    Black,
    White,
}

impl Ink {
    pub fn rgba(self) -> Rgba<u8> {
        match self {
            Ink::Black => Rgba([0, 0, 0, 255]),
            Ink::White => Rgba([255, 255, 255, 255]),
        }
    }
}

/// Top-left origin, size in pixels per em, and color of one text label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextSlot {
    pub x: i32,
    pub y: i32,
    pub size: f32,
    pub ink: Ink,
}

impl TextSlot {
    const fn new(x: i32, y: i32, size: f32, ink: Ink) -> Self {
        Self { x, y, size, ink }
    }
}

/// Rectangle with inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn width(&self) -> u32 {
        self.right.abs_diff(self.left) + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom.abs_diff(self.top) + 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Size of the single-bit canvas written in preview mode.
    pub width: u32,
    pub height: u32,
    pub icon: (i64, i64),
    pub condition: TextSlot,
    pub precipitation: TextSlot,
    pub temperature: TextSlot,
    pub feels_like: TextSlot,
    pub high: TextSlot,
    pub low: TextSlot,
    pub humidity: TextSlot,
    pub wind: TextSlot,
    pub updated_label: TextSlot,
    pub updated_time: TextSlot,
    /// Shared by the trash reminder and the weather alert.
    pub banner: Bounds,
    pub banner_text: TextSlot,
}

/// Waveshare 7.5" V2, 800x480.
pub const WAVESHARE_7IN5_V2: Layout = Layout {
    width: 800,
    height: 480,
    icon: (40, 15),
    condition: TextSlot::new(30, 200, 22.0, Ink::Black),
    precipitation: TextSlot::new(30, 240, 30.0, Ink::Black),
    temperature: TextSlot::new(375, 35, 160.0, Ink::Black),
    feels_like: TextSlot::new(350, 210, 50.0, Ink::Black),
    high: TextSlot::new(35, 325, 50.0, Ink::Black),
    low: TextSlot::new(35, 390, 50.0, Ink::Black),
    humidity: TextSlot::new(345, 340, 30.0, Ink::Black),
    wind: TextSlot::new(345, 400, 30.0, Ink::Black),
    updated_label: TextSlot::new(627, 330, 35.0, Ink::White),
    updated_time: TextSlot::new(627, 375, 60.0, Ink::White),
    banner: Bounds {
        left: 345,
        top: 13,
        right: 705,
        bottom: 55,
    },
    banner_text: TextSlot::new(355, 15, 30.0, Ink::White),
};

impl Default for Layout {
    fn default() -> Self {
        WAVESHARE_7IN5_V2
    }
}
