//! Lays a [`WeatherRecord`] out on the template art.
//!
//! Composition happens in two steps. [`Composer::plan`] decides what text goes
//! where, including which banners are drawn and in what order; rendering then
//! paints that [`Scene`] onto the template. Banners share one rectangle and are
//! painted in order, so the last one is the one left visible.

use ab_glyph::{Font, FontVec, PxScale};
use chrono::{Datelike, NaiveDateTime};
use image::RgbaImage;
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_text_mut},
    rect::Rect,
};
use log::{debug, info};
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::{
    Config,
    config::weekday_in,
    layout::{Ink, Layout, TextSlot},
    model::{UnitSystem, WeatherRecord},
};

pub const TRASH_REMINDER: &str = "TAKE OUT TRASH TODAY!";

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("Failed to load template image {}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to load icon {}", path.display())]
    Icon {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to read font {}", path.display())]
    FontRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Font {} is not a usable TrueType/OpenType font", path.display())]
    FontInvalid { path: PathBuf },
}

/// Draws a line of text onto the canvas.
pub trait Typeface {
    fn draw(&self, canvas: &mut RgbaImage, slot: &TextSlot, text: &str);
}

/// A TrueType face (or one face of a collection) rasterized with `imageproc`.
pub struct TrueTypeFace {
    font: FontVec,
}

impl fmt::Debug for TrueTypeFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrueTypeFace")
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}

impl TrueTypeFace {
    pub fn load(path: &Path) -> Result<Self, CompositionError> {
        let data = fs::read(path).map_err(|source| CompositionError::FontRead {
            path: path.to_path_buf(),
            source,
        })?;

        let font = FontVec::try_from_vec_and_index(data, 0).map_err(|_| {
            CompositionError::FontInvalid {
                path: path.to_path_buf(),
            }
        })?;

        Ok(Self { font })
    }

    /// `size` is pixels per em; glyph scale is expressed as line height.
    fn scale(&self, size: f32) -> PxScale {
        let units_per_em = self.font.units_per_em().unwrap_or(1.0);
        PxScale::from(size * self.font.height_unscaled() / units_per_em)
    }
}

impl Typeface for TrueTypeFace {
    fn draw(&self, canvas: &mut RgbaImage, slot: &TextSlot, text: &str) {
        draw_text_mut(
            canvas,
            slot.ink.rgba(),
            slot.x,
            slot.y,
            self.scale(slot.size),
            &self.font,
            text,
        );
    }
}

/// File locations of the background art, icons and font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assets {
    pub template: PathBuf,
    pub icon_dir: PathBuf,
    pub font: PathBuf,
}

impl Assets {
    pub fn under(root: &Path) -> Self {
        Self {
            template: root.join("pic").join("template.png"),
            icon_dir: root.join("pic").join("icon"),
            font: root.join("font").join("Font.ttc"),
        }
    }

    /// Path of the icon for `code`, if one exists on disk.
    pub fn icon(&self, code: &str) -> Option<PathBuf> {
        if code.is_empty() || code.contains(['/', '\\', '.']) {
            return None;
        }
        let path = self.icon_dir.join(format!("{code}.png"));
        path.is_file().then_some(path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub slot: TextSlot,
    pub text: String,
}

impl TextItem {
    fn new(slot: TextSlot, text: impl Into<String>) -> Self {
        Self {
            slot,
            text: text.into(),
        }
    }
}

/// Everything that will be painted for one run, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub icon_code: String,
    pub labels: Vec<TextItem>,
    pub banners: Vec<TextItem>,
}

impl Scene {
    /// The banner text left on screen after all banners are painted.
    pub fn visible_banner(&self) -> Option<&str> {
        self.banners.last().map(|b| b.text.as_str())
    }
}

#[derive(Debug)]
pub struct Composer<T = TrueTypeFace> {
    assets: Assets,
    typeface: T,
    layout: Layout,
    units: UnitSystem,
    trash_days: Vec<u8>,
}

impl Composer<TrueTypeFace> {
    /// Loads the font up front so a broken install fails before any fetch.
    pub fn from_config(config: &Config) -> Result<Self, CompositionError> {
        let assets = Assets::under(&config.display.assets_dir);
        let typeface = TrueTypeFace::load(&assets.font)?;
        Ok(Composer::new(
            assets,
            typeface,
            config.units,
            config.trash_days.clone(),
        ))
    }
}

impl<T: Typeface> Composer<T> {
    pub fn new(assets: Assets, typeface: T, units: UnitSystem, trash_days: Vec<u8>) -> Self {
        Self {
            assets,
            typeface,
            layout: Layout::default(),
            units,
            trash_days,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn plan(&self, record: &WeatherRecord, now: NaiveDateTime) -> Scene {
        let l = &self.layout;
        let deg = self.units.temperature_suffix();

        let labels = vec![
            TextItem::new(l.condition, format!("Now: {}", record.condition_description)),
            TextItem::new(
                l.precipitation,
                format!("Precip: {:.0}%", record.precipitation_probability_percent),
            ),
            TextItem::new(l.temperature, format!("{:.0}{deg}", record.temperature_current)),
            TextItem::new(l.feels_like, format!("Feels like: {:.0}{deg}", record.feels_like)),
            TextItem::new(l.high, format!("High: {:.0}{deg}", record.temperature_max)),
            TextItem::new(l.low, format!("Low: {:.0}{deg}", record.temperature_min)),
            TextItem::new(l.humidity, format!("Humidity: {:.0}%", record.humidity_percent)),
            TextItem::new(
                l.wind,
                format!("Wind: {:.1} {}", record.wind_speed, self.units.speed_suffix()),
            ),
            TextItem::new(l.updated_label, "UPDATED"),
            TextItem::new(l.updated_time, now.format("%H:%M").to_string()),
        ];

        // Alerts are pushed last and so paint over the trash reminder.
        let mut banners = Vec::new();
        if weekday_in(&self.trash_days, now.weekday()) {
            banners.push(TextItem::new(l.banner_text, TRASH_REMINDER));
        }
        if let Some(alert) = record.alert_banner() {
            banners.push(TextItem::new(l.banner_text, alert));
        }

        Scene {
            icon_code: record.condition_icon_code.clone(),
            labels,
            banners,
        }
    }

    /// Composes the full image on top of a freshly loaded template.
    pub fn compose(
        &self,
        record: &WeatherRecord,
        now: NaiveDateTime,
    ) -> Result<RgbaImage, CompositionError> {
        let mut canvas = image::open(&self.assets.template)
            .map_err(|source| CompositionError::Template {
                path: self.assets.template.clone(),
                source,
            })?
            .to_rgba8();

        let scene = self.plan(record, now);
        self.paste_icon(&mut canvas, &scene.icon_code)?;
        self.render(&mut canvas, &scene);

        info!("Display image generated successfully.");
        Ok(canvas)
    }

    fn paste_icon(&self, canvas: &mut RgbaImage, code: &str) -> Result<(), CompositionError> {
        let Some(path) = self.assets.icon(code) else {
            debug!("No icon for condition code '{code}', skipping");
            return Ok(());
        };

        let icon = image::open(&path)
            .map_err(|source| CompositionError::Icon { path, source })?
            .to_rgba8();

        let (x, y) = self.layout.icon;
        image::imageops::replace(canvas, &icon, x, y);
        Ok(())
    }

    fn render(&self, canvas: &mut RgbaImage, scene: &Scene) {
        for label in &scene.labels {
            self.typeface.draw(canvas, &label.slot, &label.text);
        }

        let banner = self.layout.banner;
        let area = Rect::at(banner.left, banner.top).of_size(banner.width(), banner.height());
        for item in &scene.banners {
            draw_filled_rect_mut(canvas, area, Ink::Black.rgba());
            self.typeface.draw(canvas, &item.slot, &item.text);
        }
    }
}
