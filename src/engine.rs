//! Pixel-buffer capability interface.
//!
//! The pyramid builder, sampler and renderer are generic over [`Raster`]; a job picks one
//! concrete buffer type through [`EngineKind`] when it starts.

pub mod image_rs;
pub mod skia;

use std::{fmt, path::Path, str::FromStr};

use crate::foundation::{
    core::Resampling,
    error::{ZoomError, ZoomResult},
};

pub use image_rs::RgbaRaster;
pub use skia::SkiaRaster;

/// File extensions accepted as input images (lowercase, without the dot).
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Axis-aligned crop rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Build a rectangle from signed corner coordinates, rejecting empty or inverted boxes.
    pub fn from_corners(left: i64, top: i64, right: i64, bottom: i64) -> ZoomResult<Self> {
        if left < 0 || top < 0 || right <= left || bottom <= top {
            return Err(ZoomError::geometry(format!(
                "degenerate crop box ({left}, {top}, {right}, {bottom})"
            )));
        }
        let conv = |v: i64| {
            u32::try_from(v)
                .map_err(|_| ZoomError::geometry(format!("crop coordinate {v} out of range")))
        };
        Ok(Self {
            x: conv(left)?,
            y: conv(top)?,
            width: conv(right - left)?,
            height: conv(bottom - top)?,
        })
    }

    /// Fails unless the rectangle lies fully inside a `width` x `height` image.
    pub fn check_within(self, width: u32, height: u32) -> ZoomResult<()> {
        let right = u64::from(self.x) + u64::from(self.width);
        let bottom = u64::from(self.y) + u64::from(self.height);
        if self.width == 0
            || self.height == 0
            || right > u64::from(width)
            || bottom > u64::from(height)
        {
            return Err(ZoomError::geometry(format!(
                "crop {}x{}+{}+{} does not fit inside a {width}x{height} image",
                self.width, self.height, self.x, self.y
            )));
        }
        Ok(())
    }
}

/// Operations every pixel-buffer backend provides.
///
/// `resize` and `crop` return new buffers; `paste` mutates in place and clips anything that
/// falls outside the destination.
pub trait Raster: Sized + Send + Sync {
    fn load(path: &Path) -> ZoomResult<Self>;
    fn save(&self, path: &Path) -> ZoomResult<()>;
    fn resize(&self, width: u32, height: u32, filter: Resampling) -> ZoomResult<Self>;
    fn crop(&self, rect: CropRect) -> ZoomResult<Self>;
    fn paste(&mut self, src: &Self, x: i64, y: i64);
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

/// Which [`Raster`] implementation a job renders with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// [`RgbaRaster`], backed by `image::RgbaImage`.
    #[default]
    Image,
    /// [`SkiaRaster`], backed by a premultiplied `tiny_skia::Pixmap`.
    Skia,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [Self::Image, Self::Skia];

    pub fn name(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Skia => "skia",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = ZoomError;

    fn from_str(s: &str) -> ZoomResult<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ZoomError::config(format!("unsupported image engine: '{s}'")))
    }
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

pub(crate) fn ensure_supported_image(path: &Path) -> ZoomResult<()> {
    if is_supported_image(path) {
        Ok(())
    } else {
        Err(ZoomError::UnsupportedFormat(path.to_path_buf()))
    }
}
