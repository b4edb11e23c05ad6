use std::path::Path;

use anyhow::Context as _;
use image::{RgbaImage, imageops::FilterType};

use crate::{
    engine::{CropRect, Raster, ensure_supported_image},
    foundation::{
        core::Resampling,
        error::{ZoomError, ZoomResult},
    },
};

/// Straight-alpha RGBA8 buffer using the `image` crate's resamplers.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbaRaster(RgbaImage);

impl RgbaRaster {
    pub fn from_image(img: RgbaImage) -> Self {
        Self(img)
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.0
    }
}

fn filter_type(filter: Resampling) -> FilterType {
    match filter {
        Resampling::Nearest => FilterType::Nearest,
        Resampling::Box | Resampling::Bilinear => FilterType::Triangle,
        Resampling::Hamming => FilterType::Gaussian,
        Resampling::Bicubic => FilterType::CatmullRom,
        Resampling::Lanczos => FilterType::Lanczos3,
    }
}

impl Raster for RgbaRaster {
    fn load(path: &Path) -> ZoomResult<Self> {
        ensure_supported_image(path)?;
        let img = image::open(path)
            .with_context(|| format!("decode image '{}'", path.display()))?
            .to_rgba8();
        Ok(Self(img))
    }

    fn save(&self, path: &Path) -> ZoomResult<()> {
        self.0
            .save(path)
            .with_context(|| format!("write image '{}'", path.display()))?;
        Ok(())
    }

    fn resize(&self, width: u32, height: u32, filter: Resampling) -> ZoomResult<Self> {
        if width == 0 || height == 0 {
            return Err(ZoomError::geometry(format!(
                "cannot resize {}x{} image to {width}x{height}",
                self.0.width(),
                self.0.height()
            )));
        }
        Ok(Self(image::imageops::resize(
            &self.0,
            width,
            height,
            filter_type(filter),
        )))
    }

    fn crop(&self, rect: CropRect) -> ZoomResult<Self> {
        rect.check_within(self.0.width(), self.0.height())?;
        Ok(Self(
            image::imageops::crop_imm(&self.0, rect.x, rect.y, rect.width, rect.height)
                .to_image(),
        ))
    }

    fn paste(&mut self, src: &Self, x: i64, y: i64) {
        image::imageops::replace(&mut self.0, &src.0, x, y);
    }

    fn width(&self) -> u32 {
        self.0.width()
    }

    fn height(&self) -> u32 {
        self.0.height()
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaRaster {
        RgbaRaster::from_image(RgbaImage::from_pixel(w, h, Rgba(px)))
    }

    #[test]
    fn crop_extracts_exact_pixels() {
        let img = RgbaImage::from_fn(8, 8, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let r = RgbaRaster::from_image(img);
        let c = r
            .crop(CropRect {
                x: 2,
                y: 3,
                width: 4,
                height: 2,
            })
            .unwrap();
        assert_eq!((c.width(), c.height()), (4, 2));
        assert_eq!(c.as_image().get_pixel(0, 0), &Rgba([2, 3, 0, 255]));
        assert_eq!(c.as_image().get_pixel(3, 1), &Rgba([5, 4, 0, 255]));
    }

    #[test]
    fn crop_outside_bounds_is_a_geometry_error() {
        let r = solid(4, 4, [0, 0, 0, 255]);
        let err = r
            .crop(CropRect {
                x: 2,
                y: 2,
                width: 4,
                height: 4,
            })
            .unwrap_err();
        assert!(matches!(err, ZoomError::Geometry(_)));
    }

    #[test]
    fn paste_clips_to_destination() {
        let mut dst = solid(4, 4, [0, 0, 0, 255]);
        let src = solid(3, 3, [255, 0, 0, 255]);
        dst.paste(&src, 2, 2);
        assert_eq!(dst.as_image().get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(dst.as_image().get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn resize_rejects_empty_targets() {
        let r = solid(4, 4, [0, 0, 0, 255]);
        assert!(r.resize(0, 4, Resampling::Lanczos).is_err());
        let big = r.resize(8, 6, Resampling::Bicubic).unwrap();
        assert_eq!((big.width(), big.height()), (8, 6));
    }

    #[test]
    fn load_rejects_unsupported_extensions_before_io() {
        let err = RgbaRaster::load(Path::new("does/not/exist.bmp")).unwrap_err();
        assert!(matches!(err, ZoomError::UnsupportedFormat(_)));
    }
}
