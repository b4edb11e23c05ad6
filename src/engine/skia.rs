use std::path::Path;

use anyhow::Context as _;
use tiny_skia::{
    BlendMode, FilterQuality, IntRect, IntSize, Pixmap, PixmapPaint, Transform,
};

use crate::{
    engine::{CropRect, Raster, ensure_supported_image},
    foundation::{
        core::Resampling,
        error::{ZoomError, ZoomResult},
    },
};

/// Premultiplied RGBA8 buffer resampled through `tiny-skia`'s pixmap pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct SkiaRaster(Pixmap);

impl SkiaRaster {
    pub fn from_pixmap(pixmap: Pixmap) -> Self {
        Self(pixmap)
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.0
    }

    /// Build from straight-alpha RGBA8 rows.
    pub fn from_rgba8(width: u32, height: u32, mut rgba: Vec<u8>) -> ZoomResult<Self> {
        premultiply_rgba8_in_place(&mut rgba);
        let size = IntSize::from_wh(width, height)
            .ok_or_else(|| ZoomError::geometry(format!("invalid pixmap size {width}x{height}")))?;
        let pixmap = Pixmap::from_vec(rgba, size).ok_or_else(|| {
            ZoomError::geometry(format!(
                "pixel data does not match pixmap size {width}x{height}"
            ))
        })?;
        Ok(Self(pixmap))
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_rgba_image(&self) -> ZoomResult<image::RgbaImage> {
        let (width, height) = (self.0.width(), self.0.height());
        let out = demultiplied_rgba8(self.0.pixels());
        image::RgbaImage::from_raw(width, height, out).ok_or_else(|| {
            ZoomError::geometry(format!(
                "pixel data does not match image size {width}x{height}"
            ))
        })
    }

    fn empty(width: u32, height: u32) -> ZoomResult<Pixmap> {
        Pixmap::new(width, height).ok_or_else(|| {
            ZoomError::geometry(format!("cannot allocate a {width}x{height} pixmap"))
        })
    }
}

fn quality(filter: Resampling) -> FilterQuality {
    match filter {
        Resampling::Nearest => FilterQuality::Nearest,
        Resampling::Box | Resampling::Bilinear => FilterQuality::Bilinear,
        Resampling::Hamming | Resampling::Bicubic | Resampling::Lanczos => FilterQuality::Bicubic,
    }
}

fn demultiplied_rgba8(pixels: &[tiny_skia::PremultipliedColorU8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixels.len() * 4);
    for px in pixels {
        let c = px.demultiply();
        out.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

impl Raster for SkiaRaster {
    fn load(path: &Path) -> ZoomResult<Self> {
        ensure_supported_image(path)?;
        let rgba = image::open(path)
            .with_context(|| format!("decode image '{}'", path.display()))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba8(width, height, rgba.into_raw())
    }

    fn save(&self, path: &Path) -> ZoomResult<()> {
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png {
            self.0
                .save_png(path)
                .map_err(|e| anyhow::anyhow!("write png '{}': {e}", path.display()))?;
        } else {
            self.to_rgba_image()?
                .save(path)
                .with_context(|| format!("write image '{}'", path.display()))?;
        }
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
        let mut out = Self::empty(width, height)?;
        let sx = width as f32 / self.0.width() as f32;
        let sy = height as f32 / self.0.height() as f32;
        let paint = PixmapPaint {
            blend_mode: BlendMode::Source,
            quality: quality(filter),
            ..PixmapPaint::default()
        };
        out.draw_pixmap(
            0,
            0,
            self.0.as_ref(),
            &paint,
            Transform::from_scale(sx, sy),
            None,
        );
        Ok(Self(out))
    }

    fn crop(&self, rect: CropRect) -> ZoomResult<Self> {
        rect.check_within(self.0.width(), self.0.height())?;
        let bad = || {
            ZoomError::geometry(format!(
                "crop {}x{}+{}+{} is not representable",
                rect.width, rect.height, rect.x, rect.y
            ))
        };
        let x = i32::try_from(rect.x).map_err(|_| bad())?;
        let y = i32::try_from(rect.y).map_err(|_| bad())?;
        let r = IntRect::from_xywh(x, y, rect.width, rect.height).ok_or_else(bad)?;
        self.0.clone_rect(r).map(Self).ok_or_else(bad)
    }

    fn paste(&mut self, src: &Self, x: i64, y: i64) {
        let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
            return;
        };
        let paint = PixmapPaint {
            blend_mode: BlendMode::Source,
            quality: FilterQuality::Nearest,
            ..PixmapPaint::default()
        };
        self.0
            .draw_pixmap(x, y, src.0.as_ref(), &paint, Transform::identity(), None);
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
    use super::*;

    fn gradient(w: u32, h: u32) -> SkiaRaster {
        let mut rgba = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                rgba.extend_from_slice(&[x as u8 * 10, y as u8 * 10, 7, 255]);
            }
        }
        SkiaRaster::from_rgba8(w, h, rgba).unwrap()
    }

    #[test]
    fn crop_copies_the_requested_window() {
        let r = gradient(8, 8);
        let c = r
            .crop(CropRect {
                x: 1,
                y: 2,
                width: 3,
                height: 3,
            })
            .unwrap();
        assert_eq!((c.width(), c.height()), (3, 3));
        let img = c.to_rgba_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 7, 255]);
        assert_eq!(img.get_pixel(2, 2).0, [30, 40, 7, 255]);
    }

    #[test]
    fn paste_is_pixel_exact_for_opaque_sources() {
        let mut dst = gradient(8, 8);
        let src = gradient(4, 4);
        dst.paste(&src, 2, 2);
        let img = dst.to_rgba_image().unwrap();
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 7, 255]);
        assert_eq!(img.get_pixel(5, 5).0, [30, 30, 7, 255]);
        assert_eq!(img.get_pixel(6, 6).0, [60, 60, 7, 255]);
    }

    #[test]
    fn resize_produces_requested_size() {
        let r = gradient(8, 4);
        let out = r.resize(16, 8, Resampling::Bilinear).unwrap();
        assert_eq!((out.width(), out.height()), (16, 8));
        assert!(r.resize(0, 8, Resampling::Bilinear).is_err());
    }

    #[test]
    fn to_rgba_image_demultiplies_translucent_pixels() {
        let r = SkiaRaster::from_rgba8(2, 1, vec![200, 100, 0, 255, 255, 0, 0, 128]).unwrap();
        let img = r.to_rgba_image().unwrap();
        assert_eq!((img.width(), img.height()), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [200, 100, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 0, 0, 128]);
    }

    #[test]
    fn short_pixel_data_is_a_geometry_error() {
        let err = SkiaRaster::from_rgba8(4, 4, vec![0; 12]).unwrap_err();
        assert!(matches!(err, ZoomError::Geometry(_)));
    }

    #[test]
    fn premultiply_zeroes_transparent_pixels() {
        let mut px = vec![200, 100, 50, 0, 255, 255, 255, 128];
        premultiply_rgba8_in_place(&mut px);
        assert_eq!(&px[..4], &[0, 0, 0, 0]);
        assert_eq!(px[4], 128);
    }
}
