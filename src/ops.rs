//! Geometric operations composed from the [`Raster`] primitives.

use crate::{
    engine::{CropRect, Raster},
    foundation::{
        core::Resampling,
        error::{ZoomError, ZoomResult},
    },
};

/// Scale `img` up by `zoom`, then crop the center back to the original size.
pub fn zoom_crop<R: Raster>(img: &R, zoom: f64, filter: Resampling) -> ZoomResult<R> {
    let (w, h) = (img.width(), img.height());
    let zw = scaled(w, zoom)?;
    let zh = scaled(h, zoom)?;
    let left = (i64::from(zw) - i64::from(w)) / 2;
    let top = (i64::from(zh) - i64::from(h)) / 2;
    let rect = CropRect::from_corners(left, top, left + i64::from(w), top + i64::from(h))
        .map_err(|_| {
            ZoomError::geometry(format!(
                "zoom {zoom} on a {w}x{h} image gives a degenerate crop of {zw}x{zh}"
            ))
        })?;
    img.resize(zw, zh, filter)?.crop(rect)
}

/// Uniformly rescale `img` by `scale`, truncating the target size.
pub fn resize_scale<R: Raster>(img: &R, scale: f64, filter: Resampling) -> ZoomResult<R> {
    let w = scaled(img.width(), scale)?;
    let h = scaled(img.height(), scale)?;
    img.resize(w, h, filter)
}

/// Remove `margin` pixels from all four edges.
pub fn crop_margin<R: Raster>(img: &R, margin: u32) -> ZoomResult<R> {
    let (w, h) = (i64::from(img.width()), i64::from(img.height()));
    let m = i64::from(margin);
    let rect = CropRect::from_corners(m, m, w - m, h - m).map_err(|_| {
        ZoomError::geometry(format!(
            "margin of {margin}px does not fit a {w}x{h} image (must be below half the smaller side)"
        ))
    })?;
    img.crop(rect)
}

/// Paste `src` so that its center lands on the center of `dst`.
pub fn paste_centered<R: Raster>(dst: &mut R, src: &R) {
    let x = (i64::from(dst.width()) - i64::from(src.width())) / 2;
    let y = (i64::from(dst.height()) - i64::from(src.height())) / 2;
    dst.paste(src, x, y);
}

fn scaled(v: u32, factor: f64) -> ZoomResult<u32> {
    let out = f64::from(v) * factor;
    if !out.is_finite() || out < 1.0 || out > f64::from(u32::MAX) {
        return Err(ZoomError::geometry(format!(
            "scaling {v}px by {factor} gives an unusable size {out}"
        )));
    }
    Ok(out as u32)
}
