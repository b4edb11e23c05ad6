//! Nested, margin-blended image stack sampled by the frame renderer.

use std::sync::Arc;

use crate::{
    engine::Raster,
    foundation::{
        core::Resampling,
        error::{ZoomError, ZoomResult},
    },
    ops::{crop_margin, paste_centered, resize_scale, zoom_crop},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PyramidConfig {
    /// Pixels trimmed from every edge of an inner image before it is blended in.
    pub margin: u32,
    /// Scale between consecutive nesting levels; must exceed 1.
    pub zoom: f64,
    pub filter: Resampling,
}

impl PyramidConfig {
    pub fn validate(&self) -> ZoomResult<()> {
        if !self.zoom.is_finite() || self.zoom <= 1.0 {
            return Err(ZoomError::config(format!(
                "zoom ratio must be greater than 1, got {}",
                self.zoom
            )));
        }
        Ok(())
    }
}

/// Immutable stack of composites, one per input image, shared read-only by frame workers.
///
/// Layer 0 and layer 1 are the same composite: layer `i` (for `i >= 1`) holds the level
/// `i - 1` composite, which the sampler zooms into by up to one `zoom` step.
#[derive(Debug)]
pub struct ZoomPyramid<R> {
    layers: Vec<Arc<R>>,
    zoom: f64,
    margin: u32,
}

impl<R: Raster> ZoomPyramid<R> {
    /// `images` are ordered outermost first.
    #[tracing::instrument(skip(images), fields(count = images.len()))]
    pub fn build(images: Vec<R>, cfg: &PyramidConfig) -> ZoomResult<Self> {
        cfg.validate()?;
        validate_inputs(&images, cfg.margin)?;

        tracing::info!("blending images");
        let blended = blend_margins(images, cfg)?;
        let layers = align_levels(blended, cfg)?;

        Ok(Self {
            layers,
            zoom: cfg.zoom,
            margin: cfg.margin,
        })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layer(&self, idx: usize) -> Option<&R> {
        self.layers.get(idx).map(Arc::as_ref)
    }

    pub fn layers(&self) -> impl Iterator<Item = &R> {
        self.layers.iter().map(Arc::as_ref)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// Number of zoom steps between the outermost and innermost image.
    pub fn num_steps(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }
}

fn validate_inputs<R: Raster>(images: &[R], margin: u32) -> ZoomResult<()> {
    if images.len() < 2 {
        return Err(ZoomError::config(format!(
            "at least two images are required to create a zoom video, got {}",
            images.len()
        )));
    }
    for (idx, img) in images.iter().enumerate() {
        let min_side = img.width().min(img.height());
        if u64::from(margin) * 2 >= u64::from(min_side) {
            return Err(ZoomError::geometry(format!(
                "margin of {margin}px must be below half the smaller side of image {idx} ({}x{})",
                img.width(),
                img.height()
            )));
        }
    }
    Ok(())
}

/// First pass, outermost pair first: each inner image keeps its margin-trimmed center and
/// takes its border from the zoomed previous composite.
pub fn blend_margins<R: Raster>(mut images: Vec<R>, cfg: &PyramidConfig) -> ZoomResult<Vec<R>> {
    let offset = i64::from(cfg.margin);
    for i in 1..images.len() {
        let inner = crop_margin(&images[i], cfg.margin)?;
        let mut composite = zoom_crop(&images[i - 1], cfg.zoom, cfg.filter)?;
        composite.paste(&inner, offset, offset);
        images[i] = composite;
    }
    Ok(images)
}

// Second pass, innermost pair first: upscale every composite by `zoom`, then fold each level
// (shrunk back by `1 / zoom`) into the center of its parent.
fn align_levels<R: Raster>(images: Vec<R>, cfg: &PyramidConfig) -> ZoomResult<Vec<Arc<R>>> {
    let mut levels = images
        .iter()
        .map(|img| resize_scale(img, cfg.zoom, cfg.filter))
        .collect::<ZoomResult<Vec<_>>>()?;
    drop(images);

    for i in (1..levels.len()).rev() {
        let inner = resize_scale(&levels[i], 1.0 / cfg.zoom, cfg.filter)?;
        paste_centered(&mut levels[i - 1], &inner);
    }

    // The innermost level only survives through its parent.
    levels.pop();
    let mut layers = Vec::with_capacity(levels.len() + 1);
    for (idx, level) in levels.into_iter().enumerate() {
        let level = Arc::new(level);
        if idx == 0 {
            layers.push(Arc::clone(&level));
        }
        layers.push(level);
    }
    Ok(layers)
}
