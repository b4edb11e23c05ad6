use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context as _;
use rayon::prelude::*;

use crate::{
    engine::Raster,
    foundation::{
        core::{CancelToken, FrameIndex, Resampling},
        error::{ZoomError, ZoomResult},
    },
    ops::{crop_margin, zoom_crop},
    pyramid::ZoomPyramid,
    sampler::{FrameSample, FrameSampler},
};

/// Output resolution and filter applied to every rendered frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameTarget {
    pub width: u32,
    pub height: u32,
    pub filter: Resampling,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames the job consists of.
    pub frames_total: u64,
    /// Leading frames already present on disk and reused.
    pub frames_resumed: u64,
    /// Frames rendered by this call.
    pub frames_rendered: u64,
}

/// Render one frame from the shared pyramid.
pub fn render_frame<R: Raster>(
    pyramid: &ZoomPyramid<R>,
    sample: &FrameSample,
    target: &FrameTarget,
) -> ZoomResult<R> {
    let layer = pyramid.layer(sample.layer).ok_or_else(|| {
        ZoomError::geometry(format!(
            "frame {} selects layer {} of a {}-layer pyramid",
            sample.frame.0,
            sample.layer,
            pyramid.len()
        ))
    })?;
    match sample.crop_zoom {
        None => layer.resize(target.width, target.height, target.filter),
        Some(zoom) => zoom_crop(layer, zoom, target.filter)?.resize(
            target.width,
            target.height,
            target.filter,
        ),
    }
}

/// Worker count for a configured value: positive values are used as is, `n <= 0` means
/// "available cores minus `|n|`", never below one.
pub fn resolve_thread_count(configured: i64) -> usize {
    if configured > 0 {
        return usize::try_from(configured).unwrap_or(usize::MAX);
    }
    let available = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let offset = usize::try_from(configured.unsigned_abs()).unwrap_or(usize::MAX);
    available.saturating_sub(offset).max(1)
}

/// Length of the contiguous run of finished frames starting at frame 0.
///
/// Only the prefix is trusted: anything after the first missing frame is rendered again,
/// whether or not it exists.
pub fn resume_point(dir: &Path, num_frames: u64) -> u64 {
    (0..num_frames)
        .find(|&i| !dir.join(FrameIndex(i).file_name()).is_file())
        .unwrap_or(num_frames)
}

pub fn frame_paths(dir: &Path, num_frames: u64) -> Vec<PathBuf> {
    (0..num_frames)
        .map(|i| dir.join(FrameIndex(i).file_name()))
        .collect()
}

/// Render every frame of `sampler` into `dir`, skipping the already-finished prefix.
///
/// Frames are independent and complete in any order. Once `cancel` is set no further frame
/// starts; frames already in flight are finished and the call returns
/// [`ZoomError::Interrupted`].
#[tracing::instrument(skip_all, fields(dir = %dir.display(), threads = threads))]
pub fn render_frames<R: Raster>(
    pyramid: &ZoomPyramid<R>,
    sampler: &FrameSampler,
    target: &FrameTarget,
    dir: &Path,
    threads: usize,
    cancel: &CancelToken,
) -> ZoomResult<RenderStats> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create frame directory '{}'", dir.display()))?;

    let total = sampler.num_frames();
    let start = resume_point(dir, total);
    let mut stats = RenderStats {
        frames_total: total,
        frames_resumed: start,
        frames_rendered: 0,
    };
    if start > 0 {
        tracing::info!(resumed = start, total, "reusing frames already on disk");
    }
    if start == total {
        return Ok(stats);
    }

    let pool = build_thread_pool(threads)?;
    tracing::info!(
        frames = total - start,
        threads = pool.current_num_threads(),
        "creating frames"
    );

    let rendered = AtomicU64::new(0);
    let result = pool.install(|| {
        (start..total).into_par_iter().try_for_each(|i| {
            if cancel.is_cancelled() {
                return Err(ZoomError::Interrupted);
            }
            let idx = FrameIndex(i);
            let sample = sampler.sample(idx);
            let frame = render_frame(pyramid, &sample, target)?;
            write_frame(&frame, dir, idx)?;
            rendered.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                frame = i,
                layer = sample.layer,
                local_zoom = sample.local_zoom,
                "frame written"
            );
            Ok(())
        })
    });

    stats.frames_rendered = rendered.into_inner();
    result?;
    if cancel.is_cancelled() && stats.frames_resumed + stats.frames_rendered < total {
        return Err(ZoomError::Interrupted);
    }
    Ok(stats)
}

// Frames land under a hidden name first so a correctly named file is always complete.
fn write_frame<R: Raster>(frame: &R, dir: &Path, idx: FrameIndex) -> ZoomResult<()> {
    let final_path = dir.join(idx.file_name());
    let partial = dir.join(format!(".{:06}.partial.png", idx.0));
    let mut guard = TempFileGuard(Some(partial.clone()));
    frame.save(&partial)?;
    std::fs::rename(&partial, &final_path).with_context(|| {
        format!(
            "move '{}' into place as '{}'",
            partial.display(),
            final_path.display()
        )
    })?;
    guard.0 = None;
    Ok(())
}

struct TempFileGuard(Option<PathBuf>);

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Save each pyramid layer, trimmed by the (scaled) blend margin, for seam inspection.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn save_blend_layers<R: Raster>(
    pyramid: &ZoomPyramid<R>,
    dir: &Path,
) -> ZoomResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create inspection directory '{}'", dir.display()))?;

    let trim = (f64::from(pyramid.margin()) * pyramid.zoom()) as u32;
    let mut out = Vec::with_capacity(pyramid.len());
    for (idx, layer) in pyramid.layers().enumerate() {
        let path = dir.join(format!("blend_{idx:06}.png"));
        crop_margin(layer, trim)?.save(&path)?;
        out.push(path);
    }
    tracing::info!(layers = out.len(), "saved blend inspection layers");
    Ok(out)
}

fn build_thread_pool(threads: usize) -> ZoomResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(ZoomError::config("render thread count must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ZoomError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}
