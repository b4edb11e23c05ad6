//! End-to-end render job: inputs, pyramid, frames, video.

use std::{
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    ease::{DEFAULT_EASING, Ease},
    encode_ffmpeg::{EncodeConfig, assemble_video},
    engine::{EngineKind, Raster, RgbaRaster, SkiaRaster},
    fingerprint::{job_dir, job_fingerprint},
    foundation::{
        core::{CancelToken, Dimension, Direction, Resampling},
        error::{ZoomError, ZoomResult},
    },
    inputs::{LoadedImages, load_images, resolve_image_paths},
    pyramid::{PyramidConfig, ZoomPyramid},
    render::pipeline::{
        FrameTarget, frame_paths, render_frames, resolve_thread_count, save_blend_layers,
    },
    sampler::FrameSampler,
};

/// Everything needed to produce one zoom video.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobSpec {
    /// Image files or directories, outermost image first.
    pub images: Vec<PathBuf>,
    pub audio: Option<PathBuf>,
    pub zoom: f64,
    /// Seconds.
    pub duration: f64,
    pub fps: u32,
    pub easing: String,
    pub easing_power: f64,
    pub ease_duration: f64,
    pub direction: Direction,
    pub output: PathBuf,
    /// `> 0`: worker count; `<= 0`: available cores minus `|threads|`.
    pub threads: i64,
    pub tmp_dir: PathBuf,
    pub width: Dimension,
    pub height: Dimension,
    pub resampling: Resampling,
    pub engine: EngineKind,
    pub margin: Dimension,
    pub keep_frames: bool,
    pub skip_video_generation: bool,
    pub reverse_images: bool,
    pub inspect_blend: bool,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            images: Vec::new(),
            audio: None,
            zoom: 2.0,
            duration: 10.0,
            fps: 30,
            easing: DEFAULT_EASING.to_owned(),
            easing_power: 2.0,
            ease_duration: 0.1,
            direction: Direction::Out,
            output: PathBuf::from("output.mp4"),
            threads: -1,
            tmp_dir: PathBuf::from("tmp"),
            width: Dimension(1.0),
            height: Dimension(1.0),
            resampling: Resampling::Lanczos,
            engine: EngineKind::Image,
            margin: Dimension(0.05),
            keep_frames: false,
            skip_video_generation: false,
            reverse_images: false,
            inspect_blend: false,
        }
    }
}

impl JobSpec {
    pub fn from_json_file(path: &Path) -> ZoomResult<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open job file '{}'", path.display()))?;
        let spec = serde_json::from_reader(BufReader::new(f))
            .map_err(|e| ZoomError::config(format!("parse job file '{}': {e}", path.display())))?;
        Ok(spec)
    }

    /// Total output frames: `duration * fps`, truncated.
    pub fn num_frames(&self) -> u64 {
        (self.duration * f64::from(self.fps)) as u64
    }

    /// Check every parameter that can be checked without touching the inputs.
    pub fn validate(&self) -> ZoomResult<Ease> {
        if self.images.is_empty() {
            return Err(ZoomError::config("no input images given"));
        }
        if !self.zoom.is_finite() || self.zoom <= 1.0 {
            return Err(ZoomError::config(format!(
                "zoom ratio must be greater than 1, got {}",
                self.zoom
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ZoomError::config(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        if self.fps == 0 {
            return Err(ZoomError::config("fps must be positive"));
        }
        let ease = Ease::from_name(&self.easing, self.easing_power, self.ease_duration)?;

        let frames = self.num_frames();
        let min_frames = FrameSampler::min_frames(self.direction);
        if frames < min_frames {
            return Err(ZoomError::config(format!(
                "{}s at {} fps gives {frames} frames; direction '{}' needs at least {min_frames}",
                self.duration, self.fps, self.direction
            )));
        }

        if !self.skip_video_generation
            && !self.inspect_blend
            && let Some(audio) = &self.audio
            && !audio.is_file()
        {
            return Err(ZoomError::config(format!(
                "audio file '{}' does not exist",
                audio.display()
            )));
        }
        Ok(ease)
    }
}

/// Parameters that determine frame pixels; their hash names the job's frame directory.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RenderParams {
    pub zoom: f64,
    pub duration: f64,
    pub fps: u32,
    pub easing: Ease,
    pub direction: Direction,
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub resampling: Resampling,
    pub engine: EngineKind,
    pub reverse_images: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobOutcome {
    /// Content-addressed frame directory (removed again unless frames are kept).
    pub job_dir: PathBuf,
    pub frames_total: u64,
    pub frames_resumed: u64,
    pub frames_rendered: u64,
    /// Margin-trimmed pyramid layers, only written in blend-inspection mode.
    pub blend_layers: Vec<PathBuf>,
    pub video: Option<PathBuf>,
}

/// Run a job to completion, or until `cancel` is set.
#[tracing::instrument(skip_all, fields(engine = %spec.engine, direction = %spec.direction))]
pub fn run_job(spec: &JobSpec, cancel: &CancelToken) -> ZoomResult<JobOutcome> {
    let ease = spec.validate()?;
    match spec.engine {
        EngineKind::Image => run_with::<RgbaRaster>(spec, ease, cancel),
        EngineKind::Skia => run_with::<SkiaRaster>(spec, ease, cancel),
    }
}

fn run_with<R: Raster>(spec: &JobSpec, ease: Ease, cancel: &CancelToken) -> ZoomResult<JobOutcome> {
    let candidates = resolve_image_paths(&spec.images)?;
    let LoadedImages { mut images, paths } = load_images::<R>(&candidates)?;

    let (width, height, margin) = resolve_sizes(spec, &images[0])?;

    if spec.direction.starts_outward() {
        images.reverse();
    }
    if spec.reverse_images {
        images.reverse();
    }

    let num_frames = spec.num_frames();
    let sampler = FrameSampler::new(ease, spec.direction, spec.zoom, num_frames, images.len() - 1)?;

    let params = RenderParams {
        zoom: spec.zoom,
        duration: spec.duration,
        fps: spec.fps,
        easing: ease,
        direction: spec.direction,
        width,
        height,
        margin,
        resampling: spec.resampling,
        engine: spec.engine,
        reverse_images: spec.reverse_images,
    };
    let dir = job_dir(&spec.tmp_dir, &job_fingerprint(&params, &paths)?);
    tracing::debug!(dir = %dir.display(), width, height, margin, "resolved job");

    let pyramid = ZoomPyramid::build(
        images,
        &PyramidConfig {
            margin,
            zoom: spec.zoom,
            filter: spec.resampling,
        },
    )?;

    if spec.inspect_blend {
        let blend_layers = save_blend_layers(&pyramid, &dir)?;
        return Ok(JobOutcome {
            job_dir: dir,
            frames_total: num_frames,
            frames_resumed: 0,
            frames_rendered: 0,
            blend_layers,
            video: None,
        });
    }

    let target = FrameTarget {
        width,
        height,
        filter: spec.resampling,
    };
    let stats = render_frames(
        &pyramid,
        &sampler,
        &target,
        &dir,
        resolve_thread_count(spec.threads),
        cancel,
    )?;
    let mut outcome = JobOutcome {
        job_dir: dir,
        frames_total: stats.frames_total,
        frames_resumed: stats.frames_resumed,
        frames_rendered: stats.frames_rendered,
        blend_layers: Vec::new(),
        video: None,
    };
    if spec.skip_video_generation {
        return Ok(outcome);
    }

    assemble_video(
        &frame_paths(&outcome.job_dir, num_frames),
        EncodeConfig {
            width,
            height,
            fps: spec.fps,
            num_frames,
            out_path: spec.output.clone(),
            audio: spec.audio.clone(),
        },
    )?;
    outcome.video = Some(spec.output.clone());

    if !spec.keep_frames {
        remove_frames(&outcome.job_dir, &spec.tmp_dir)?;
    }
    Ok(outcome)
}

/// Output size and margin in pixels. Fractions refer to the first image as enumerated.
fn resolve_sizes<R: Raster>(spec: &JobSpec, first: &R) -> ZoomResult<(u32, u32, u32)> {
    let width = spec.width.resolve(first.width())?;
    let height = spec.height.resolve(first.height())?;
    if width == 0 || height == 0 {
        return Err(ZoomError::config(format!(
            "output size resolves to {width}x{height}; both sides must be at least 1 pixel"
        )));
    }
    let margin = spec.margin.resolve(first.width().min(first.height()))?;
    Ok((width, height, margin))
}

fn remove_frames(dir: &Path, tmp_root: &Path) -> ZoomResult<()> {
    tracing::info!(dir = %dir.display(), "removing frames");
    std::fs::remove_dir_all(dir)
        .with_context(|| format!("remove frame directory '{}'", dir.display()))?;
    let empty = std::fs::read_dir(tmp_root)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty {
        std::fs::remove_dir(tmp_root)
            .with_context(|| format!("remove temp directory '{}'", tmp_root.display()))?;
    }
    Ok(())
}
