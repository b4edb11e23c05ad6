//! Infinite-zoom video composer.
//!
//! Nested images are blended into a [`ZoomPyramid`], sampled per frame by a [`FrameSampler`],
//! rendered in parallel into a resumable frame directory and finally encoded with `ffmpeg`.

#![forbid(unsafe_code)]

pub mod ease;
pub mod encode_ffmpeg;
pub mod engine;
pub mod fingerprint;
pub mod foundation;
pub mod inputs;
pub mod job;
pub mod ops;
pub mod pyramid;
pub mod render;
pub mod sampler;

pub use ease::{EASING_NAMES, Ease};
pub use encode_ffmpeg::{EncodeConfig, FfmpegEncoder, assemble_video, is_ffmpeg_on_path};
pub use engine::{CropRect, EngineKind, Raster, RgbaRaster, SkiaRaster};
pub use foundation::core::{CancelToken, Dimension, Direction, FrameIndex, Resampling};
pub use foundation::error::{ZoomError, ZoomResult};
pub use job::{JobOutcome, JobSpec, RenderParams, run_job};
pub use pyramid::{PyramidConfig, ZoomPyramid};
pub use render::{FrameTarget, RenderStats, render_frame, render_frames};
pub use sampler::{FrameSample, FrameSampler};
