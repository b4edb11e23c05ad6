//! Maps output frame indices onto pyramid layers.
//!
//! Progress through the nesting levels is eased in the log domain: a zoom log `L` in
//! `[0, steps]` selects layer `ceil(L)` and the residual scale `zoom^(L - ceil(L))`, so the
//! apparent zoom speed stays constant for linear easing.

use crate::{
    ease::Ease,
    foundation::{
        core::{Direction, FrameIndex},
        error::{ZoomError, ZoomResult},
    },
};

const LEVEL_SNAP: f64 = 1e-9;

/// Where and how much to zoom for one output frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSample {
    pub frame: FrameIndex,
    /// Continuous position in `[0, steps]`, in units of nesting levels.
    pub zoom_log: f64,
    /// Pyramid layer to sample, in `[0, steps]`.
    pub layer: usize,
    /// Residual zoom inside the layer, in `(1 / zoom, 1]`.
    pub local_zoom: f64,
    /// Factor handed to `zoom_crop` on the selected layer; `None` renders the base layer as is.
    pub crop_zoom: Option<f64>,
}

#[derive(Clone, Copy, Debug)]
pub struct FrameSampler {
    ease: Ease,
    direction: Direction,
    zoom: f64,
    num_frames: u64,
    steps: usize,
}

impl FrameSampler {
    /// `steps` is the number of images minus one.
    pub fn new(
        ease: Ease,
        direction: Direction,
        zoom: f64,
        num_frames: u64,
        steps: usize,
    ) -> ZoomResult<Self> {
        if !zoom.is_finite() || zoom <= 1.0 {
            return Err(ZoomError::config(format!(
                "zoom ratio must be greater than 1, got {zoom}"
            )));
        }
        if steps == 0 {
            return Err(ZoomError::config(
                "at least two images are required to create a zoom video",
            ));
        }
        let min_frames = Self::min_frames(direction);
        if num_frames < min_frames {
            return Err(ZoomError::config(format!(
                "direction '{direction}' needs at least {min_frames} frames, got {num_frames}"
            )));
        }
        Ok(Self {
            ease,
            direction,
            zoom,
            num_frames,
            steps,
        })
    }

    /// Shortest timeline `direction` can be sampled over: every half needs two frames.
    pub fn min_frames(direction: Direction) -> u64 {
        if direction.is_round_trip() { 4 } else { 2 }
    }

    pub fn num_frames(&self) -> u64 {
        self.num_frames
    }

    pub fn half(&self) -> u64 {
        self.num_frames / 2
    }

    pub fn zoom_log(&self, frame: FrameIndex) -> f64 {
        let i = frame.0;
        let n = self.num_frames;
        let h = self.half();
        match self.direction {
            Direction::In => self.zoom_in_log(i, n),
            Direction::Out => self.zoom_out_log(i, n),
            Direction::InOut if i < h => self.zoom_in_log(i, h),
            Direction::InOut => self.zoom_out_log(i - h, n - h),
            Direction::OutIn if i < h => self.zoom_out_log(i, h),
            Direction::OutIn => self.zoom_in_log(i - h, n - h),
        }
    }

    pub fn sample(&self, frame: FrameIndex) -> FrameSample {
        let mut zoom_log = self.zoom_log(frame);
        // Easing round-off must not push a whole level onto the far side of a layer boundary.
        if (zoom_log - zoom_log.round()).abs() < LEVEL_SNAP {
            zoom_log = zoom_log.round();
        }
        let layer = zoom_log.ceil();
        let rel = zoom_log - layer;

        if zoom_log <= 0.0 {
            return FrameSample {
                frame,
                zoom_log,
                layer: 0,
                local_zoom: 1.0,
                crop_zoom: None,
            };
        }

        let local_zoom = self.zoom.powf(rel);
        FrameSample {
            frame,
            zoom_log,
            layer: (layer as usize).min(self.steps),
            local_zoom,
            crop_zoom: Some(self.zoom.powf(rel + 1.0)),
        }
    }

    fn progress(&self, i: u64, n: u64) -> f64 {
        self.ease.apply(i as f64 / (n - 1) as f64)
    }

    fn zoom_in_log(&self, i: u64, n: u64) -> f64 {
        self.progress(i, n) * self.steps as f64
    }

    fn zoom_out_log(&self, i: u64, n: u64) -> f64 {
        (1.0 - self.progress(i, n)) * self.steps as f64
    }
}
