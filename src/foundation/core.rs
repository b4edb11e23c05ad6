use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::foundation::error::{ZoomError, ZoomResult};

/// 0-based index of an output frame.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// Fixed-width file name of this frame inside a job directory.
    pub fn file_name(self) -> String {
        format!("{:06}.png", self.0)
    }
}

/// Zoom direction through the nested image sequence.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    #[default]
    Out,
    InOut,
    OutIn,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::In, Self::Out, Self::InOut, Self::OutIn];

    pub fn name(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::InOut => "inout",
            Self::OutIn => "outin",
        }
    }

    /// Directions that start zoomed out consume the image list innermost-first.
    pub fn starts_outward(self) -> bool {
        matches!(self, Self::Out | Self::OutIn)
    }

    /// Directions that split the timeline into two halves.
    pub fn is_round_trip(self) -> bool {
        matches!(self, Self::InOut | Self::OutIn)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = ZoomError;

    fn from_str(s: &str) -> ZoomResult<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| ZoomError::config(format!("unsupported direction: '{s}'")))
    }
}

/// Resampling filter used for every resize in a job.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    Nearest,
    Box,
    Bilinear,
    Hamming,
    Bicubic,
    #[default]
    Lanczos,
}

impl Resampling {
    pub const ALL: [Resampling; 6] = [
        Self::Nearest,
        Self::Box,
        Self::Bilinear,
        Self::Hamming,
        Self::Bicubic,
        Self::Lanczos,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Box => "box",
            Self::Bilinear => "bilinear",
            Self::Hamming => "hamming",
            Self::Bicubic => "bicubic",
            Self::Lanczos => "lanczos",
        }
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resampling {
    type Err = ZoomError;

    fn from_str(s: &str) -> ZoomResult<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| ZoomError::config(format!("unsupported resampling function: '{s}'")))
    }
}

/// A size given either in pixels (> 1) or as a fraction of a reference size (<= 1).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Dimension(pub f64);

impl Dimension {
    pub fn resolve(self, reference: u32) -> ZoomResult<u32> {
        if !self.0.is_finite() || self.0 < 0.0 {
            return Err(ZoomError::config(format!(
                "size must be a non-negative finite number, got {}",
                self.0
            )));
        }
        let px = if self.0 <= 1.0 {
            f64::from(reference) * self.0
        } else {
            self.0
        };
        Ok(px as u32)
    }
}

impl FromStr for Dimension {
    type Err = ZoomError;

    fn from_str(s: &str) -> ZoomResult<Self> {
        s.parse::<f64>()
            .map(Self)
            .map_err(|e| ZoomError::config(format!("invalid size '{s}': {e}")))
    }
}

/// Shared flag used to stop scheduling further frames.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
