use std::f64::consts::PI;

use crate::foundation::error::{ZoomError, ZoomResult};

/// Maps normalized zoom progress to eased progress; both in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    InSine,
    OutSine,
    InOutSine,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    /// `t^p`.
    InPow(f64),
    /// `1 - (1 - t)^p`.
    OutPow(f64),
    /// Symmetric power curve; `p = 2` matches [`Ease::InOutQuad`].
    InOutPow(f64),
    /// Quadratic ramps over the first and last `d` of the timeline around a linear middle.
    LinearWithInOutEase(f64),
}

/// Every easing name accepted by [`Ease::from_name`].
pub const EASING_NAMES: [&str; 14] = [
    "linear",
    "easeInSine",
    "easeOutSine",
    "easeInOutSine",
    "easeInQuad",
    "easeOutQuad",
    "easeInOutQuad",
    "easeInCubic",
    "easeOutCubic",
    "easeInOutCubic",
    "easeInPow",
    "easeOutPow",
    "easeInOutPow",
    "linearWithInOutEase",
];

pub const DEFAULT_EASING: &str = "easeInOutSine";

impl Ease {
    /// Resolve an easing name; `power` and `ease_duration` are only read by the variants
    /// that take them.
    pub fn from_name(name: &str, power: f64, ease_duration: f64) -> ZoomResult<Self> {
        let needs_power = matches!(name, "easeInPow" | "easeOutPow" | "easeInOutPow");
        if needs_power && !(power.is_finite() && power > 0.0) {
            return Err(ZoomError::config(format!(
                "easing power must be a positive number, got {power}"
            )));
        }
        if name == "linearWithInOutEase" && !(0.0..=0.5).contains(&ease_duration) {
            return Err(ZoomError::config(format!(
                "ease duration must be within [0, 0.5], got {ease_duration}"
            )));
        }

        Ok(match name {
            "linear" => Self::Linear,
            "easeInSine" => Self::InSine,
            "easeOutSine" => Self::OutSine,
            "easeInOutSine" => Self::InOutSine,
            "easeInQuad" => Self::InQuad,
            "easeOutQuad" => Self::OutQuad,
            "easeInOutQuad" => Self::InOutQuad,
            "easeInCubic" => Self::InCubic,
            "easeOutCubic" => Self::OutCubic,
            "easeInOutCubic" => Self::InOutCubic,
            "easeInPow" => Self::InPow(power),
            "easeOutPow" => Self::OutPow(power),
            "easeInOutPow" => Self::InOutPow(power),
            "linearWithInOutEase" => Self::LinearWithInOutEase(ease_duration),
            other => {
                return Err(ZoomError::config(format!(
                    "unsupported easing function: '{other}'"
                )));
            }
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::InSine => "easeInSine",
            Self::OutSine => "easeOutSine",
            Self::InOutSine => "easeInOutSine",
            Self::InQuad => "easeInQuad",
            Self::OutQuad => "easeOutQuad",
            Self::InOutQuad => "easeInOutQuad",
            Self::InCubic => "easeInCubic",
            Self::OutCubic => "easeOutCubic",
            Self::InOutCubic => "easeInOutCubic",
            Self::InPow(_) => "easeInPow",
            Self::OutPow(_) => "easeOutPow",
            Self::InOutPow(_) => "easeInOutPow",
            Self::LinearWithInOutEase(_) => "linearWithInOutEase",
        }
    }

    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let eased = match self {
            Self::Linear => t,
            Self::InSine => 1.0 - (t * PI / 2.0).cos(),
            Self::OutSine => (t * PI / 2.0).sin(),
            Self::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::InPow(p) => t.powf(p),
            Self::OutPow(p) => 1.0 - (1.0 - t).powf(p),
            Self::InOutPow(p) => {
                if t < 0.5 {
                    2f64.powf(p - 1.0) * t.powf(p)
                } else {
                    1.0 - ((-2.0 * t + 2.0).powf(p) / 2.0)
                }
            }
            Self::LinearWithInOutEase(d) => linear_with_eased_ends(t, d),
        };
        eased.clamp(0.0, 1.0)
    }
}

// Velocity ramps 0 -> v over [0, d], holds v, ramps back to 0 over [1 - d, 1];
// v = 1 / (1 - d) keeps the total displacement at 1.
fn linear_with_eased_ends(t: f64, d: f64) -> f64 {
    if d <= 0.0 {
        return t;
    }
    let v = 1.0 / (1.0 - d);
    if t < d {
        v * t * t / (2.0 * d)
    } else if t <= 1.0 - d {
        v * (t - d / 2.0)
    } else {
        1.0 - v * (1.0 - t) * (1.0 - t) / (2.0 * d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_eases() -> Vec<Ease> {
        let mut out = EASING_NAMES
            .iter()
            .map(|name| Ease::from_name(name, 2.0, 0.1).unwrap())
            .collect::<Vec<_>>();
        out.extend([
            Ease::InPow(0.5),
            Ease::OutPow(3.5),
            Ease::InOutPow(5.0),
            Ease::LinearWithInOutEase(0.0),
            Ease::LinearWithInOutEase(0.5),
            Ease::LinearWithInOutEase(0.25),
        ]);
        out
    }

    #[test]
    fn endpoints_are_stable() {
        for ease in all_eases() {
            assert!(ease.apply(0.0).abs() < 1e-12, "{ease:?} at 0");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-12, "{ease:?} at 1");
        }
    }

    #[test]
    fn monotonic_on_dense_samples() {
        for ease in all_eases() {
            let mut prev = ease.apply(0.0);
            for i in 1..=1000 {
                let v = ease.apply(f64::from(i) / 1000.0);
                assert!(v + 1e-12 >= prev, "{ease:?} decreased at step {i}");
                assert!((0.0..=1.0).contains(&v));
                prev = v;
            }
        }
    }

    #[test]
    fn input_is_clamped() {
        assert_eq!(Ease::InQuad.apply(-3.0), 0.0);
        assert_eq!(Ease::InQuad.apply(7.0), 1.0);
    }

    #[test]
    fn pow_variants_match_fixed_exponent_curves() {
        for i in 0..=20 {
            let t = f64::from(i) / 20.0;
            assert!((Ease::InPow(2.0).apply(t) - Ease::InQuad.apply(t)).abs() < 1e-12);
            assert!((Ease::OutPow(3.0).apply(t) - Ease::OutCubic.apply(t)).abs() < 1e-12);
            assert!((Ease::InOutPow(3.0).apply(t) - Ease::InOutCubic.apply(t)).abs() < 1e-12);
        }
    }

    #[test]
    fn linear_with_eased_ends_is_linear_in_the_middle() {
        let ease = Ease::LinearWithInOutEase(0.2);
        let a = ease.apply(0.4);
        let b = ease.apply(0.5);
        let c = ease.apply(0.6);
        assert!(((b - a) - (c - b)).abs() < 1e-12);
        assert!((ease.apply(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        assert!(matches!(
            Ease::from_name("easeInElastic", 2.0, 0.1),
            Err(ZoomError::Config(_))
        ));
        assert!(Ease::from_name("easeInPow", 0.0, 0.1).is_err());
        assert!(Ease::from_name("linearWithInOutEase", 2.0, 0.75).is_err());
    }

    #[test]
    fn names_round_trip() {
        for name in EASING_NAMES {
            assert_eq!(Ease::from_name(name, 2.0, 0.1).unwrap().name(), name);
        }
    }
}
