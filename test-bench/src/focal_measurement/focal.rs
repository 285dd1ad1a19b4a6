//! Focal length from spot-distance vectors at the reference and two measurement planes.
//!
//! The eight distances of a [`DistanceVector`] split into two subsets of four
//! spots, `p` and `l`. Each subset gives four per-spot focal lengths
//!
//! ```text
//! f[i] = y0[idx[i]] / (y1_eff[idx[i]] - y2_eff[idx_y2[i]]) * dz
//! ```
//!
//! where the measurement mode picks the signs applied to `y1`/`y2` and which
//! permutation of spots each subset reads. The two subset means are then
//! combined into an effective focal length.

use shared::algo::stats::{mean, population_std_dev};
use shared::focal_reference::DistanceVector;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of spots in each subset
pub const SUBSET_SPOTS: usize = 4;

const SPOTS_P: [usize; SUBSET_SPOTS] = [4, 1, 3, 6];
const SPOTS_L: [usize; SUBSET_SPOTS] = [2, 0, 5, 7];
const SPOTS_P_INVERTED: [usize; SUBSET_SPOTS] = [3, 6, 4, 1];
const SPOTS_L_INVERTED: [usize; SUBSET_SPOTS] = [5, 7, 2, 0];

/// Decimal places of the values reported in result tables
pub const TABLE_DECIMALS: i32 = 2;
/// Decimal places of the scalar focal result
pub const RESULT_DECIMALS: i32 = 3;

/// Round to `decimals` places: scale, round half to even, scale back.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

/// Where the two measurement planes sit relative to the lens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Both planes between the principal planes and the focal point, or a
    /// negative lens
    One,
    /// z1 inside the focal point, z2 beyond it
    Two,
    /// Both planes beyond the focal point
    Three,
}

/// Sign and permutation convention of a [`Mode`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct ModeConvention {
    y1_sign: f64,
    y2_sign: f64,
    idx_p: [usize; SUBSET_SPOTS],
    idx_l: [usize; SUBSET_SPOTS],
    idx_y2_p: [usize; SUBSET_SPOTS],
    idx_y2_l: [usize; SUBSET_SPOTS],
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::One, Mode::Two, Mode::Three];

    pub fn number(self) -> u8 {
        match self {
            Mode::One => 1,
            Mode::Two => 2,
            Mode::Three => 3,
        }
    }

    /// Plane configuration the mode is meant for, as shown to the operator.
    pub fn description(self) -> &'static str {
        match self {
            Mode::One => "both planes between principal planes and focal point (or negative lens)",
            Mode::Two => "z1 inside, z2 beyond the focal point",
            Mode::Three => "both planes beyond the focal point",
        }
    }

    fn convention(self) -> ModeConvention {
        match self {
            Mode::One => ModeConvention {
                y1_sign: 1.0,
                y2_sign: 1.0,
                idx_p: SPOTS_P,
                idx_l: SPOTS_L,
                idx_y2_p: SPOTS_P,
                idx_y2_l: SPOTS_L,
            },
            Mode::Two => ModeConvention {
                y1_sign: 1.0,
                y2_sign: -1.0,
                idx_p: SPOTS_P,
                idx_l: SPOTS_L,
                idx_y2_p: SPOTS_P_INVERTED,
                idx_y2_l: SPOTS_L_INVERTED,
            },
            Mode::Three => ModeConvention {
                y1_sign: -1.0,
                y2_sign: -1.0,
                idx_p: SPOTS_P_INVERTED,
                idx_l: SPOTS_L_INVERTED,
                idx_y2_p: SPOTS_P_INVERTED,
                idx_y2_l: SPOTS_L_INVERTED,
            },
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl TryFrom<u8> for Mode {
    type Error = FocalError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Mode::One),
            2 => Ok(Mode::Two),
            3 => Ok(Mode::Three),
            other => Err(FocalError::UnknownMode(other.to_string())),
        }
    }
}

impl FromStr for Mode {
    type Err = FocalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| FocalError::UnknownMode(s.to_string()))
            .and_then(Mode::try_from)
    }
}

/// Spot subset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    P,
    L,
}

impl Subset {
    pub fn label(self) -> &'static str {
        match self {
            Subset::P => "p",
            Subset::L => "l",
        }
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FocalError {
    #[error("unknown measurement mode {0:?}, expected 1, 2 or 3")]
    UnknownMode(String),

    #[error("degenerate geometry at spot {spot} of subset {subset}: y1 and y2 coincide")]
    DegenerateSpot { subset: Subset, spot: usize },
}

/// Per-spot values and statistics of one subset.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetFocal {
    pub subset: Subset,
    /// Distance-vector indices the subset reads y0, y1 and y2 from
    pub indices: [usize; SUBSET_SPOTS],
    pub y0: [f64; SUBSET_SPOTS],
    /// Signed plane-1 distances
    pub y1: [f64; SUBSET_SPOTS],
    /// Signed plane-2 distances
    pub y2: [f64; SUBSET_SPOTS],
    /// Per-spot focal lengths in mm
    pub focal: [f64; SUBSET_SPOTS],
    pub mean: f64,
    /// Population standard deviation of `focal`
    pub std: f64,
}

/// Full, unrounded output of [`compute_focal`].
#[derive(Debug, Clone, PartialEq)]
pub struct FocalComputation {
    pub mode: Mode,
    pub dz: f64,
    pub p: SubsetFocal,
    pub l: SubsetFocal,
    pub delta_f: f64,
    pub err_delta_f: f64,
    pub focal_effective: f64,
    pub err_focal_effective: f64,
}

/// Scalar focal result of one filter, rounded to three decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalResult {
    pub focal_effective: f64,
    pub err_focal_effective: f64,
    pub delta_f: f64,
    pub err_delta_f: f64,
}

impl FocalComputation {
    /// Rounded scalar summary.
    ///
    /// Δf and its error are recomputed from the rounded subset statistics.
    pub fn result(&self) -> FocalResult {
        let r = |v: f64| round_to(v, RESULT_DECIMALS);
        let delta_f = r(r(self.p.mean) - r(self.l.mean));
        let err_delta_f = r(r(self.p.std).hypot(r(self.l.std)));

        FocalResult {
            focal_effective: r(self.focal_effective),
            err_focal_effective: r(self.err_focal_effective),
            delta_f,
            err_delta_f,
        }
    }
}

/// Focal length from reference (`y0`) and plane (`y1`, `y2`) distances.
///
/// `dz` is the separation of the two planes. A zero `dz` yields zero focal
/// lengths without dividing.
pub fn compute_focal(
    y0: &DistanceVector,
    y1: &DistanceVector,
    y2: &DistanceVector,
    dz: f64,
    mode: Mode,
) -> Result<FocalComputation, FocalError> {
    let convention = mode.convention();
    let dz = dz.abs();
    let y1_eff = y1.values().map(|v| v * convention.y1_sign);
    let y2_eff = y2.values().map(|v| v * convention.y2_sign);

    let subset = |subset: Subset, idx: [usize; SUBSET_SPOTS], idx_y2: [usize; SUBSET_SPOTS]| {
        let mut focal = [0.0; SUBSET_SPOTS];
        if dz != 0.0 {
            for (spot, f) in focal.iter_mut().enumerate() {
                let denominator = y1_eff[idx[spot]] - y2_eff[idx_y2[spot]];
                *f = y0.get(idx[spot]) / denominator * dz;
                if !f.is_finite() {
                    return Err(FocalError::DegenerateSpot {
                        subset,
                        spot: spot + 1,
                    });
                }
            }
        }

        Ok(SubsetFocal {
            subset,
            indices: idx,
            y0: idx.map(|i| y0.get(i)),
            y1: idx.map(|i| y1_eff[i]),
            y2: idx.map(|i| y2_eff[i]),
            focal,
            mean: mean(&focal),
            std: population_std_dev(&focal),
        })
    };

    let p = subset(Subset::P, convention.idx_p, convention.idx_y2_p)?;
    let l = subset(Subset::L, convention.idx_l, convention.idx_y2_l)?;

    let delta_f = p.mean - l.mean;
    let err_delta_f = p.std.hypot(l.std);

    Ok(FocalComputation {
        mode,
        dz,
        focal_effective: p.mean + delta_f,
        err_focal_effective: p.std.hypot(err_delta_f),
        delta_f,
        err_delta_f,
        p,
        l,
    })
}
