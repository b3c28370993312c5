//! Reference model of the SinCosTable.
//!
//! `sin(p) = round(32767 * sin(2*pi*p/4096))`, `cos` alike. Rounding is half-to-even, the
//! convention of the floating point model the RTL tables were generated from. No exact ties occur
//! for integer phases, the convention is pinned so a table regenerated elsewhere stays bit exact.

use lazy_static::lazy_static;
use rand::Rng;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{TbError, TbResult};

pub const PHASE_BITS: u32 = 12;
pub const PHASE_COUNT: u32 = 1 << PHASE_BITS;
pub const AMPLITUDE: f64 = 32767.0;
/// Phase shift applied in error mode.
pub const ERROR_OFFSET: u32 = PHASE_COUNT >> 4;
pub const VALIDITY_LEN: usize = 5;

/// 12 bit phase, one full turn in 4096 steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Phase(u16);

impl Phase {
    pub fn new(value: u32) -> TbResult<Self> {
        if value < PHASE_COUNT {
            Ok(Phase(value as u16))
        } else {
            Err(TbError::PhaseOutOfRange(value))
        }
    }

    pub fn wrapping(value: u32) -> Self {
        Phase((value % PHASE_COUNT) as u16)
    }

    pub fn value(self) -> u32 {
        self.0 as u32
    }

    pub fn offset(self, by: u32) -> Self {
        Phase::wrapping(self.value() + by)
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Phase(rng.gen_range(0..PHASE_COUNT) as u16)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Valid strobe of a transaction, either a single cycle or a one-hot vector spreading the strobe
/// over several cycles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validity {
    Scalar(u8),
    OneHot(Vec<u8>),
}

impl Validity {
    pub fn scalar(v: u8) -> TbResult<Self> {
        match v {
            0 | 1 => Ok(Validity::Scalar(v)),
            _ => Err(TbError::InvalidValidity(vec![v])),
        }
    }

    pub fn one_hot(strobes: Vec<u8>) -> TbResult<Self> {
        let binary = strobes.iter().all(|&v| v <= 1);
        let ones = strobes.iter().filter(|&&v| v == 1).count();
        if binary && ones == 1 {
            Ok(Validity::OneHot(strobes))
        } else {
            Err(TbError::InvalidValidity(strobes))
        }
    }

    /// One-hot vector of `len` entries with the strobe at `pos`.
    pub fn at(len: usize, pos: usize) -> TbResult<Self> {
        let mut strobes = vec![0; len];
        match strobes.get_mut(pos) {
            Some(s) => *s = 1,
            None => return Err(TbError::InvalidValidity(strobes)),
        }
        Ok(Validity::OneHot(strobes))
    }

    pub fn random(rng: &mut impl Rng, len: usize) -> Self {
        let len = len.max(1);
        let mut strobes = vec![0; len];
        strobes[rng.gen_range(0..len)] = 1;
        Validity::OneHot(strobes)
    }

    /// Per-cycle values of the valid signal.
    pub fn strobes(&self) -> &[u8] {
        match self {
            Validity::Scalar(v) => std::slice::from_ref(v),
            Validity::OneHot(v) => v,
        }
    }

    pub fn check(&self) -> TbResult<()> {
        match self {
            Validity::Scalar(v) => Validity::scalar(*v).map(|_| ()),
            Validity::OneHot(v) => Validity::one_hot(v.clone()).map(|_| ()),
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Scalar(v) => write!(f, "{}", v),
            Validity::OneHot(v) => write!(f, "{:?}", v),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SinCos {
    pub sin: i16,
    pub cos: i16,
}

impl SinCos {
    pub fn new(sin: i16, cos: i16) -> Self {
        Self { sin, cos }
    }
}

impl fmt::Display for SinCos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.sin, self.cos)
    }
}

fn angle(phase: Phase) -> f64 {
    2.0 * PI * phase.value() as f64 / PHASE_COUNT as f64
}

fn fixed_point(x: f64) -> i16 {
    (AMPLITUDE * x).round_ties_even() as i16
}

pub fn direct_sin(phase: Phase) -> i16 {
    fixed_point(angle(phase).sin())
}

pub fn direct_cos(phase: Phase) -> i16 {
    fixed_point(angle(phase).cos())
}

lazy_static! {
    // precalculated tables to avoid evaluating sin/cos for every comparison
    static ref SIN_TABLE: Vec<i16> = (0..PHASE_COUNT).map(|p| direct_sin(Phase::wrapping(p))).collect();
    static ref COS_TABLE: Vec<i16> = (0..PHASE_COUNT).map(|p| direct_cos(Phase::wrapping(p))).collect();
}

pub fn sin_value(phase: Phase) -> i16 {
    SIN_TABLE[phase.value() as usize]
}

pub fn cos_value(phase: Phase) -> i16 {
    COS_TABLE[phase.value() as usize]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Direct,
    Lookup,
}

/// Reference model used by the scoreboard and the stimulus items.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceModel {
    pub backend: Backend,
}

impl ReferenceModel {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn eval(&self, phase: Phase) -> SinCos {
        match self.backend {
            Backend::Direct => SinCos::new(direct_sin(phase), direct_cos(phase)),
            Backend::Lookup => SinCos::new(sin_value(phase), cos_value(phase)),
        }
    }

    /// Expected DUT output for a phase and valid strobe.
    ///
    /// Fails on a phase outside 0..=4095 or a malformed strobe. With `error_mode` the phase is
    /// shifted by `ERROR_OFFSET`, emulating a miscalibrated table.
    pub fn predict(&self, phase: u32, validity: &Validity, error_mode: bool) -> TbResult<SinCos> {
        let phase = Phase::new(phase)?;
        validity.check()?;
        let phase = if error_mode {
            phase.offset(ERROR_OFFSET)
        } else {
            phase
        };
        Ok(self.eval(phase))
    }
}

pub fn predict(phase: u32, validity: &Validity, error_mode: bool) -> TbResult<SinCos> {
    ReferenceModel::default().predict(phase, validity, error_mode)
}
