use std::collections::BTreeSet;

/// Errors raised by the testbench.
///
/// Precondition errors (`PhaseOutOfRange`, `InvalidValidity`) are fatal and raised where the bad
/// value enters. Scoreboard and coverage failures are collected during the run and only surface
/// as an error once the check/report phase aggregates them.
#[derive(Debug, thiserror::Error)]
pub enum TbError {
    #[error("phase {0} out of range 0..=4095")]
    PhaseOutOfRange(u32),

    #[error("invalid validity strobe {0:?}: expected 0/1 values with exactly one 1")]
    InvalidValidity(Vec<u8>),

    #[error("could not find object `{0}`")]
    SignalNotFound(String),

    #[error("signal `{name}` is {actual} bits wide, expected {expected}")]
    WidthMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("object `{0}` has no value")]
    NotASignal(String),

    #[error("scoreboard failed: {mismatches} mismatches, {orphans} results without input")]
    Scoreboard { mismatches: usize, orphans: usize },

    #[error("functional coverage error, missed: {missed:?}")]
    Coverage { missed: BTreeSet<u32> },

    #[error("{0} stimulus items in flight, at most one allowed")]
    InFlight(usize),

    #[error("sequencer was closed before the item completed")]
    SequencerClosed,

    #[error("test did not complete within {0} cycles")]
    Stalled(u64),

    #[error("task `{0}` was cancelled")]
    Cancelled(String),

    #[error("config key `{key}`: {msg}")]
    Config { key: String, msg: String },

    #[error("could not write report: {0}")]
    Report(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type TbResult<T = ()> = Result<T, TbError>;
