use std::fmt;
use std::sync::Arc;
use std::task::Waker;

use crate::error::TbResult;
use crate::signal::SimObject;
use crate::trigger::EdgeKind;

pub type SimRef = Arc<dyn SimIf>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        };
        f.pad(s)
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" => Ok(Level::Critical),
            _ => Err(format!("unknown log level `{}`", s)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Int(u32),
    Hier,
}

/// Everything the testbench needs from a simulator.
///
/// Values are raw bit patterns of at most 64 bits. `None` is an unresolved value (X/Z), which
/// only the simulator side can produce.
pub trait SimIf: Send + Sync {
    fn get_handle_by_name(&self, name: &str) -> TbResult<(usize, ObjectKind)>;
    fn get_full_name(&self, handle: usize) -> String;
    fn get_value(&self, handle: usize) -> Option<u64>;
    fn set_value(&self, handle: usize, value: u64);
    fn get_root_name(&self) -> String;
    fn get_sim_time_steps(&self) -> u64;
    /// Number of edges of the given kind seen on a signal so far.
    fn edge_count(&self, handle: usize, edge: EdgeKind) -> u64;
    fn register_edge_callback(&self, handle: usize, edge: EdgeKind, waker: Waker);
    fn log(&self, level: Level, source: &str, msg: &str);
}

pub fn get_root(sim: &SimRef) -> TbResult<SimObject> {
    SimObject::from_name(sim, &sim.get_root_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_and_order() {
        assert_eq!("warn".parse::<Level>(), Ok(Level::Warning));
        assert_eq!("CRITICAL".parse::<Level>(), Ok(Level::Critical));
        assert!("loud".parse::<Level>().is_err());
        assert!(Level::Debug < Level::Info && Level::Error < Level::Critical);
        assert_eq!(format!("{:<8}|", Level::Info), "INFO    |");
    }
}
