pub mod bfm;
pub mod config;
pub mod coverage;
pub mod driver;
pub mod dut;
pub mod env;
pub mod error;
pub mod executor;
pub mod item;
pub mod junit;
pub mod kernel;
pub mod model;
pub mod monitor;
pub mod prelude;
pub mod report;
pub mod scoreboard;
pub mod sequence;
pub mod signal;
pub mod sim;
pub mod sim_if;
pub mod tb_obj;
pub mod test;
pub mod tlm;
pub mod trigger;
pub mod utils;

pub use error::{TbError, TbResult};
