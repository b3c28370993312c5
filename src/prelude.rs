pub use crate::bfm::{InputSample, SinCosBfm};
pub use crate::config::{ConfigDb, RunConfig};
pub use crate::dut::{Dut, SinCosTable};
pub use crate::env::{SinCosTableEnv, TestContext};
pub use crate::error::{TbError, TbResult};
pub use crate::executor::{JoinHandle, Spawner};
pub use crate::item::{CompareValidity, StimulusItem};
pub use crate::model::{Phase, ReferenceModel, SinCos, Validity};
pub use crate::sequence::{sincos, Composition, PhaseSeq, Sequencer};
pub use crate::signal::SimObject;
pub use crate::sim::Simulator;
pub use crate::sim_if::Level;
pub use crate::test::{Test, TestOutcome, TestSuite};
pub use crate::trigger::Trigger;
pub use crate::utils::clock_cycles;
pub use futures::future::FutureExt;
