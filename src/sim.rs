use std::sync::Arc;

use crate::config::RunConfig;
use crate::dut::Dut;
use crate::error::{TbError, TbResult};
use crate::executor::{Executor, JoinHandle, Spawner};
use crate::kernel::Kernel;
use crate::signal::SimObject;
use crate::sim_if::{self, Level, SimIf, SimRef};
use crate::trigger::EdgeKind;

/// Owns a design, the kernel holding its signals and the executor running the testbench.
///
/// Time only advances through `step()`, one full clock cycle at a time. Each edge wakes the
/// tasks waiting on it, runs them until nothing is ready any more and then commits their writes.
pub struct Simulator<D: Dut> {
    kernel: Arc<Kernel>,
    executor: Executor,
    dut: D,
    clk: usize,
    half_period_ns: u64,
    cycles: u64,
    max_cycles: Option<u64>,
}

impl<D: Dut> Simulator<D> {
    pub fn new(mut dut: D, cfg: &RunConfig) -> Self {
        let kernel = Kernel::new(dut.name(), cfg.verbosity);
        dut.elaborate(&kernel);
        let clk = dut.clock();
        kernel.poke(clk, Some(0));
        Self {
            kernel,
            executor: Executor::new(),
            dut,
            clk,
            half_period_ns: (cfg.clock_period_ns / 2).max(1),
            cycles: 0,
            max_cycles: cfg.max_cycles,
        }
    }

    pub fn sim(&self) -> SimRef {
        self.kernel.clone()
    }

    pub fn kernel(&self) -> &Arc<Kernel> {
        &self.kernel
    }

    pub fn root(&self) -> TbResult<SimObject> {
        sim_if::get_root(&self.sim())
    }

    pub fn spawner(&self) -> Spawner {
        self.executor.spawner()
    }

    pub fn dut(&self) -> &D {
        &self.dut
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn sim_time_ns(&self) -> u64 {
        self.kernel.get_sim_time_steps()
    }

    /// Runs whatever is ready without advancing time.
    pub fn settle(&self) {
        self.executor.run_once();
        self.kernel.commit();
    }

    /// One clock cycle: the rising edge, where the design evaluates, then the falling edge.
    pub fn step(&mut self) {
        self.kernel.poke(self.clk, Some(1));
        self.dut.rising_edge(&self.kernel);
        self.edge(EdgeKind::Rising);

        self.kernel.poke(self.clk, Some(0));
        self.edge(EdgeKind::Falling);
        self.cycles += 1;
    }

    fn edge(&self, edge: EdgeKind) {
        for waker in self.kernel.react_edge(self.clk, edge) {
            waker.wake();
        }
        self.settle();
        self.kernel.advance(self.half_period_ns);
    }

    /// Steps until `top` completed and returns its result.
    ///
    /// With a cycle limit configured, a task still running after that many cycles is cancelled
    /// and the run fails with `TbError::Stalled`.
    pub fn run_until(&mut self, mut top: JoinHandle) -> TbResult {
        self.settle();
        loop {
            if let Some(result) = top.try_join() {
                return result;
            }
            if let Some(max) = self.max_cycles {
                if self.cycles >= max {
                    self.sim().log(
                        Level::Error,
                        "simulator",
                        &format!("stopping after {} cycles", max),
                    );
                    top.cancel();
                    return Err(TbError::Stalled(max));
                }
            }
            self.step();
        }
    }

    /// Cancels all tasks and pending triggers.
    pub fn tear_down(&self) {
        self.executor.tear_down();
        self.kernel.cancel_all_triggers();
    }
}

impl<D: Dut> Drop for Simulator<D> {
    fn drop(&mut self) {
        self.tear_down();
    }
}
