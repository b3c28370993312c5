use std::sync::Arc;

use crate::dut::{PHASE_WIDTH, SINCOS_WIDTH};
use crate::error::TbResult;
use crate::executor::{JoinHandle, Spawner};
use crate::model::{Phase, SinCos, Validity};
use crate::signal::SimObject;
use crate::sim_if::Level;
use crate::tlm::Fifo;

/// Phase sampled on the DUT input while its valid strobe was high.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSample {
    pub phase: Phase,
    pub valid: u8,
}

/// Bus functional model of the SinCosTable interface.
///
/// The only part of the testbench touching DUT signals. Everything else talks to its three
/// queues: stimulus goes in through the capacity-1 driver queue, samples of the input and of
/// the result side come out of two unbounded monitor queues. All loops run on the falling clock
/// edge, the DUT samples on the rising one.
pub struct SinCosBfm {
    clk: SimObject,
    phase: SimObject,
    phase_v: SimObject,
    sin: SimObject,
    cos: SimObject,
    sincos_v: SimObject,
    driver_queue: Fifo<(Phase, Validity)>,
    input_mon_queue: Fifo<InputSample>,
    result_mon_queue: Fifo<SinCos>,
}

impl SinCosBfm {
    /// Binds to the DUT below `dut`. Fails if a port is missing or has an unexpected width.
    pub fn new(dut: &SimObject) -> TbResult<Arc<Self>> {
        Ok(Arc::new(Self {
            clk: dut.port("iCLK", 1)?,
            phase: dut.port("iPHASE", PHASE_WIDTH)?,
            phase_v: dut.port("iPHASE_V", 1)?,
            sin: dut.port("oSIN", SINCOS_WIDTH)?,
            cos: dut.port("oCOS", SINCOS_WIDTH)?,
            sincos_v: dut.port("oSINCOS_V", 1)?,
            driver_queue: Fifo::bounded(1),
            input_mon_queue: Fifo::unbounded(),
            result_mon_queue: Fifo::unbounded(),
        }))
    }

    pub fn clk(&self) -> &SimObject {
        &self.clk
    }

    /// Queues a transaction for the driver loop, suspending while one is already waiting.
    pub async fn issue_input_data(&self, phase: Phase, validity: Validity) -> TbResult {
        validity.check()?;
        self.driver_queue.put((phase, validity)).await;
        Ok(())
    }

    pub async fn get_input_data(&self) -> InputSample {
        self.input_mon_queue.get().await
    }

    pub async fn get_result(&self) -> SinCos {
        self.result_mon_queue.get().await
    }

    pub fn input_queue(&self) -> Fifo<InputSample> {
        self.input_mon_queue.clone()
    }

    pub fn result_queue(&self) -> Fifo<SinCos> {
        self.result_mon_queue.clone()
    }

    /// Nothing to reset inside the DUT. Drive the inputs inactive and wait for a clock edge.
    pub async fn reset(&self) {
        self.phase.set_u32(0);
        self.phase_v.set_u32(0);
        self.clk.falling_edge().await;
    }

    pub fn start(self: &Arc<Self>, spawner: &Spawner) -> [JoinHandle; 3] {
        [
            spawner.spawn("driver_bfm", self.clone().driver_bfm()),
            spawner.spawn("input_data_mon_bfm", self.clone().input_data_mon_bfm()),
            spawner.spawn("result_mon_bfm", self.clone().result_mon_bfm()),
        ]
    }

    #[allow(unreachable_code)]
    async fn driver_bfm(self: Arc<Self>) -> TbResult {
        self.phase.set_u32(0);
        self.phase_v.set_u32(0);
        loop {
            self.clk.falling_edge().await;
            let Some((phase, validity)) = self.driver_queue.try_get() else {
                // nothing to drive this cycle
                self.phase_v.set_u32(0);
                continue;
            };
            self.phase.set_u32(phase.value());
            let strobes = validity.strobes();
            for (i, &strobe) in strobes.iter().enumerate() {
                self.phase_v.set_u32(strobe as u32);
                if i + 1 < strobes.len() {
                    self.clk.falling_edge().await;
                }
            }
            // The last strobe holds until the next falling edge, where the loop either drives
            // the next transaction or deasserts valid.
        }
        Ok(())
    }

    #[allow(unreachable_code)]
    async fn input_data_mon_bfm(self: Arc<Self>) -> TbResult {
        loop {
            self.clk.falling_edge().await;
            if self.phase_v.u32() == 1 {
                let sample = InputSample {
                    phase: Phase::wrapping(self.phase.u32()),
                    valid: 1,
                };
                let _ = self.input_mon_queue.try_put(sample);
            }
        }
        Ok(())
    }

    #[allow(unreachable_code)]
    async fn result_mon_bfm(self: Arc<Self>) -> TbResult {
        loop {
            self.clk.falling_edge().await;
            if self.sincos_v.u32() == 1 {
                let result = SinCos::new(self.sin.i32() as i16, self.cos.i32() as i16);
                let _ = self.result_mon_queue.try_put(result);
            }
        }
        Ok(())
    }

    pub fn log(&self, level: Level, msg: &str) {
        self.clk.sim().log(level, "bfm", msg);
    }
}
