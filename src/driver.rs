use std::sync::Arc;

use crate::bfm::SinCosBfm;
use crate::error::{TbError, TbResult};
use crate::executor::Spawner;
use crate::model::SinCos;
use crate::sequence::SeqItemPort;
use crate::sim_if::{Level, SimRef};
use crate::tb_obj::TbObj;
use crate::tlm::AnalysisPort;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Reset,
    Running,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub issued: usize,
    pub completed: usize,
    pub max_in_flight: usize,
}

impl DriverStats {
    pub fn in_flight(&self) -> usize {
        self.issued - self.completed
    }
}

/// Pulls items from the sequencer and runs them through the BFM one at a time.
///
/// Each item is coupled to the next result coming out of the BFM, which holds as long as the
/// DUT is a fixed latency, order preserving pipeline.
pub struct Driver {
    pub ap: AnalysisPort<SinCos>,
    seq_item_port: SeqItemPort,
    bfm: Arc<SinCosBfm>,
    sim: SimRef,
    state: TbObj<DriverState>,
    stats: TbObj<DriverStats>,
}

impl Driver {
    pub fn new(seq_item_port: SeqItemPort, bfm: Arc<SinCosBfm>, sim: SimRef) -> Self {
        Self {
            ap: AnalysisPort::new("driver.ap"),
            seq_item_port,
            bfm,
            sim,
            state: TbObj::new(DriverState::Init),
            stats: TbObj::new(DriverStats::default()),
        }
    }

    pub fn state(&self) -> TbObj<DriverState> {
        self.state.clone()
    }

    pub fn stats(&self) -> TbObj<DriverStats> {
        self.stats.clone()
    }

    fn enter(&self, state: DriverState) {
        self.state.with_mut(|s| *s = state);
        self.sim.log(Level::Debug, "driver", &format!("entering {:?}", state));
    }

    async fn launch_tb(&self, spawner: &Spawner) {
        self.enter(DriverState::Reset);
        self.bfm.reset().await;
        self.bfm.start(spawner);
    }

    /// Runs until the sequencer is closed, normally forever.
    pub async fn run(mut self, spawner: Spawner) -> TbResult {
        self.launch_tb(&spawner).await;
        self.enter(DriverState::Running);
        while let Some(req) = self.seq_item_port.get_next_item().await {
            let mut item = req.item.clone();
            self.bfm
                .issue_input_data(item.phase(), item.validity().clone())
                .await?;
            let in_flight = self.stats.with_mut(|s| {
                s.issued += 1;
                s.max_in_flight = s.max_in_flight.max(s.in_flight());
                s.in_flight()
            });
            if in_flight > 1 {
                return Err(TbError::InFlight(in_flight));
            }

            let result = self.bfm.get_result().await;
            self.stats.with_mut(|s| s.completed += 1);
            self.ap.write(&result);
            item.set_observed(result);
            req.item_done(item);
        }
        Ok(())
    }
}
