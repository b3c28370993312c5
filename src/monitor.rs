use std::fmt::Debug;

use crate::error::TbResult;
use crate::sim_if::{Level, SimRef};
use crate::tlm::{AnalysisPort, Fifo};

/// Forwards everything arriving on one of the BFM's monitor queues to an analysis port.
pub struct Monitor<T> {
    name: String,
    pub ap: AnalysisPort<T>,
    source: Fifo<T>,
    sim: SimRef,
}

impl<T: Clone + Debug + Send + 'static> Monitor<T> {
    pub fn new(name: &str, source: Fifo<T>, sim: SimRef) -> Self {
        Self {
            name: name.to_string(),
            ap: AnalysisPort::new(&format!("{}.ap", name)),
            source,
            sim,
        }
    }

    #[allow(unreachable_code)]
    pub async fn run(self) -> TbResult {
        loop {
            let datum = self.source.get().await;
            self.sim
                .log(Level::Debug, &self.name, &format!("MONITORED {:?}", datum));
            self.ap.write(&datum);
        }
        Ok(())
    }
}
