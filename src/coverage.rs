use intmap::IntMap;
use std::collections::BTreeSet;

use crate::bfm::InputSample;
use crate::error::{TbError, TbResult};
use crate::model::PHASE_COUNT;
use crate::sim_if::{Level, SimRef};
use crate::tb_obj::TbObj;
use crate::tlm::Subscriber;

/// Functional coverage of the phase space, fed with every valid input sample.
#[derive(Clone)]
pub struct Coverage {
    hits: TbObj<IntMap<u32>>,
    step: u32,
    disable_errors: bool,
    sim: SimRef,
}

impl Coverage {
    pub fn new(step: u32, disable_errors: bool, sim: SimRef) -> Self {
        Self {
            hits: TbObj::new(IntMap::new()),
            step,
            disable_errors,
            sim,
        }
    }

    pub fn sample(&self, phase: u32) {
        self.hits.with_mut(|hits| {
            let key = phase as u64;
            if let Some(n) = hits.get_mut(key) {
                *n += 1;
            } else {
                hits.insert(key, 1);
            }
        });
    }

    pub fn covered(&self) -> usize {
        self.hits.get().len()
    }

    pub fn hits(&self, phase: u32) -> u32 {
        self.hits.get().get(phase as u64).copied().unwrap_or(0)
    }

    pub fn missed(&self) -> BTreeSet<u32> {
        let hits = self.hits.get();
        (0..PHASE_COUNT)
            .filter(|&p| !hits.contains_key(p as u64))
            .collect()
    }

    /// Only a sweep with step 1 is required to cover the whole phase space.
    pub fn report_phase(&self) -> TbResult {
        if self.disable_errors || self.step != 1 {
            return Ok(());
        }
        let missed = self.missed();
        if missed.is_empty() {
            self.sim.log(
                Level::Info,
                "coverage",
                &format!("all {} phases covered", PHASE_COUNT),
            );
            return Ok(());
        }
        self.sim.log(
            Level::Error,
            "coverage",
            &format!("functional coverage error, missed: {:?}", missed),
        );
        Err(TbError::Coverage { missed })
    }
}

impl Subscriber<InputSample> for Coverage {
    fn write(&self, sample: &InputSample) {
        self.sample(sample.phase.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;

    fn coverage(step: u32, disable: bool) -> Coverage {
        Coverage::new(step, disable, Kernel::new("top", Level::Critical))
    }

    #[test]
    fn full_sweep_passes() {
        let cov = coverage(1, false);
        for p in 0..PHASE_COUNT + 2 {
            cov.sample(p % PHASE_COUNT);
        }
        assert_eq!(cov.covered(), PHASE_COUNT as usize);
        assert_eq!(cov.hits(0), 2);
        assert_eq!(cov.hits(2), 1);
        assert!(cov.report_phase().is_ok());
    }

    #[test]
    fn missing_phase_is_named() {
        let cov = coverage(1, false);
        (0..PHASE_COUNT).filter(|&p| p != 17).for_each(|p| cov.sample(p));
        match cov.report_phase() {
            Err(TbError::Coverage { missed }) => {
                assert_eq!(missed.into_iter().collect::<Vec<_>>(), vec![17])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn check_is_skipped_for_coarse_steps_and_when_disabled() {
        let cov = coverage(4, false);
        cov.sample(0);
        assert!(cov.report_phase().is_ok());
        let cov = coverage(1, true);
        assert!(cov.report_phase().is_ok());
        assert_eq!(cov.missed().len(), PHASE_COUNT as usize);
    }
}
