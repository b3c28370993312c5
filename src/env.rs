use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::bfm::{InputSample, SinCosBfm};
use crate::config::RunConfig;
use crate::coverage::Coverage;
use crate::driver::{Driver, DriverStats};
use crate::error::{TbError, TbResult};
use crate::executor::{JoinHandle, Spawner};
use crate::item::StimulusItem;
use crate::model::ReferenceModel;
use crate::monitor::Monitor;
use crate::scoreboard::{Scoreboard, ScoreboardReport};
use crate::sequence::{Composition, SequenceLog, Sequencer, TestAllSeq};
use crate::signal::SimObject;
use crate::sim_if::{Level, SimRef};
use crate::tb_obj::TbObj;

/// Everything a test body gets handed by the runner.
#[derive(Clone)]
pub struct TestContext {
    pub root: SimObject,
    pub spawner: Spawner,
    pub cfg: RunConfig,
}

/// Verification environment around one SinCosTable instance.
///
/// Built from the DUT root, wired up at construction:
/// input monitor -> {scoreboard inputs, coverage}, driver -> scoreboard results.
pub struct SinCosTableEnv {
    cfg: RunConfig,
    sim: SimRef,
    seqr: Sequencer,
    bfm: Arc<SinCosBfm>,
    driver: Option<Driver>,
    input_data_mon: Option<Monitor<InputSample>>,
    driver_stats: TbObj<DriverStats>,
    tasks: TbObj<Vec<JoinHandle>>,
    coverage: Coverage,
    scoreboard: Scoreboard,
}

impl SinCosTableEnv {
    pub fn new(root: &SimObject, cfg: &RunConfig) -> TbResult<Self> {
        let sim = root.sim().clone();
        let bfm = SinCosBfm::new(root)?;
        let (seqr, seq_item_port) = Sequencer::new();

        let mut driver = Driver::new(seq_item_port, bfm.clone(), sim.clone());
        let mut input_data_mon = Monitor::new("input_data_mon", bfm.input_queue(), sim.clone());
        let coverage = Coverage::new(cfg.phase_step, cfg.disable_coverage_errors, sim.clone());
        let scoreboard = Scoreboard::new(
            ReferenceModel::new(cfg.backend),
            cfg.create_errors,
            sim.clone(),
        );

        input_data_mon.ap.connect(scoreboard.input_export());
        input_data_mon.ap.connect(Arc::new(coverage.clone()));
        driver.ap.connect(scoreboard.result_export());

        Ok(Self {
            cfg: cfg.clone(),
            sim,
            seqr,
            bfm,
            driver_stats: driver.stats(),
            driver: Some(driver),
            input_data_mon: Some(input_data_mon),
            tasks: TbObj::new(Vec::new()),
            coverage,
            scoreboard,
        })
    }

    pub fn sequencer(&self) -> Sequencer {
        self.seqr.clone()
    }

    pub fn bfm(&self) -> &Arc<SinCosBfm> {
        &self.bfm
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn driver_stats(&self) -> DriverStats {
        *self.driver_stats.get()
    }

    /// Spawns the driver and the input monitor. The driver resets the BFM and starts its loops.
    pub fn start(&mut self, spawner: &Spawner) {
        let mut handles = Vec::with_capacity(2);
        if let Some(driver) = self.driver.take() {
            handles.push(spawner.spawn("driver", driver.run(spawner.clone())));
        }
        if let Some(mon) = self.input_data_mon.take() {
            handles.push(spawner.spawn("input_data_mon", mon.run()));
        }
        self.tasks.with_mut(|t| t.extend(handles));
    }

    /// First error of a component task that already finished. Finished tasks are forgotten.
    fn task_failure(&self) -> TbResult {
        self.tasks.with_mut(|tasks| {
            let mut failure = Ok(());
            tasks.retain_mut(|task| match task.try_join() {
                None => true,
                Some(result) => {
                    if failure.is_ok() {
                        failure = result;
                    }
                    false
                }
            });
            failure
        })
    }

    /// Compares every completed item against an item carrying the predicted values.
    /// Returns the number of items that differ.
    pub fn check_items(&self, log: &SequenceLog) -> usize {
        let mut differing = 0;
        for (name, items) in log.get().iter() {
            for item in items {
                let ideal = StimulusItem::new(item.name(), item.phase(), item.validity().clone());
                if !item.matches(&ideal, self.cfg.compare_validity) {
                    differing += 1;
                    self.sim.log(
                        Level::Debug,
                        "env",
                        &format!("{}: got {}, ideal {}", name, item, ideal),
                    );
                }
            }
        }
        if differing > 0 {
            self.sim.log(
                Level::Warning,
                "env",
                &format!("{} completed items differ from their prediction", differing),
            );
        }
        differing
    }

    /// Scoreboard check followed by the coverage report. Both always run, the scoreboard's
    /// failure takes precedence. A driver or monitor that died takes precedence over both.
    pub fn check(&self) -> TbResult<ScoreboardReport> {
        self.task_failure()?;
        let report = self.scoreboard.check_phase()?;
        let coverage = self.coverage.report_phase();
        report.result()?;
        coverage?;
        Ok(report)
    }

    /// Runs both phase sweeps with the given composition and checks the outcome.
    pub async fn run_test_all(&self, composition: Composition, spawner: Spawner) -> TbResult {
        let log = SequenceLog::new(Vec::new());
        let test_all = TestAllSeq {
            composition,
            step: self.cfg.phase_step,
            seed: self.cfg.seed,
            validity_len: self.cfg.validity_len,
        };
        test_all.run(self.sequencer(), spawner, log.clone()).await?;
        let stats = self.driver_stats();
        if stats.max_in_flight > 1 {
            return Err(TbError::InFlight(stats.max_in_flight));
        }
        self.check_items(&log);
        self.check().map(|_| ())
    }
}

async fn test_all(ctx: TestContext, composition: Composition) -> TbResult {
    let mut env = SinCosTableEnv::new(&ctx.root, &ctx.cfg)?;
    env.start(&ctx.spawner);
    env.run_test_all(composition, ctx.spawner.clone()).await
}

/// Sequential sweep followed by the random one.
pub fn sin_cos_table_test(ctx: TestContext) -> BoxFuture<'static, TbResult> {
    test_all(ctx, Composition::Serial).boxed()
}

/// Both sweeps forked and joined.
pub fn parallel_test(ctx: TestContext) -> BoxFuture<'static, TbResult> {
    test_all(ctx, Composition::Parallel).boxed()
}
