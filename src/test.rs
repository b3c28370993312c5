use futures::future::BoxFuture;
use std::time;

use crate::config::{ConfigDb, RunConfig, CREATE_ERRORS};
use crate::dut::Dut;
use crate::env::{self, TestContext};
use crate::error::TbResult;
use crate::sim::Simulator;
use crate::sim_if::Level;

pub type TestBody = fn(TestContext) -> BoxFuture<'static, TbResult>;

#[derive(Clone)]
pub struct Test {
    pub name: String,
    pub body: TestBody,
    /// The test passes when its body fails.
    pub expect_fail: bool,
    /// Adjusts the configuration before the test is elaborated.
    pub configure: Option<fn(&mut ConfigDb)>,
}

impl Test {
    pub fn new(name: &str, body: TestBody) -> Self {
        Self {
            name: name.to_string(),
            body,
            expect_fail: false,
            configure: None,
        }
    }

    pub fn expect_fail(mut self) -> Self {
        self.expect_fail = true;
        self
    }

    pub fn configure(mut self, f: fn(&mut ConfigDb)) -> Self {
        self.configure = Some(f);
        self
    }

    /// Runs the test on a fresh simulator around `dut`.
    pub fn run<D: Dut>(&self, db: &ConfigDb, dut: D) -> TestOutcome {
        let mut db = db.clone();
        if let Some(configure) = self.configure {
            configure(&mut db);
        }
        let time_start = time::Instant::now();
        let mut outcome = TestOutcome {
            name: self.name.clone(),
            expect_fail: self.expect_fail,
            result: Ok(()),
            time_secs: 0.0,
            sim_time_ns: 0,
            cycles: 0,
        };

        let cfg = match RunConfig::from_db(&db) {
            Ok(cfg) => cfg,
            Err(e) => {
                outcome.result = Err(e);
                return outcome;
            }
        };
        let mut sim = Simulator::new(dut, &cfg);
        outcome.result = sim.root().and_then(|root| {
            let ctx = TestContext {
                root,
                spawner: sim.spawner(),
                cfg: cfg.clone(),
            };
            let top = sim.spawner().spawn(&self.name, (self.body)(ctx));
            sim.run_until(top)
        });
        sim.tear_down();

        outcome.time_secs = time_start.elapsed().as_secs_f64();
        outcome.sim_time_ns = sim.sim_time_ns();
        outcome.cycles = sim.cycles();
        let msg = match &outcome.result {
            Ok(()) => "body passed".to_string(),
            Err(e) => format!("body failed: {}", e),
        };
        let level = if outcome.passed() { Level::Info } else { Level::Error };
        sim.sim().log(
            level,
            "runner",
            &format!("TEST {}: {} -> {}", self.name, msg, outcome.status()),
        );
        outcome
    }
}

impl std::fmt::Debug for Test {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.name)
            .field("expect_fail", &self.expect_fail)
            .finish()
    }
}

#[derive(Debug)]
pub struct TestOutcome {
    pub name: String,
    pub expect_fail: bool,
    pub result: TbResult,
    pub time_secs: f64,
    pub sim_time_ns: u64,
    pub cycles: u64,
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        self.result.is_ok() != self.expect_fail
    }

    pub fn status(&self) -> &'static str {
        match (self.passed(), self.expect_fail) {
            (true, false) => "passed",
            (true, true) => "passed (expected fail)",
            (false, false) => "failed",
            (false, true) => "failed (unexpected pass)",
        }
    }

    pub fn message(&self) -> String {
        match &self.result {
            Ok(()) if self.expect_fail => "test passed but was expected to fail".to_string(),
            Ok(()) => String::new(),
            Err(e) => e.to_string(),
        }
    }

    /// Simulated nanoseconds per wall clock second.
    pub fn sim_speed(&self) -> f64 {
        if self.time_secs > 0.0 {
            self.sim_time_ns as f64 / self.time_secs
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    tests: Vec<Test>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    /// The SinCosTable regression.
    pub fn builtin() -> Self {
        let mut suite = Self::new();
        suite.push(Test::new("sin_cos_table_test", env::sin_cos_table_test));
        suite.push(Test::new("parallel_test", env::parallel_test));
        suite.push(
            Test::new("sin_cos_table_test_errors", env::sin_cos_table_test)
                .configure(|db| {
                    db.set(CREATE_ERRORS, true);
                })
                .expect_fail(),
        );
        suite
    }

    pub fn push(&mut self, test: Test) {
        self.tests.push(test);
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tests.iter().map(|t| t.name.as_str()).collect()
    }

    /// Keeps only the named tests. Returns the names not found.
    pub fn select(&mut self, names: &[String]) -> Vec<String> {
        let missing = names
            .iter()
            .filter(|n| !self.tests.iter().any(|t| &t.name == *n))
            .cloned()
            .collect();
        if !names.is_empty() {
            self.tests.retain(|t| names.contains(&t.name));
        }
        missing
    }

    /// Runs every test in order, each on its own simulator built by `make_dut`.
    pub fn run<D: Dut>(&self, db: &ConfigDb, make_dut: impl Fn() -> D) -> Vec<TestOutcome> {
        self.tests.iter().map(|t| t.run(db, make_dut())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PHASE_STEP, VERBOSITY};
    use crate::dut::SinCosTable;
    use crate::error::TbError;
    use futures::FutureExt;

    fn quiet_db() -> ConfigDb {
        let mut db = ConfigDb::new();
        db.set(VERBOSITY, "critical").set(PHASE_STEP, 256u64);
        db
    }

    fn failing(_ctx: TestContext) -> BoxFuture<'static, TbResult> {
        async { Err(TbError::Stalled(0)) }.boxed()
    }

    #[test]
    fn expected_failure_inverts_the_verdict() {
        let db = quiet_db();
        let out = Test::new("f", failing).run(&db, SinCosTable::new());
        assert!(!out.passed());
        assert_eq!(out.status(), "failed");
        let out = Test::new("f", failing).expect_fail().run(&db, SinCosTable::new());
        assert!(out.passed());
    }

    #[test]
    fn selection_reports_unknown_names() {
        let mut suite = TestSuite::builtin();
        assert_eq!(suite.len(), 3);
        let missing = suite.select(&["parallel_test".to_string(), "nope".to_string()]);
        assert_eq!(missing, vec!["nope".to_string()]);
        assert_eq!(suite.names(), vec!["parallel_test"]);
    }

    #[test]
    fn builtin_suite_passes_with_coarse_step() {
        let outcomes = TestSuite::builtin().run(&quiet_db(), SinCosTable::new);
        assert_eq!(outcomes.len(), 3);
        for out in &outcomes {
            assert!(out.passed(), "{}: {:?}", out.name, out.result);
            assert!(out.cycles > 0);
        }
        assert!(matches!(
            outcomes[2].result,
            Err(TbError::Scoreboard { orphans: 0, .. })
        ));
    }
}
