use std::fmt;
use std::sync::Arc;

use crate::bfm::InputSample;
use crate::error::{TbError, TbResult};
use crate::model::{Phase, ReferenceModel, SinCos, Validity};
use crate::sim_if::{Level, SimRef};
use crate::tlm::{Fifo, Subscriber};

/// A single failed comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckFailure {
    /// A result arrived with no input sample to pair it with.
    Correlation { actual: SinCos },
    Mismatch {
        phase: Phase,
        expected: SinCos,
        actual: SinCos,
    },
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckFailure::Correlation { actual } => {
                write!(f, "no input data registered for response {}", actual)
            }
            CheckFailure::Mismatch {
                phase,
                expected,
                actual,
            } => write!(
                f,
                "FAILED: sin({p})={}, expected({}); cos({p})={}, expected({})",
                actual.sin,
                expected.sin,
                actual.cos,
                expected.cos,
                p = phase
            ),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScoreboardReport {
    pub checked: usize,
    pub matched: usize,
    pub failures: Vec<CheckFailure>,
    /// Input samples left without a result at the end of the check.
    pub unanswered: usize,
}

impl ScoreboardReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn mismatches(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f, CheckFailure::Mismatch { .. }))
            .count()
    }

    pub fn orphans(&self) -> usize {
        self.failures.len() - self.mismatches()
    }

    pub fn result(&self) -> TbResult {
        if self.passed() {
            Ok(())
        } else {
            Err(TbError::Scoreboard {
                mismatches: self.mismatches(),
                orphans: self.orphans(),
            })
        }
    }

    pub fn result_str(&self) -> String {
        format!(
            "checked={}, matched={}, mismatches={}, orphans={}, unanswered={}",
            self.checked,
            self.matched,
            self.mismatches(),
            self.orphans(),
            self.unanswered
        )
    }
}

/// Predicts the DUT output for every observed input and compares it to the observed results.
///
/// Inputs and results arrive on independent analysis FIFOs and are paired in arrival order.
pub struct Scoreboard {
    input_fifo: Fifo<InputSample>,
    result_fifo: Fifo<SinCos>,
    model: ReferenceModel,
    error_mode: bool,
    sim: SimRef,
}

impl Scoreboard {
    pub fn new(model: ReferenceModel, error_mode: bool, sim: SimRef) -> Self {
        Self {
            input_fifo: Fifo::unbounded(),
            result_fifo: Fifo::unbounded(),
            model,
            error_mode,
            sim,
        }
    }

    pub fn input_export(&self) -> Arc<dyn Subscriber<InputSample>> {
        Arc::new(self.input_fifo.clone())
    }

    pub fn result_export(&self) -> Arc<dyn Subscriber<SinCos>> {
        Arc::new(self.result_fifo.clone())
    }

    fn log(&self, level: Level, msg: &str) {
        self.sim.log(level, "scoreboard", msg);
    }

    /// Drains both FIFOs and compares every result. Fails only on a malformed input sample,
    /// comparison failures are collected in the report.
    pub fn check_phase(&self) -> TbResult<ScoreboardReport> {
        let mut report = ScoreboardReport::default();
        while let Some(actual) = self.result_fifo.try_get() {
            report.checked += 1;
            let Some(input) = self.input_fifo.try_get() else {
                let failure = CheckFailure::Correlation { actual };
                self.log(Level::Critical, &failure.to_string());
                report.failures.push(failure);
                continue;
            };
            let validity = Validity::scalar(input.valid)?;
            let expected = self
                .model
                .predict(input.phase.value(), &validity, self.error_mode)?;
            if expected == actual {
                report.matched += 1;
                self.log(
                    Level::Info,
                    &format!(
                        "PASSED: sin({p})={}; cos({p})={}",
                        actual.sin,
                        actual.cos,
                        p = input.phase
                    ),
                );
            } else {
                let failure = CheckFailure::Mismatch {
                    phase: input.phase,
                    expected,
                    actual,
                };
                self.log(Level::Error, &failure.to_string());
                report.failures.push(failure);
            }
        }
        report.unanswered = self.input_fifo.len();
        if report.unanswered > 0 {
            self.log(
                Level::Warning,
                &format!("{} input samples without result", report.unanswered),
            );
        }
        self.log(Level::Info, &report.result_str());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;
    use crate::model::Backend;

    fn scoreboard(error_mode: bool) -> Scoreboard {
        let sim: SimRef = Kernel::new("top", Level::Critical);
        Scoreboard::new(ReferenceModel::new(Backend::Lookup), error_mode, sim)
    }

    fn input(p: u32) -> InputSample {
        InputSample {
            phase: Phase::new(p).unwrap(),
            valid: 1,
        }
    }

    #[test]
    fn matching_results_pass() {
        let sb = scoreboard(false);
        sb.input_export().write(&input(0));
        sb.input_export().write(&input(1024));
        sb.result_export().write(&SinCos::new(0, 32767));
        sb.result_export().write(&SinCos::new(32767, 0));
        let report = sb.check_phase().unwrap();
        assert_eq!((report.checked, report.matched), (2, 2));
        assert!(report.result().is_ok());
    }

    #[test]
    fn mismatch_is_reported_with_phase_and_values() {
        let sb = scoreboard(false);
        sb.input_export().write(&input(0));
        sb.input_export().write(&input(1));
        sb.result_export().write(&SinCos::new(5, 32767));
        sb.result_export().write(&SinCos::new(51, 32767));
        let report = sb.check_phase().unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.mismatches(), 2);
        assert_eq!(
            report.failures[0],
            CheckFailure::Mismatch {
                phase: Phase::new(0).unwrap(),
                expected: SinCos::new(0, 32767),
                actual: SinCos::new(5, 32767),
            }
        );
        assert!(matches!(
            report.result(),
            Err(TbError::Scoreboard { mismatches: 2, orphans: 0 })
        ));
    }

    #[test]
    fn result_without_input_is_a_correlation_failure() {
        let sb = scoreboard(false);
        sb.input_export().write(&input(0));
        sb.result_export().write(&SinCos::new(0, 32767));
        sb.result_export().write(&SinCos::new(1, 1));
        let report = sb.check_phase().unwrap();
        assert_eq!(report.matched, 1);
        assert_eq!(report.orphans(), 1);
        assert!(!report.passed());
    }

    #[test]
    fn error_mode_expects_shifted_phase() {
        let sb = scoreboard(true);
        sb.input_export().write(&input(0));
        sb.result_export().write(&SinCos::new(0, 32767));
        assert_eq!(sb.check_phase().unwrap().mismatches(), 1);

        let sb = scoreboard(true);
        sb.input_export().write(&input(0));
        sb.result_export().write(&ReferenceModel::default().eval(Phase::new(256).unwrap()));
        assert!(sb.check_phase().unwrap().passed());
    }

    #[test]
    fn leftover_inputs_are_counted() {
        let sb = scoreboard(false);
        sb.input_export().write(&input(3));
        let report = sb.check_phase().unwrap();
        assert_eq!(report.unanswered, 1);
        assert!(report.passed());
    }
}
