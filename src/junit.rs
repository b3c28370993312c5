use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};
use std::path::Path;

use crate::error::{TbError, TbResult};
use crate::test::TestOutcome;

pub fn create_junit_xml(suite_name: &str, outcomes: &[TestOutcome], path: &Path) -> TbResult {
    let mut test_cases = Vec::new();

    for t in outcomes {
        let duration = Duration::seconds_f64(t.time_secs);
        let tc = if t.passed() {
            TestCaseBuilder::success(&t.name, duration)
        } else {
            TestCaseBuilder::failure(&t.name, duration, t.status(), &t.message())
        }
        .build();
        test_cases.push(tc);
    }

    let test_suite = TestSuiteBuilder::new(suite_name)
        .add_testcases(test_cases)
        .build();
    let report = ReportBuilder::new().add_testsuite(test_suite).build();
    let file = std::fs::File::create(path)?;
    report
        .write_xml(file)
        .map_err(|e| TbError::Report(e.to_string()))
}
