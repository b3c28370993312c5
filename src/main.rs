use std::path::PathBuf;
use std::process;

use clap::Parser;

use sincos_tb::config::{self, ConfigDb};
use sincos_tb::dut::SinCosTable;
use sincos_tb::junit::create_junit_xml;
use sincos_tb::report::summary_table;
use sincos_tb::test::TestSuite;

/// Runs the SinCosTable regression on the in-process simulator.
#[derive(Parser, Debug)]
#[command(name = "sincos-tb", version, about = "SinCosTable verification environment")]
struct Cli {
    /// Tests to run, all built-in tests if empty.
    tests: Vec<String>,

    /// List the available tests and exit.
    #[arg(long)]
    list: bool,

    /// Seed for the random sequences and validity strobes.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Distance between consecutive phases of a sweep.
    #[arg(long, default_value_t = 1)]
    step: u64,

    /// Predict with the phase shifted by 256, making every comparison fail.
    #[arg(long)]
    create_errors: bool,

    /// Don't fail on missed phases.
    #[arg(long)]
    disable_coverage_errors: bool,

    /// Use the precalculated reference table.
    #[arg(long)]
    precalculate: bool,

    /// Ignore the validity strobe when comparing completed items.
    #[arg(long)]
    ignore_validity: bool,

    /// Inject a calibration fault into the DUT, shifting its phase.
    #[arg(long, default_value_t = 0)]
    dut_phase_offset: u32,

    /// Stop a test that has not finished after this many clock cycles.
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Where to write the JUnit report.
    #[arg(long, default_value = "results.xml")]
    junit: PathBuf,

    /// debug, info, warning, error or critical.
    #[arg(short, long, default_value = "info")]
    verbosity: String,
}

impl Cli {
    fn config_db(&self) -> ConfigDb {
        let mut db = ConfigDb::new();
        db.set(config::SEED, self.seed)
            .set(config::PHASE_STEP, self.step)
            .set(config::CREATE_ERRORS, self.create_errors)
            .set(config::DISABLE_COVERAGE_ERRORS, self.disable_coverage_errors)
            .set(config::PRECALCULATE, self.precalculate)
            .set(config::VERBOSITY, self.verbosity.as_str());
        if self.ignore_validity {
            db.set(config::COMPARE_VALIDITY, "ignore");
        }
        if let Some(max) = self.max_cycles {
            db.set(config::MAX_CYCLES, max);
        }
        db
    }
}

fn main() {
    let cli = Cli::parse();

    let mut suite = TestSuite::builtin();
    if cli.list {
        for name in suite.names() {
            println!("{}", name);
        }
        return;
    }
    let missing = suite.select(&cli.tests);
    if !missing.is_empty() {
        eprintln!("unknown tests: {}", missing.join(", "));
        process::exit(2);
    }

    let db = cli.config_db();
    let offset = cli.dut_phase_offset;
    let outcomes = suite.run(&db, || SinCosTable::new().with_calibration_offset(offset));

    println!("{}", summary_table(&outcomes));
    if let Err(e) = create_junit_xml("sincos_tb", &outcomes, &cli.junit) {
        eprintln!("{}", e);
        process::exit(2);
    }
    if outcomes.iter().any(|t| !t.passed()) {
        process::exit(1);
    }
}
