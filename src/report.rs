use num_format::{Locale, ToFormattedString};
use prettytable::{format, Cell, Row, Table};

use crate::test::TestOutcome;

/// Per test summary with a totals row.
pub fn summary_table(outcomes: &[TestOutcome]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(
        ["TEST", "RESULT", "TIME (s)", "SIM TIME (ns)", "CYCLES", "SIM SPEED (ns/s)"]
            .iter()
            .map(|t| Cell::new(t))
            .collect(),
    ));

    let mut total_time = 0.0;
    let mut total_sim_time = 0;
    for t in outcomes {
        total_time += t.time_secs;
        total_sim_time += t.sim_time_ns;
        table.add_row(Row::new(vec![
            Cell::new(&t.name),
            Cell::new(t.status()),
            Cell::new(&format!("{:.3}", t.time_secs)),
            Cell::new(&t.sim_time_ns.to_formatted_string(&Locale::en)),
            Cell::new(&t.cycles.to_formatted_string(&Locale::en)),
            Cell::new(&format!("{:.0}", t.sim_speed())),
        ]));
    }

    let passed = outcomes.iter().filter(|t| t.passed()).count();
    let speed = if total_time > 0.0 {
        total_sim_time as f64 / total_time
    } else {
        0.0
    };
    table.add_row(Row::new(vec![
        Cell::new("TOTAL"),
        Cell::new(&format!("{}/{} passed", passed, outcomes.len())),
        Cell::new(&format!("{:.3}", total_time)),
        Cell::new(&total_sim_time.to_formatted_string(&Locale::en)),
        Cell::new(""),
        Cell::new(&format!("{:.0}", speed)),
    ]));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_every_test_and_totals() {
        let outcomes = vec![
            TestOutcome {
                name: "a".into(),
                expect_fail: false,
                result: Ok(()),
                time_secs: 0.5,
                sim_time_ns: 12_340,
                cycles: 1_234,
            },
            TestOutcome {
                name: "b".into(),
                expect_fail: true,
                result: Ok(()),
                time_secs: 0.5,
                sim_time_ns: 10,
                cycles: 1,
            },
        ];
        let table = summary_table(&outcomes);
        assert_eq!(table.len(), 3);
        let text = table.to_string();
        assert!(text.contains("12,340"));
        assert!(text.contains("failed (unexpected pass)"));
        assert!(text.contains("1/2 passed"));
    }
}
