#[test]
fn every_scenario_in_the_suite_passes() {
    let results = pdr_harness::run_all_scenarios();
    for r in &results {
        assert!(r.passed, "scenario {} failed: {}", r.name, r.detail);
    }
}

#[test]
fn the_report_aggregates_counts_correctly() {
    let report = pdr_harness::Report::from_results(pdr_harness::run_all_scenarios());
    assert_eq!(report.total, 6);
    assert_eq!(report.passed + report.failed, report.total);
}
