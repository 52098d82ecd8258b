use serde::Serialize;

use crate::scenarios::ScenarioResult;

#[derive(Debug, Serialize)]
pub struct Report {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub scenarios: Vec<ScenarioResult>,
}

impl Report {
    pub fn from_results(scenarios: Vec<ScenarioResult>) -> Self {
        let passed = scenarios.iter().filter(|s| s.passed).count();
        Self {
            total: scenarios.len(),
            failed: scenarios.len() - passed,
            passed,
            scenarios,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
