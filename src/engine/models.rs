use crate::{executor::ResponseData, script::TestResult};

/// Everything that happened while running one request from a collection.
#[derive(Debug, Clone)]
pub struct RequestRun {
    pub breadcrumb: Vec<String>,
    pub name: String,
    pub response: ResponseData,
    pub prerequest: TestResult,
    pub tests: TestResult,
}

impl RequestRun {
    pub fn path(&self) -> String {
        let mut parts = self.breadcrumb.clone();
        parts.push(self.name.clone());
        parts.join("/")
    }

    pub fn passed(&self) -> bool {
        self.response.error.is_none() && self.prerequest.passed() && self.tests.passed()
    }
}
