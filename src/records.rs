//! Timing and outcome records emitted by the engine.

use crate::context::Context;
use serde::Serialize;

/// One step invocation's timing and outcome.
#[derive(Debug, Clone, Serialize)]
pub struct RequestRecord {
    pub name: String,
    pub id: u64,
    pub start: u64,
    pub end: u64,
    pub result: bool,
    pub context_before: Context,
    pub context_after: Context,
    pub exception: Option<String>,
}

impl RequestRecord {
    /// Wall-clock duration of this request in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// One scenario walk by one virtual user: the ordered requests it made.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioRecord {
    pub name: String,
    pub id: u64,
    pub start: u64,
    pub end: u64,
    pub requests: Vec<RequestRecord>,
}

impl ScenarioRecord {
    /// Build a record from a non-empty, start-ordered list of requests.
    ///
    /// Per the data model, `start`/`end` are derived from the first/last
    /// request rather than carried separately.
    pub fn from_requests(name: String, id: u64, requests: Vec<RequestRecord>) -> Self {
        let start = requests.first().map(|r| r.start).unwrap_or(0);
        let end = requests.last().map(|r| r.end).unwrap_or(start);
        Self {
            name,
            id,
            start,
            end,
            requests,
        }
    }

    pub fn success(&self) -> bool {
        self.requests.iter().all(|r| r.result)
    }

    pub fn duration_ms(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}
