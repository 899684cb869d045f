use serde::Serialize;

use crate::dispatch::DispatchReport;

pub mod lifecycle;
pub mod review;
pub mod waitlist;

/// Result of one handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HandlerOutcome {
    Completed {
        pushes: usize,
        writes: usize,
    },
    Skipped {
        reason: &'static str,
    },
    /// Soft failure: a push was rejected. Writes that ran are kept.
    Failed {
        error: String,
        pushes: usize,
        writes: usize,
    },
}

impl HandlerOutcome {
    pub fn skipped(reason: &'static str) -> Self {
        HandlerOutcome::Skipped { reason }
    }
}

impl From<DispatchReport> for HandlerOutcome {
    fn from(report: DispatchReport) -> Self {
        match report.failure {
            Some(error) => HandlerOutcome::Failed {
                error,
                pushes: report.pushes,
                writes: report.writes,
            },
            None => HandlerOutcome::Completed {
                pushes: report.pushes,
                writes: report.writes,
            },
        }
    }
}

pub(crate) fn event_topic(event_id: &str) -> String {
    format!("event_{event_id}")
}
