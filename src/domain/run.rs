//! Update-job run records
//!
//! A run is created when an update is requested, mutated by its worker while
//! the pipeline executes, and becomes terminal once it reaches `completed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Run lifecycle: `running → completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            other => Err(format!("Invalid RunStatus: {other}")),
        }
    }
}

/// One timestamped, human-readable line of a run log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub time: DateTime<Utc>,
    pub message: String,
}

/// Counters aggregated over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub discovered: u64,
    pub parsed: u64,
    pub added: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub errors: u64,
}

/// Full state of one update-job execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub job_id: String,
    pub status: RunStatus,
    pub step_logs: Vec<RunLogEntry>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: RunCounts,
}

impl Run {
    pub fn start(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: RunStatus::Running,
            step_logs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
            counts: RunCounts::default(),
        }
    }

    pub fn push_log(&mut self, message: impl Into<String>) {
        self.step_logs.push(RunLogEntry {
            time: Utc::now(),
            message: message.into(),
        });
    }

    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_terminal(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            job_id: self.job_id.clone(),
            status: self.status,
            started_at: self.started_at,
            finished_at: self.finished_at,
            counts: self.counts,
        }
    }
}

/// Run without its log, for source overviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub job_id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub counts: RunCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_lifecycle() {
        let mut run = Run::start("job-1");
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        run.push_log("Starting catalog sync job.");
        run.complete();

        assert!(run.is_terminal());
        assert!(run.finished_at.is_some());
        assert_eq!(run.step_logs.len(), 1);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [RunStatus::Running, RunStatus::Completed] {
            assert_eq!(status.as_str().parse::<RunStatus>(), Ok(status));
        }
        assert!("failed".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&RunStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}
