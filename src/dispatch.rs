//! Scheduled scan dispatch.
//!
//! `scan_results.json` is the only memory between runs: it is loaded whole,
//! updated for the targets attempted in this run, and written back whole.
use crate::forge::ForgeApi;
use crate::summary::{RowKind, SummaryRow, ToSummaryRow};
use crate::util::{flatten_error_body, read_json, write_json};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

pub const EVENT_TYPE: &str = "scheduler";
pub const MANUAL_EVENT: &str = "workflow_dispatch";

const STATUS_SUCCESS: &str = "success";
const STATUS_FAILED: &str = "failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Scheduled,
    /// Re-triggered by hand; targets that already succeeded are left alone.
    Manual,
}

impl EventKind {
    pub fn from_event_name(name: &str) -> Self {
        if name == MANUAL_EVENT {
            EventKind::Manual
        } else {
            EventKind::Scheduled
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchTarget {
    pub repo_name: String,
    pub branch: String,
}

impl DispatchTarget {
    pub fn key(&self) -> String {
        format!("{}@{}", self.repo_name, self.branch)
    }
}

pub fn load_targets(path: &Path) -> Result<Vec<DispatchTarget>> {
    read_json(path)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    /// Empty when the stored entry carried no status; treated as not successful.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields written by other tooling survive the round trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DispatchResult {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            error: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
            error: Some(error),
            extra: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// One persisted entry. Entries that are not result objects are kept verbatim
/// so a hand-edited file never aborts the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredResult {
    Known(DispatchResult),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DispatchResults(BTreeMap<String, StoredResult>);

impl DispatchResults {
    /// Load persisted results; a missing file is an empty history.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no previous scan results");
            return Ok(Self::default());
        }
        read_json(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn get(&self, key: &str) -> Option<&DispatchResult> {
        match self.0.get(key)? {
            StoredResult::Known(result) => Some(result),
            StoredResult::Other(_) => None,
        }
    }

    pub fn insert(&mut self, key: String, result: DispatchResult) {
        self.0.insert(key, StoredResult::Known(result));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Triggered,
    PreviouslySuccessful,
    Rejected { status: u16, error: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub repo: String,
    pub branch: String,
    pub outcome: DispatchOutcome,
}

impl ToSummaryRow for DispatchRecord {
    fn summary_row(&self) -> SummaryRow {
        let (kind, status, details) = match &self.outcome {
            DispatchOutcome::Triggered => (
                RowKind::Attempted,
                "✅ Success".to_string(),
                "🚀 Triggered".to_string(),
            ),
            DispatchOutcome::PreviouslySuccessful => (
                RowKind::Skipped,
                "✅ Skipped".to_string(),
                "💥 Previously successful".to_string(),
            ),
            DispatchOutcome::Rejected { status, error } => (
                RowKind::Attempted,
                format!("❌ Failed ({status})"),
                format!("`{error}`"),
            ),
            DispatchOutcome::Failed { error } => (
                RowKind::Attempted,
                "❌ Failed".to_string(),
                format!("`{error}`"),
            ),
        };
        SummaryRow {
            kind,
            repo: self.repo.clone(),
            branch: Some(self.branch.clone()),
            status,
            details,
        }
    }
}

pub struct Scheduler<'a, F: ForgeApi> {
    forge: &'a F,
    event_type: String,
}

impl<'a, F: ForgeApi> Scheduler<'a, F> {
    pub fn new(forge: &'a F, event_type: &str) -> Self {
        Self {
            forge,
            event_type: event_type.to_string(),
        }
    }

    pub fn run(
        &self,
        targets: &[DispatchTarget],
        event: EventKind,
        results: &mut DispatchResults,
    ) -> Vec<DispatchRecord> {
        targets
            .iter()
            .map(|target| self.dispatch_one(target, event, results))
            .collect()
    }

    fn dispatch_one(
        &self,
        target: &DispatchTarget,
        event: EventKind,
        results: &mut DispatchResults,
    ) -> DispatchRecord {
        let key = target.key();
        let record = |outcome| DispatchRecord {
            repo: target.repo_name.clone(),
            branch: target.branch.clone(),
            outcome,
        };

        if event == EventKind::Manual
            && results.get(&key).is_some_and(DispatchResult::is_success)
        {
            tracing::info!(key = %key, "previously successful, skipping");
            return record(DispatchOutcome::PreviouslySuccessful);
        }

        let payload = json!({ "branch": target.branch });
        match self
            .forge
            .dispatch(&target.repo_name, &self.event_type, &payload)
        {
            Ok(response) if response.is_accepted() => {
                tracing::info!(key = %key, "dispatch triggered");
                results.insert(key, DispatchResult::success());
                record(DispatchOutcome::Triggered)
            }
            Ok(response) => {
                let error = flatten_error_body(&response.body);
                tracing::warn!(key = %key, status = response.status, error = %error, "dispatch rejected");
                results.insert(key, DispatchResult::failed(error.clone()));
                record(DispatchOutcome::Rejected {
                    status: response.status,
                    error,
                })
            }
            Err(err) => {
                let error = err.to_string();
                tracing::warn!(key = %key, error = %error, "dispatch failed");
                results.insert(key, DispatchResult::failed(error.clone()));
                record(DispatchOutcome::Failed { error })
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
