//! Response documents consumed by the job status operations.
//!
//! Only the fields the connector reads are modelled; everything else in the Prime payload is
//! ignored. Record lookups (devices, inventory, clients) are passed through as raw JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token Prime places last in a job summary's display name once the job has finished.
pub const JOB_COMPLETED: &str = "COMPLETED";

/// Response of `data/JobSummary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummaryResponse {
    /// Query envelope
    #[serde(rename = "queryResponse")]
    pub query_response: QueryResponse,
}

/// `queryResponse` envelope of a data query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Matching entities
    #[serde(rename = "entityId", default)]
    pub entity_id: Vec<EntityId>,

    /// Number of matching entities reported by the server
    #[serde(rename = "@count", skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

/// Reference to one entity in a query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityId {
    /// Comma-separated summary, e.g. `"42,config_backup,COMPLETED"`
    #[serde(rename = "@displayName")]
    pub display_name: String,

    /// Link to the full entity
    #[serde(rename = "@url", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Entity id
    #[serde(rename = "$", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl JobSummaryResponse {
    /// Status token of the first job summary: the last comma-separated field, trimmed.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        let entity = self.query_response.entity_id.first()?;
        entity.display_name.rsplit(',').next().map(str::trim)
    }

    /// True if the first job summary reports [`JOB_COMPLETED`].
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status() == Some(JOB_COMPLETED)
    }
}

/// Response of `op/jobService/runhistory.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHistoryResponse {
    /// Operation envelope
    #[serde(rename = "mgmtResponse")]
    pub mgmt_response: MgmtResponse,
}

/// `mgmtResponse` envelope of an operation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MgmtResponse {
    /// Jobs matching the requested name
    #[serde(default)]
    pub job: Vec<JobRunHistory>,
}

/// Run history of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRunHistory {
    /// Job name
    #[serde(rename = "jobName", skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,

    /// Job type
    #[serde(rename = "jobType", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,

    /// Recorded runs, most recent first
    #[serde(rename = "runInstances", default)]
    pub run_instances: RunInstances,
}

/// Wrapper around the list of runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInstances {
    /// Individual runs
    #[serde(rename = "runInstance", default)]
    pub run_instance: Vec<RunInstance>,
}

/// One execution of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInstance {
    /// Outcome of the run, e.g. `SUCCESS`
    #[serde(rename = "resultStatus")]
    pub result_status: String,

    /// Run status, e.g. `COMPLETED`
    #[serde(rename = "runStatus", skip_serializing_if = "Option::is_none")]
    pub run_status: Option<String>,

    /// Start time as reported by the server
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// Completion time as reported by the server
    #[serde(rename = "completionTime", skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
}

impl RunHistoryResponse {
    /// `resultStatus` of the first run of the first job.
    #[must_use]
    pub fn latest_result_status(&self) -> Option<&str> {
        self.mgmt_response
            .job
            .first()?
            .run_instances
            .run_instance
            .first()
            .map(|run| run.result_status.as_str())
    }
}

/// Outcome of a job run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobResult {
    /// `SUCCESS`
    Success,
    /// `FAILURE`
    Failure,
    /// Any other status, kept verbatim
    Other(String),
}

impl JobResult {
    /// Interpret a `resultStatus` value.
    #[must_use]
    pub fn from_status(status: &str) -> Self {
        match status {
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Failure => f.write_str("FAILURE"),
            Self::Other(status) => f.write_str(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(display_name: &str) -> JobSummaryResponse {
        serde_json::from_value(json!({
            "queryResponse": {
                "@count": 1,
                "entityId": [{ "@displayName": display_name, "$": "4711" }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn completed_when_last_token_is_completed() {
        assert!(summary("foo, bar, COMPLETED").is_completed());
        assert!(summary("4711,config_backup,COMPLETED ").is_completed());
    }

    #[test]
    fn not_completed_otherwise() {
        let response = summary("foo, bar, RUNNING");
        assert_eq!(response.status(), Some("RUNNING"));
        assert!(!response.is_completed());

        // only the last token counts
        assert!(!summary("COMPLETED, bar, SCHEDULED").is_completed());
    }

    #[test]
    fn empty_summary_has_no_status() {
        let response: JobSummaryResponse =
            serde_json::from_value(json!({ "queryResponse": { "@count": 0 } })).unwrap();
        assert_eq!(response.status(), None);
        assert!(!response.is_completed());
    }

    #[test]
    fn latest_result_status_reads_first_run() {
        let response: RunHistoryResponse = serde_json::from_value(json!({
            "mgmtResponse": {
                "job": [{
                    "jobName": "config_backup",
                    "runInstances": {
                        "runInstance": [
                            { "resultStatus": "FAILURE", "runStatus": "COMPLETED" },
                            { "resultStatus": "SUCCESS", "runStatus": "COMPLETED" }
                        ]
                    }
                }]
            }
        }))
        .unwrap();

        assert_eq!(response.latest_result_status(), Some("FAILURE"));
    }

    #[test]
    fn latest_result_status_missing_runs() {
        let response: RunHistoryResponse = serde_json::from_value(json!({
            "mgmtResponse": { "job": [{ "jobName": "never_ran" }] }
        }))
        .unwrap();
        assert_eq!(response.latest_result_status(), None);
    }

    #[test]
    fn job_result_from_status() {
        assert_eq!(JobResult::from_status("SUCCESS"), JobResult::Success);
        assert_eq!(JobResult::from_status("FAILURE"), JobResult::Failure);
        assert_eq!(
            JobResult::from_status("IN_PROGRESS"),
            JobResult::Other("IN_PROGRESS".to_string())
        );
        assert_eq!(JobResult::Other("PARTIAL".to_string()).to_string(), "PARTIAL");
    }
}
