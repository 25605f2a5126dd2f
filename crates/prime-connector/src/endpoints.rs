//! URL construction for the Prime Infrastructure REST resources used by the connector.

use crate::Result;
use prime_core::{ApiVersion, Error};
use url::Url;

/// A Prime Infrastructure resource addressed by the connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// Summary of a job, looked up by job name
    JobSummary(&'a str),
    /// Run history of a job, looked up by job name
    RunHistory(&'a str),
    /// Device record by device id
    Device(&'a str),
    /// Inventory details by device id
    InventoryDetails(&'a str),
    /// Client record by id
    Client(&'a str),
    /// Access point looked up by name
    AccessPoint(&'a str),
}

impl Endpoint<'_> {
    /// Resolve the endpoint against the server base URL.
    ///
    /// Job and access point names are sent quoted, e.g. `jobName="nightly"`, because Prime
    /// otherwise treats the value as a prefix match.
    pub fn url(&self, base: &Url, version: ApiVersion) -> Result<Url> {
        let mut url = base.clone();
        let (resource, id, query) = match *self {
            Self::JobSummary(job) => (["data", "JobSummary.json"], None, Some(("jobName", job))),
            Self::RunHistory(job) => (
                ["op", "jobService"],
                Some("runhistory".to_string()),
                Some(("jobName", job)),
            ),
            Self::Device(id) => (["data", "Devices"], Some(id.to_string()), None),
            Self::InventoryDetails(id) => {
                (["data", "InventoryDetails"], Some(id.to_string()), None)
            }
            Self::Client(id) => (["data", "Clients"], Some(id.to_string()), None),
            Self::AccessPoint(name) => {
                (["data", "AccessPoints.json"], None, Some(("name", name)))
            }
        };

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidEndpoint(format!("`{base}` cannot be a base URL")))?;
            segments
                .pop_if_empty()
                .extend(["webacs", "api", version.as_str()])
                .extend(resource);
            if let Some(id) = id {
                segments.push(&format!("{id}.json"));
            }
        }

        if let Some((key, value)) = query {
            url.query_pairs_mut()
                .append_pair(key, &format!("\"{value}\""));
        }

        Ok(url)
    }
}
