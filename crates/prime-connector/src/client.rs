//! Asynchronous Prime Infrastructure connector.

use crate::endpoints::Endpoint;
use crate::models::{JobResult, JobSummaryResponse, RunHistoryResponse, JOB_COMPLETED};
use crate::Result;
use prime_core::client::{classify_status, Backoff, ClientConfig, Outcome, RetryPolicy};
use prime_core::{ApiVersion, Error, PrimeConfig};
use reqwest::header::ACCEPT;
use reqwest::{Client, ClientBuilder, Method, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

const USER_AGENT: &str = concat!("prime-connector/", env!("CARGO_PKG_VERSION"));

/// Access point fetched by [`PrimeClient::print_test_access_point`].
pub const TEST_ACCESS_POINT: &str = "ESQ_4-430_5e3c";

/// HTTP verbs the connector issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    /// GET, no body
    Get,
    /// POST with a JSON body
    Post,
    /// PUT with a JSON body
    Put,
}

impl HttpVerb {
    /// Verb name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }

    fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Credentials {
    username: String,
    password: SecretString,
}

/// Builder for [`PrimeClient`].
pub struct PrimeClientBuilder {
    base_url: Url,
    credentials: Credentials,
    http_config: ClientConfig,
    api_version: ApiVersion,
    accept_invalid_certs: bool,
    backoff: Option<Arc<dyn Backoff>>,
}

impl PrimeClientBuilder {
    /// Create a builder for the specified base URL and API credentials.
    pub fn new(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|err| {
            Error::InvalidEndpoint(format!("Invalid Prime URL `{}`: {err}", base_url.as_ref()))
        })?;

        Ok(Self {
            base_url,
            credentials: Credentials {
                username: username.into(),
                password: SecretString::from(password.into()),
            },
            http_config: ClientConfig::new(),
            api_version: ApiVersion::default(),
            accept_invalid_certs: false,
            backoff: None,
        })
    }

    /// Create a builder from a validated [`PrimeConfig`].
    pub fn from_config(config: &PrimeConfig) -> Result<Self> {
        config.ensure_valid()?;

        let base_url = config.base_url()?;
        let http_config = ClientConfig::new()
            .with_timeout(config.timeout())
            .with_retry_policy(RetryPolicy::new().with_budget(config.retry_budget));

        Ok(Self {
            base_url,
            credentials: Credentials {
                username: config.username.clone(),
                password: SecretString::from(config.password.clone()),
            },
            http_config,
            api_version: config.api_version,
            accept_invalid_certs: config.accept_invalid_certs,
            backoff: None,
        })
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.http_config = self.http_config.with_retry_policy(retry);
        self
    }

    /// Replace the jittered backoff derived from the retry policy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        let backoff: Arc<dyn Backoff> = Arc::new(backoff);
        self.backoff = Some(backoff);
        self
    }

    /// Select the REST API generation.
    #[must_use]
    pub const fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Accept any TLS certificate the server presents.
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<PrimeClient> {
        let http_config = self.http_config;

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(http_config.timeout)
            .connect_timeout(http_config.connect_timeout)
            .pool_idle_timeout(http_config.pool_idle_timeout)
            .pool_max_idle_per_host(http_config.pool_max_idle_per_host)
            .gzip(http_config.enable_compression)
            .cookie_store(http_config.enable_cookies);

        if self.accept_invalid_certs {
            warn!(
                host = self.base_url.host_str().unwrap_or_default(),
                "TLS certificate verification disabled for Prime client"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build Prime HTTP client: {err}"))
        })?;

        let retry_policy = http_config.retry_policy;
        let backoff: Arc<dyn Backoff> = match self.backoff {
            Some(backoff) => backoff,
            None => Arc::new(retry_policy.backoff()),
        };

        Ok(PrimeClient {
            http,
            base_url: self.base_url,
            credentials: Arc::new(self.credentials),
            api_version: self.api_version,
            retry_policy,
            backoff,
        })
    }
}

/// Asynchronous Prime Infrastructure client.
///
/// Address and credentials are fixed at construction. Every call is independent: job status is
/// fetched fresh from the server each time and record payloads are handed to the caller.
#[derive(Clone)]
pub struct PrimeClient {
    http: Client,
    base_url: Url,
    credentials: Arc<Credentials>,
    api_version: ApiVersion,
    retry_policy: RetryPolicy,
    backoff: Arc<dyn Backoff>,
}

impl PrimeClient {
    /// Construct a client directly from the base URL and credentials.
    pub fn new(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        PrimeClientBuilder::new(base_url, username, password)?.build()
    }

    /// Construct a client from a [`PrimeConfig`].
    pub fn from_config(config: &PrimeConfig) -> Result<Self> {
        PrimeClientBuilder::from_config(config)?.build()
    }

    /// Start a builder pre-populated with the provided configuration.
    pub fn builder(config: &PrimeConfig) -> Result<PrimeClientBuilder> {
        PrimeClientBuilder::from_config(config)
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Return the API user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Return the REST API generation in use.
    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Return the retry policy in use.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Resolve an endpoint against this client's server and API version.
    pub fn endpoint_url(&self, endpoint: Endpoint<'_>) -> Result<Url> {
        endpoint.url(&self.base_url, self.api_version)
    }

    /// Perform an authenticated call, retrying while the server reports it is busy.
    ///
    /// `503` and `403` responses pause for one backoff delay and try again until `budget`
    /// attempts have been made. `401`, any other error status, and transport failures end the
    /// call immediately. POST and PUT require a body; GET must not have one.
    pub async fn execute_with_retry<B>(
        &self,
        verb: HttpVerb,
        url: &Url,
        body: Option<&B>,
        budget: u32,
    ) -> Result<Response>
    where
        B: Serialize + ?Sized,
    {
        if budget == 0 {
            return Err(Error::InvalidRequest(
                "retry budget must be at least 1".to_string(),
            ));
        }
        match (verb, body.is_some()) {
            (HttpVerb::Get, true) => {
                return Err(Error::InvalidRequest(
                    "GET requests do not carry a body".to_string(),
                ))
            }
            (HttpVerb::Post | HttpVerb::Put, false) => {
                return Err(Error::InvalidRequest(format!("{verb} requires a JSON body")))
            }
            _ => {}
        }

        let mut remaining = budget;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self
                .http
                .request(verb.method(), url.clone())
                .basic_auth(
                    &self.credentials.username,
                    Some(self.credentials.password.expose_secret()),
                )
                .header(ACCEPT, "application/json");
            if let Some(payload) = body {
                request = request.json(payload);
            }

            debug!(method = %verb, url = %url, attempt, "Sending Prime request");

            let response = match request.send().await {
                Ok(response) => response,
                Err(err) => {
                    let error = Error::from(err);
                    error!(method = %verb, url = %url, %error, "Prime request failed");
                    return Err(error);
                }
            };

            let status = response.status();
            match classify_status(status) {
                Outcome::Success => return Ok(response),
                Outcome::Retryable => {
                    remaining -= 1;
                    warn!(
                        status = status.as_u16(),
                        remaining,
                        "Too many API calls at once, delaying before retry"
                    );

                    if remaining == 0 {
                        error!(
                            method = %verb,
                            url = %url,
                            attempts = attempt,
                            "Retry budget exhausted, abandoning API call"
                        );
                        return Err(Error::RetryExhausted {
                            method: verb.to_string(),
                            url: url.to_string(),
                            attempts: attempt,
                        });
                    }

                    let delay = self.backoff.next_delay();
                    debug!(?delay, remaining, "Retrying Prime request");
                    sleep(delay).await;
                }
                Outcome::Fatal(kind) => {
                    let message = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    let error = kind.into_error(message);
                    error!(method = %verb, url = %url, %error, "Prime API call failed");
                    return Err(error);
                }
            }
        }
    }

    async fn get_json<T>(&self, endpoint: Endpoint<'_>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint_url(endpoint)?;
        let response = self
            .execute_with_retry::<()>(HttpVerb::Get, &url, None, self.retry_policy.budget)
            .await?;

        response.json::<T>().await.map_err(|err| {
            Error::ParseError(format!("Failed to parse Prime response from `{url}`: {err}"))
        })
    }

    /// Current status token of a job, e.g. `COMPLETED` or `RUNNING`.
    pub async fn job_status(&self, job: &str) -> Result<String> {
        let summary: JobSummaryResponse = self.get_json(Endpoint::JobSummary(job)).await?;
        summary.status().map(str::to_string).ok_or_else(|| {
            Error::UnexpectedResponse(format!("no job summary returned for job `{job}`"))
        })
    }

    /// True once the job summary reports the job as `COMPLETED`.
    pub async fn job_complete(&self, job: &str) -> Result<bool> {
        Ok(self.job_status(job).await? == JOB_COMPLETED)
    }

    /// Result of the most recent run of a job.
    pub async fn job_result(&self, job: &str) -> Result<JobResult> {
        let history: RunHistoryResponse = self.get_json(Endpoint::RunHistory(job)).await?;
        history
            .latest_result_status()
            .map(JobResult::from_status)
            .ok_or_else(|| {
                Error::UnexpectedResponse(format!("no run history returned for job `{job}`"))
            })
    }

    /// True if the most recent run succeeded, false if it failed.
    ///
    /// Any other result status (for example a run still in progress) is reported as
    /// [`Error::UnknownJobResult`] rather than guessed.
    pub async fn job_successful(&self, job: &str) -> Result<bool> {
        match self.job_result(job).await? {
            JobResult::Success => Ok(true),
            JobResult::Failure => Ok(false),
            JobResult::Other(status) => Err(Error::UnknownJobResult(status)),
        }
    }

    /// Fetch a device record.
    pub async fn device_info(&self, dev_id: &str) -> Result<Value> {
        self.get_json(Endpoint::Device(dev_id)).await
    }

    /// Fetch the inventory details of a device.
    pub async fn inventory_details(&self, dev_id: &str) -> Result<Value> {
        self.get_json(Endpoint::InventoryDetails(dev_id)).await
    }

    /// Fetch a client summary record.
    pub async fn client_summary(&self, dev_id: &str) -> Result<Value> {
        self.get_json(Endpoint::Client(dev_id)).await
    }

    /// Look up an access point by name.
    pub async fn access_point(&self, name: &str) -> Result<Value> {
        self.get_json(Endpoint::AccessPoint(name)).await
    }

    /// Print a device record to stdout.
    pub async fn print_dev_info(&self, dev_id: &str) -> Result<()> {
        let record = self.device_info(dev_id).await?;
        write_pretty(std::io::stdout().lock(), &record)
    }

    /// Print the inventory details of a device to stdout.
    pub async fn print_dev_detailed_info(&self, dev_id: &str) -> Result<()> {
        let record = self.inventory_details(dev_id).await?;
        write_pretty(std::io::stdout().lock(), &record)
    }

    /// Print a client summary record to stdout.
    pub async fn print_client_summary(&self, dev_id: &str) -> Result<()> {
        let record = self.client_summary(dev_id).await?;
        write_pretty(std::io::stdout().lock(), &record)
    }

    /// Print the [`TEST_ACCESS_POINT`] record to stdout, as a connectivity check.
    pub async fn print_test_access_point(&self) -> Result<()> {
        let record = self.access_point(TEST_ACCESS_POINT).await?;
        write_pretty(std::io::stdout().lock(), &record)
    }
}

/// Write `value` as JSON indented by four spaces, followed by a newline.
pub fn write_pretty<W: Write>(mut writer: W, value: &Value) -> Result<()> {
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|err| Error::IoError(err.to_string()))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
