//! # Compliance Test Notifier
//!
//! Reports the start and end of a numbered compliance test to the status
//! server, which tags its own log lines with the running test.
//!
//! The request is `GET {base}/compliancetest?test_stage=…&test_number=…&test_result=…`
//! with a 10 second timeout. There is no internal retry: a timeout is
//! reported as [`NotifyError::Timeout`] and the caller decides.

use std::time::Duration;

use clap::{Args, ValueEnum};
use thiserror::Error;
use url::Url;

use crate::config::Config;

/// Request timeout for notifications.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Which end of a test is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestStage {
    Start,
    End,
}

impl TestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// Outcome of a test. `Pending` is sent with the start notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TestResult {
    Pending,
    Error,
    Success,
}

impl TestResult {
    /// Wire value: empty, `e` or `s`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "",
            Self::Error => "e",
            Self::Success => "s",
        }
    }
}

/// Errors from a notification attempt.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// No response within the timeout. Safe to retry.
    #[error("compliance notification timed out")]
    Timeout,

    /// Connection or protocol failure.
    #[error("compliance notification failed: {0}")]
    Http(#[source] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("compliance endpoint returned HTTP {0}")]
    Status(u16),

    /// The configured base URL is unusable.
    #[error("invalid compliance base URL {0:?}")]
    InvalidUrl(String),
}

impl NotifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// HTTP client for the compliance endpoint.
#[derive(Debug, Clone)]
pub struct ComplianceNotifier {
    client: reqwest::Client,
    endpoint: Url,
}

impl ComplianceNotifier {
    pub fn new(base_url: &str) -> Result<Self, NotifyError> {
        Self::with_timeout(base_url, NOTIFY_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let endpoint = Url::parse(&format!(
            "{}/compliancetest",
            base_url.trim_end_matches('/')
        ))
        .map_err(|_| NotifyError::InvalidUrl(base_url.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(NotifyError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(NotifyError::Http)?;
        Ok(Self { client, endpoint })
    }

    /// The URL a notification would be sent to.
    pub fn url_for(&self, stage: TestStage, test_number: &str, result: TestResult) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("test_stage", stage.as_str())
            .append_pair("test_number", test_number)
            .append_pair("test_result", result.as_str());
        url
    }

    pub async fn notify(
        &self,
        stage: TestStage,
        test_number: &str,
        result: TestResult,
    ) -> Result<(), NotifyError> {
        let url = self.url_for(stage, test_number, result);
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                NotifyError::Timeout
            } else {
                NotifyError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                test_number,
                "compliance notification rejected"
            );
            return Err(NotifyError::Status(status.as_u16()));
        }
        tracing::info!(
            stage = stage.as_str(),
            test_number,
            result = result.as_str(),
            "compliance notification sent"
        );
        Ok(())
    }
}

// ─── Subcommand ──────────────────────────────────────────────────────

/// Arguments for the compliance subcommand.
#[derive(Args, Debug)]
pub struct ComplianceArgs {
    /// Test stage to report.
    #[arg(long, value_enum)]
    pub stage: TestStage,

    /// Compliance test number.
    #[arg(long)]
    pub test_number: String,

    /// Test result; only meaningful with `--stage end`.
    #[arg(long, value_enum, default_value = "pending")]
    pub result: TestResult,

    /// Status server base URL. Overrides `compliance.base_url`.
    #[arg(long)]
    pub base_url: Option<String>,
}

pub async fn run_compliance(args: &ComplianceArgs, config: &Config) -> anyhow::Result<u8> {
    let base_url = match (&args.base_url, &config.compliance) {
        (Some(url), _) => url.clone(),
        (None, Some(c)) => c.base_url.clone(),
        (None, None) => {
            anyhow::bail!("no compliance base URL: pass --base-url or set compliance.base_url")
        }
    };
    if args.stage == TestStage::End && args.result == TestResult::Pending {
        anyhow::bail!("--stage end needs --result error or --result success");
    }

    let notifier = ComplianceNotifier::new(&base_url)?;
    match notifier.notify(args.stage, &args.test_number, args.result).await {
        Ok(()) => Ok(0),
        Err(e) if e.is_retryable() => {
            tracing::warn!("{e}; the notification can be retried");
            Ok(2)
        }
        Err(e) => Err(e.into()),
    }
}
