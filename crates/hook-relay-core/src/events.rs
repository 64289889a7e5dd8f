//! GitHub event kinds and their typed payloads.
//!
//! The event kind travels in the `X-GitHub-Event` header, never in the body.
//! [`EventKind::from_header`] maps the header value onto a closed set of kinds
//! the relay knows how to render, with [`EventKind::Other`] catching the rest.
//! [`WebhookEvent::decode`] then decodes the body into the structure for that
//! kind, carrying only the fields the formatter needs.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

// ============================================================================
// EventKind
// ============================================================================

/// Discriminant naming which payload schema a delivery follows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Push,
    Create,
    Ping,
    PageBuild,
    WorkflowRun,
    WorkflowJob,
    CheckRun,
    CheckSuite,
    Deployment,
    DeploymentStatus,

    /// Any kind without a dedicated formatter. Holds the header value as sent.
    Other(String),
}

impl EventKind {
    /// Header values of every kind with a dedicated formatter.
    pub const KNOWN: [&'static str; 10] = [
        "push",
        "create",
        "ping",
        "page_build",
        "workflow_run",
        "workflow_job",
        "check_run",
        "check_suite",
        "deployment",
        "deployment_status",
    ];

    /// Map an `X-GitHub-Event` header value to a kind. Never fails.
    pub fn from_header(value: &str) -> Self {
        let value = value.trim();
        match value {
            "push" => Self::Push,
            "create" => Self::Create,
            "ping" => Self::Ping,
            "page_build" => Self::PageBuild,
            "workflow_run" => Self::WorkflowRun,
            "workflow_job" => Self::WorkflowJob,
            "check_run" => Self::CheckRun,
            "check_suite" => Self::CheckSuite,
            "deployment" => Self::Deployment,
            "deployment_status" => Self::DeploymentStatus,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Push => "push",
            Self::Create => "create",
            Self::Ping => "ping",
            Self::PageBuild => "page_build",
            Self::WorkflowRun => "workflow_run",
            Self::WorkflowJob => "workflow_job",
            Self::CheckRun => "check_run",
            Self::CheckSuite => "check_suite",
            Self::Deployment => "deployment",
            Self::DeploymentStatus => "deployment_status",
            Self::Other(kind) => kind,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        Self::from_header(value)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Shared payload fragments
// ============================================================================

/// Repository the event happened in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    pub url: String,
}

/// Account that triggered the event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Sender {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
}

/// One commit of a push.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commit {
    pub author: CommitAuthor,
    pub message: String,
    pub url: String,
}

/// Name, link and lifecycle of a workflow run, workflow job or check run.
///
/// `status` is absent or null on deliveries fired before a status is
/// assigned; those deliveries are not rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunDetails {
    pub name: String,
    pub html_url: String,
    pub status: Option<String>,
    pub conclusion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckSuiteDetails {
    pub head_branch: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentDetails {
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentStatusDetails {
    pub environment: String,
    pub state: Option<String>,
}

// ============================================================================
// Per-kind payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PushEvent {
    pub repository: RepositoryRef,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateEvent {
    pub repository: RepositoryRef,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub sender: Sender,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PingEvent {
    pub repository: RepositoryRef,
    pub sender: Sender,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageBuildEvent {
    pub repository: RepositoryRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowRunEvent {
    pub repository: RepositoryRef,
    pub workflow_run: RunDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkflowJobEvent {
    pub repository: RepositoryRef,
    pub workflow_job: RunDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckRunEvent {
    pub repository: RepositoryRef,
    pub check_run: RunDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckSuiteEvent {
    pub repository: RepositoryRef,
    pub check_suite: CheckSuiteDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentEvent {
    pub repository: RepositoryRef,
    pub deployment: DeploymentDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeploymentStatusEvent {
    pub repository: RepositoryRef,
    pub deployment_status: DeploymentStatusDetails,
}

// ============================================================================
// WebhookEvent
// ============================================================================

/// A decoded delivery, one variant per [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Push(PushEvent),
    Create(CreateEvent),
    Ping(PingEvent),
    PageBuild(PageBuildEvent),
    WorkflowRun(WorkflowRunEvent),
    WorkflowJob(WorkflowJobEvent),
    CheckRun(CheckRunEvent),
    CheckSuite(CheckSuiteEvent),
    Deployment(DeploymentEvent),
    DeploymentStatus(DeploymentStatusEvent),

    /// Unrecognized kind. The body is not inspected.
    Other { kind: String },
}

impl WebhookEvent {
    /// Decode `payload` into the structure required by `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`DataShapeError`] when a required field is missing or has the
    /// wrong type. [`EventKind::Other`] never fails.
    pub fn decode(kind: &EventKind, payload: serde_json::Value) -> Result<Self, DataShapeError> {
        let event = match kind {
            EventKind::Push => Self::Push(decode_as(kind, payload)?),
            EventKind::Create => Self::Create(decode_as(kind, payload)?),
            EventKind::Ping => Self::Ping(decode_as(kind, payload)?),
            EventKind::PageBuild => Self::PageBuild(decode_as(kind, payload)?),
            EventKind::WorkflowRun => Self::WorkflowRun(decode_as(kind, payload)?),
            EventKind::WorkflowJob => Self::WorkflowJob(decode_as(kind, payload)?),
            EventKind::CheckRun => Self::CheckRun(decode_as(kind, payload)?),
            EventKind::CheckSuite => Self::CheckSuite(decode_as(kind, payload)?),
            EventKind::Deployment => Self::Deployment(decode_as(kind, payload)?),
            EventKind::DeploymentStatus => Self::DeploymentStatus(decode_as(kind, payload)?),
            EventKind::Other(other) => Self::Other {
                kind: other.clone(),
            },
        };

        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Push(_) => EventKind::Push,
            Self::Create(_) => EventKind::Create,
            Self::Ping(_) => EventKind::Ping,
            Self::PageBuild(_) => EventKind::PageBuild,
            Self::WorkflowRun(_) => EventKind::WorkflowRun,
            Self::WorkflowJob(_) => EventKind::WorkflowJob,
            Self::CheckRun(_) => EventKind::CheckRun,
            Self::CheckSuite(_) => EventKind::CheckSuite,
            Self::Deployment(_) => EventKind::Deployment,
            Self::DeploymentStatus(_) => EventKind::DeploymentStatus,
            Self::Other { kind } => EventKind::Other(kind.clone()),
        }
    }
}

fn decode_as<T: DeserializeOwned>(
    kind: &EventKind,
    payload: serde_json::Value,
) -> Result<T, DataShapeError> {
    serde_json::from_value(payload).map_err(|source| DataShapeError {
        kind: kind.to_string(),
        source,
    })
}

// ============================================================================
// Error Types
// ============================================================================

/// The body parsed as JSON but does not carry the fields its kind requires.
#[derive(Debug, thiserror::Error)]
#[error("'{kind}' payload does not have the expected shape: {source}")]
pub struct DataShapeError {
    pub kind: String,
    #[source]
    pub source: serde_json::Error,
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
