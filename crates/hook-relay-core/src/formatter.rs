//! Markdown rendering of webhook events.
//!
//! Every known kind has one pure rendering function. Kinds gated on a status
//! or state field render nothing while that field is absent or null, so
//! deliveries fired before a run is assigned a status stay silent.

use crate::events::{
    CheckRunEvent, CheckSuiteEvent, CreateEvent, DataShapeError, DeploymentEvent,
    DeploymentStatusEvent, EventKind, PageBuildEvent, PingEvent, PushEvent, RepositoryRef,
    RunDetails, WebhookEvent,
};
use std::fmt;

/// Status or state value meaning "not assigned yet".
const UNASSIGNED: &str = "none";

/// Rendered text for a missing run conclusion.
const NO_CONCLUSION: &str = "none";

/// Chat-ready markdown produced from a single delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage(String);

impl FormattedMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FormattedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decode and render a delivery in one step.
///
/// Returns `Ok(None)` when the event is gated and not yet worth announcing.
///
/// # Errors
///
/// Returns [`DataShapeError`] when `payload` lacks a field required by
/// `event_kind`.
pub fn format_event(
    event_kind: &str,
    payload: serde_json::Value,
) -> Result<Option<FormattedMessage>, DataShapeError> {
    let kind = EventKind::from_header(event_kind);
    let event = WebhookEvent::decode(&kind, payload)?;
    Ok(render(&event))
}

/// Render a decoded event. Deterministic, no I/O.
pub fn render(event: &WebhookEvent) -> Option<FormattedMessage> {
    let text = match event {
        WebhookEvent::Push(push) => render_push(push)?,
        WebhookEvent::Create(create) => render_create(create),
        WebhookEvent::Ping(ping) => render_ping(ping),
        WebhookEvent::PageBuild(build) => render_page_build(build),
        WebhookEvent::WorkflowRun(run) => {
            render_run(&run.repository, "workflow", &run.workflow_run)?
        }
        WebhookEvent::WorkflowJob(job) => {
            render_run(&job.repository, "workflow", &job.workflow_job)?
        }
        WebhookEvent::CheckRun(check) => render_check_run(check)?,
        WebhookEvent::CheckSuite(suite) => render_check_suite(suite)?,
        WebhookEvent::Deployment(deployment) => render_deployment(deployment),
        WebhookEvent::DeploymentStatus(status) => render_deployment_status(status)?,
        WebhookEvent::Other { kind } => format!("Unhandled event: {}", kind),
    };

    Some(FormattedMessage(text))
}

// ============================================================================
// Per-kind renderers
// ============================================================================

/// Header line naming the first author, then one quote line per commit.
///
/// A push without commits (branch deletion, tag push) renders nothing.
fn render_push(event: &PushEvent) -> Option<String> {
    let first = event.commits.first()?;
    let count = event.commits.len();
    let noun = if count == 1 { "commit" } else { "commits" };

    let mut lines = Vec::with_capacity(count + 1);
    lines.push(format!(
        "[{}:{}]({}) {} {} by {}:",
        event.repository.name,
        ref_suffix(&event.git_ref),
        event.repository.url,
        count,
        noun,
        first.author.name
    ));
    lines.extend(
        event
            .commits
            .iter()
            .map(|commit| format!("> [{}]({})", commit.message, commit.url)),
    );

    Some(lines.join("\n"))
}

fn render_create(event: &CreateEvent) -> String {
    format!(
        "[{}:{}]({}) branch/tag created by {}",
        event.repository.name,
        ref_suffix(&event.git_ref),
        event.repository.url,
        event.sender.login
    )
}

fn render_ping(event: &PingEvent) -> String {
    format!(
        "{} pinged by {}",
        repository_link(&event.repository),
        event.sender.login
    )
}

fn render_page_build(event: &PageBuildEvent) -> String {
    format!("{} 's Page is building", repository_link(&event.repository))
}

/// Shared by workflow runs and workflow jobs.
fn render_run(repository: &RepositoryRef, label: &str, run: &RunDetails) -> Option<String> {
    let status = assigned(run.status.as_deref())?;
    Some(format!(
        "{} {} [{}]({}) status: {} result: {}",
        repository_link(repository),
        label,
        run.name,
        run.html_url,
        status,
        run.conclusion.as_deref().unwrap_or(NO_CONCLUSION)
    ))
}

fn render_check_run(event: &CheckRunEvent) -> Option<String> {
    render_run(&event.repository, "check", &event.check_run)
}

fn render_check_suite(event: &CheckSuiteEvent) -> Option<String> {
    let status = assigned(event.check_suite.status.as_deref())?;
    Some(format!(
        "{} check_suite on branch {} currently: {}",
        repository_link(&event.repository),
        event.check_suite.head_branch,
        status
    ))
}

fn render_deployment(event: &DeploymentEvent) -> String {
    format!(
        "{} has a deployment task on environment {}",
        repository_link(&event.repository),
        event.deployment.environment
    )
}

fn render_deployment_status(event: &DeploymentStatusEvent) -> Option<String> {
    let state = assigned(event.deployment_status.state.as_deref())?;
    Some(format!(
        "{} deployment task on {} is in state {}",
        repository_link(&event.repository),
        event.deployment_status.environment,
        state
    ))
}

// ============================================================================
// Helpers
// ============================================================================

/// A gating status or state that is missing, null or the literal `none` has
/// not been assigned yet.
fn assigned(value: Option<&str>) -> Option<&str> {
    value.filter(|value| *value != UNASSIGNED)
}

fn repository_link(repository: &RepositoryRef) -> String {
    format!("[{}]({})", repository.name, repository.url)
}

/// `refs/heads/feature/x` -> `x`
fn ref_suffix(git_ref: &str) -> &str {
    git_ref.rsplit('/').next().unwrap_or(git_ref)
}

#[cfg(test)]
#[path = "formatter_tests.rs"]
mod tests;
