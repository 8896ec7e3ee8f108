use std::fmt;
use std::io::{ErrorKind, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::store::distinct_categories;
use crate::types::Item;

const POLL_INTERVAL: Duration = Duration::from_millis(20);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The data source could not be reached or did not finish.
    Unavailable(String),
    /// The data source answered with something that is not reminder data.
    Malformed(String),
    /// The data source refused a mutation.
    Rejected(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(detail) => write!(f, "reminders unavailable: {detail}"),
            Self::Malformed(detail) => write!(f, "malformed reminders data: {detail}"),
            Self::Rejected(detail) => write!(f, "change rejected: {detail}"),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationAction {
    Edit { title: String, notes: String },
    Complete,
    Uncomplete,
    Delete,
}

impl MutationAction {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Edit { .. } => "Reminder updated",
            Self::Complete => "Reminder completed",
            Self::Uncomplete => "Reminder reopened",
            Self::Delete => "Reminder deleted",
        }
    }
}

/// The reminder a mutation applies to, and the list it belongs to afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationTarget {
    pub external_ref: String,
    pub category: String,
}

pub trait ReminderProvider: Send + Sync {
    fn fetch_all(&self) -> Result<Vec<Item>, ProviderError>;

    /// Distinct categories among non-completed items.
    fn list_categories(&self) -> Result<Vec<String>, ProviderError> {
        Ok(distinct_categories(&self.fetch_all()?))
    }

    fn mutate(&self, action: &MutationAction, target: &MutationTarget)
    -> Result<(), ProviderError>;
}

/// Talks to a `reminders`-compatible command line tool.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    timeout: Duration,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, ProviderError> {
        debug!(program = %self.program, ?args, "running provider command");
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| match error.kind() {
                ErrorKind::NotFound => {
                    ProviderError::Unavailable(format!("'{}' not found in PATH", self.program))
                }
                _ => ProviderError::Unavailable(format!(
                    "failed to start '{}': {error}",
                    self.program
                )),
            })?;

        let output = wait_with_timeout(child, self.timeout).map_err(|detail| {
            ProviderError::Unavailable(format!("'{}' {detail}", self.program))
        })?;

        if !output.success {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("'{} {}' exited with {}", self.program, args.join(" "), output.code)
            } else {
                stderr
            };
            warn!("provider command failed: {}", detail);
            return Err(ProviderError::Rejected(detail));
        }

        Ok(output.stdout)
    }
}

impl ReminderProvider for CommandProvider {
    fn fetch_all(&self) -> Result<Vec<Item>, ProviderError> {
        let stdout = self.run(&["show-all", "-f", "json"]).map_err(|error| match error {
            ProviderError::Rejected(detail) => ProviderError::Unavailable(detail),
            other => other,
        })?;
        parse_items(&stdout)
    }

    fn mutate(
        &self,
        action: &MutationAction,
        target: &MutationTarget,
    ) -> Result<(), ProviderError> {
        let list = target.category.as_str();
        let id = target.external_ref.as_str();
        match action {
            MutationAction::Edit { title, notes } => {
                let mut args = vec!["edit", list, id];
                if !notes.is_empty() {
                    args.push("--notes");
                    args.push(notes.as_str());
                }
                args.push(title.as_str());
                self.run(&args)?;
            }
            MutationAction::Complete => {
                self.run(&["complete", list, id])?;
            }
            MutationAction::Uncomplete => {
                self.run(&["uncomplete", list, id])?;
            }
            MutationAction::Delete => {
                self.run(&["delete", list, id])?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReminder {
    external_id: String,
    title: String,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    list: String,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    is_completed: bool,
}

/// Decodes the provider's JSON array. Unparseable due dates become `None`.
pub fn parse_items(raw: &[u8]) -> Result<Vec<Item>, ProviderError> {
    let reminders: Vec<RawReminder> = serde_json::from_slice(raw)
        .map_err(|error| ProviderError::Malformed(error.to_string()))?;

    Ok(reminders
        .into_iter()
        .map(|reminder| Item {
            due: reminder.due_date.as_deref().and_then(parse_due),
            external_ref: reminder.external_id,
            title: reminder.title,
            notes: reminder.notes.unwrap_or_default(),
            category: reminder.list,
            priority: reminder.priority,
            completed: reminder.is_completed,
        })
        .collect())
}

fn parse_due(raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(due) => Some(due.with_timezone(&Utc)),
        Err(error) => {
            debug!("ignoring unparseable due date '{}': {}", raw, error);
            None
        }
    }
}

pub(crate) struct ProcessOutput {
    pub(crate) success: bool,
    pub(crate) code: String,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
}

/// Waits for `child`, killing it once `timeout` passes. Piped output is
/// drained on helper threads while waiting.
pub(crate) fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<ProcessOutput, String> {
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(format!("timed out after {}s", timeout.as_secs()));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(error) => return Err(format!("failed to wait: {error}")),
        }
    };

    let collect = |reader: Option<thread::JoinHandle<Vec<u8>>>| {
        reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
    };

    Ok(ProcessOutput {
        success: status.success(),
        code: status
            .code()
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string()),
        stdout: collect(stdout_reader),
        stderr: collect(stderr_reader),
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = source.read_to_end(&mut buffer);
        buffer
    })
}
