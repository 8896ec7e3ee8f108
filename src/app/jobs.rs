//! Background provider work and the bookkeeping that keeps its results ordered.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::commands::run_shell;
use crate::provider::{MutationAction, MutationTarget, ReminderProvider};

use super::messages::Message;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    pub target: MutationTarget,
    pub actions: Vec<MutationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Refresh { token: u64 },
    Mutate { token: u64, plan: MutationPlan },
    ListCategories { token: u64 },
    RunCommand {
        token: u64,
        command: String,
        timeout: Duration,
    },
}

impl Job {
    pub fn token(&self) -> u64 {
        match self {
            Self::Refresh { token }
            | Self::Mutate { token, .. }
            | Self::ListCategories { token }
            | Self::RunCommand { token, .. } => *token,
        }
    }
}

/// Runs `job` to completion on the calling thread and wraps the outcome as the
/// message the event loop expects.
pub fn execute_job(provider: &dyn ReminderProvider, job: Job) -> Message {
    match job {
        Job::Refresh { token } => Message::RefreshFinished {
            token,
            result: provider.fetch_all(),
        },
        Job::Mutate { token, plan } => {
            let mut summary = "No changes".to_string();
            for action in &plan.actions {
                if let Err(error) = provider.mutate(action, &plan.target) {
                    return Message::MutationFinished {
                        token,
                        result: Err(error),
                    };
                }
                summary = action.describe().to_string();
            }
            Message::MutationFinished {
                token,
                result: Ok(summary),
            }
        }
        Job::ListCategories { token } => Message::CategoriesListed {
            token,
            result: provider.list_categories(),
        },
        Job::RunCommand {
            token,
            command,
            timeout,
        } => Message::CommandFinished {
            token,
            result: run_shell(&command, timeout),
        },
    }
}

/// Dispatches jobs to the blocking pool and reports back over a channel.
pub struct JobRunner {
    provider: Arc<dyn ReminderProvider>,
    sender: UnboundedSender<Message>,
}

impl JobRunner {
    pub fn new(provider: Arc<dyn ReminderProvider>) -> (Self, UnboundedReceiver<Message>) {
        let (sender, receiver) = unbounded_channel();
        (Self { provider, sender }, receiver)
    }

    pub fn spawn(&self, job: Job) -> JoinHandle<()> {
        let provider = Arc::clone(&self.provider);
        let sender = self.sender.clone();
        debug!(token = job.token(), "spawning provider job");
        tokio::task::spawn_blocking(move || {
            let message = execute_job(provider.as_ref(), job);
            if sender.send(message).is_err() {
                debug!("event loop gone; dropping provider job result");
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshCompletion {
    /// Newest requested result: write it to the store.
    Apply,
    /// Superseded or unknown: drop it.
    Discard,
}

/// Keeps at most one refresh in flight. Requests made while one is running
/// collapse into a single follow-up, and only the result of the newest
/// request is ever applied.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    next_token: u64,
    in_flight: Option<u64>,
    queued: bool,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a job to spawn now, or `None` when the request was queued
    /// behind the one in flight.
    pub fn request(&mut self) -> Option<Job> {
        if self.in_flight.is_some() {
            self.queued = true;
            return None;
        }
        Some(self.start())
    }

    /// Settles a finished refresh. A queued request is started and returned as
    /// the follow-up job, in which case the finished result is stale.
    pub fn complete(&mut self, token: u64) -> (RefreshCompletion, Option<Job>) {
        if self.in_flight != Some(token) {
            debug!(token, "discarding unknown refresh result");
            return (RefreshCompletion::Discard, None);
        }
        self.in_flight = None;

        if self.queued {
            self.queued = false;
            info!(token, "refresh superseded by a newer request");
            return (RefreshCompletion::Discard, Some(self.start()));
        }
        (RefreshCompletion::Apply, None)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    fn start(&mut self) -> Job {
        self.next_token = self.next_token.wrapping_add(1);
        self.in_flight = Some(self.next_token);
        Job::Refresh {
            token: self.next_token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::types::Item;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        calls: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl ReminderProvider for RecordingProvider {
        fn fetch_all(&self) -> Result<Vec<Item>, ProviderError> {
            Ok(Vec::new())
        }

        fn list_categories(&self) -> Result<Vec<String>, ProviderError> {
            Ok(vec!["Groceries".to_string()])
        }

        fn mutate(
            &self,
            action: &MutationAction,
            _target: &MutationTarget,
        ) -> Result<(), ProviderError> {
            let name = match action {
                MutationAction::Edit { .. } => "edit",
                MutationAction::Complete => "complete",
                MutationAction::Uncomplete => "uncomplete",
                MutationAction::Delete => "delete",
            };
            self.calls
                .lock()
                .expect("calls lock poisoned")
                .push(name.to_string());
            if self.fail_on == Some(name) {
                return Err(ProviderError::Rejected(format!("{name} refused")));
            }
            Ok(())
        }
    }

    fn plan(actions: Vec<MutationAction>) -> MutationPlan {
        MutationPlan {
            target: MutationTarget {
                external_ref: "id-1".to_string(),
                category: "Home".to_string(),
            },
            actions,
        }
    }

    #[test]
    fn overlapping_requests_apply_only_latest() {
        let mut refresh = RefreshCoordinator::new();
        let first = refresh.request().expect("first request starts");
        assert!(refresh.request().is_none());
        assert!(refresh.request().is_none());

        let (completion, follow_up) = refresh.complete(first.token());
        assert_eq!(completion, RefreshCompletion::Discard);
        let second = follow_up.expect("queued request starts");
        assert_ne!(second.token(), first.token());

        let (completion, follow_up) = refresh.complete(second.token());
        assert_eq!(completion, RefreshCompletion::Apply);
        assert!(follow_up.is_none());
        assert!(!refresh.is_busy());
    }

    #[test]
    fn stale_token_is_discarded() {
        let mut refresh = RefreshCoordinator::new();
        let job = refresh.request().expect("request starts");
        assert_eq!(
            refresh.complete(job.token() + 7),
            (RefreshCompletion::Discard, None)
        );
        assert!(refresh.is_busy());
    }

    #[test]
    fn mutation_plan_runs_in_order() {
        let provider = RecordingProvider::default();
        let message = execute_job(
            &provider,
            Job::Mutate {
                token: 3,
                plan: plan(vec![
                    MutationAction::Edit {
                        title: "t".to_string(),
                        notes: String::new(),
                    },
                    MutationAction::Complete,
                ]),
            },
        );
        assert_eq!(
            message,
            Message::MutationFinished {
                token: 3,
                result: Ok("Reminder completed".to_string()),
            }
        );
        assert_eq!(
            *provider.calls.lock().expect("calls lock poisoned"),
            vec!["edit".to_string(), "complete".to_string()]
        );
    }

    #[test]
    fn mutation_plan_stops_at_first_failure() {
        let provider = RecordingProvider {
            fail_on: Some("edit"),
            ..RecordingProvider::default()
        };
        let message = execute_job(
            &provider,
            Job::Mutate {
                token: 1,
                plan: plan(vec![
                    MutationAction::Edit {
                        title: "t".to_string(),
                        notes: String::new(),
                    },
                    MutationAction::Delete,
                ]),
            },
        );
        assert!(matches!(
            message,
            Message::MutationFinished {
                result: Err(ProviderError::Rejected(_)),
                ..
            }
        ));
        assert_eq!(provider.calls.lock().expect("calls lock poisoned").len(), 1);
    }

    #[test]
    fn category_listing_reports_provider_lists() {
        let provider = RecordingProvider::default();
        assert_eq!(
            execute_job(&provider, Job::ListCategories { token: 4 }),
            Message::CategoriesListed {
                token: 4,
                result: Ok(vec!["Groceries".to_string()]),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_job_reports_shell_outcome() {
        let provider = RecordingProvider::default();
        let message = execute_job(
            &provider,
            Job::RunCommand {
                token: 5,
                command: "exit 1".to_string(),
                timeout: Duration::from_secs(5),
            },
        );
        assert!(matches!(
            message,
            Message::CommandFinished {
                token: 5,
                result: Err(_),
            }
        ));
        assert!(provider.calls.lock().expect("calls lock poisoned").is_empty());
    }

    #[tokio::test]
    async fn runner_reports_over_channel() {
        let provider: Arc<dyn ReminderProvider> = Arc::new(RecordingProvider::default());
        let (runner, mut receiver) = JobRunner::new(provider);
        runner
            .spawn(Job::Refresh { token: 9 })
            .await
            .expect("job should not panic");
        assert_eq!(
            receiver.recv().await,
            Some(Message::RefreshFinished {
                token: 9,
                result: Ok(Vec::new()),
            })
        );
    }
}
