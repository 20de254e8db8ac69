// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Bulk task completion tracking
//!
//! Jira bulk edits are asynchronous: each submission yields a task id
//! that must be polled until the task reports a terminal status. The
//! tracker drives that polling in lock-step rounds: every pending id is
//! polled concurrently (staggered by position), the round's observations
//! are applied, aggregate progress is pushed to the sink, and the next
//! round waits out an exponential backoff. Each observation replaces the
//! previous one wholesale; task state is never patched in place.
//!
//! A poll error leaves its task pending for the next round, so one
//! flaky poll never halts the rest. The whole run is bounded by a
//! deadline; blowing it fails with the ids still outstanding.

use crate::output::ProgressSink;
use async_trait::async_trait;
use futures_util::future::join_all;
use jira_api::BulkTask;
use jira_client::JiraClient;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Seam between the tracker and whatever answers task-status polls.
#[async_trait]
pub trait PollTasks {
    type Error: std::error::Error + Send + Sync + 'static;

    /// One observation of a task. `stagger_order` is the task's position
    /// in the current polling round, used to spread requests out.
    async fn poll_task(&self, task_id: &str, stagger_order: u32) -> Result<BulkTask, Self::Error>;
}

#[async_trait]
impl PollTasks for JiraClient {
    type Error = jira_client::Error;

    async fn poll_task(&self, task_id: &str, stagger_order: u32) -> Result<BulkTask, Self::Error> {
        self.get_task_status(task_id, stagger_order).await
    }
}

/// Round pacing and the overall deadline.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Wait before the second round; doubles each round up to the cap.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Total time allowed for all tasks to finish.
    pub deadline: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            deadline: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Error)]
#[error("bulk tasks still pending after {deadline:?}: {}", pending.join(", "))]
pub struct DeadlineExceeded {
    pub deadline: Duration,
    /// Ids of the tasks that never reached a terminal status.
    pub pending: Vec<String>,
}

/// Polls a set of bulk tasks to completion.
pub struct TaskTracker<'a, P> {
    poller: &'a P,
    config: TrackerConfig,
}

impl<'a, P: PollTasks + Sync> TaskTracker<'a, P> {
    pub fn new(poller: &'a P) -> Self {
        Self {
            poller,
            config: TrackerConfig::default(),
        }
    }

    pub fn with_config(poller: &'a P, config: TrackerConfig) -> Self {
        Self { poller, config }
    }

    /// Poll every task to a terminal status and return the total number
    /// of issues the tasks report as processed.
    ///
    /// The count accumulates exactly once per task, at the round where
    /// it is first observed finished. The sink's scale is
    /// `task_count * 100`; each task contributes its progress percent,
    /// capped at 100 once finished.
    pub async fn track(
        &self,
        task_ids: &[String],
        sink: &dyn ProgressSink,
    ) -> Result<u64, DeadlineExceeded> {
        sink.set_total(task_ids.len() as u64 * 100);
        if task_ids.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let mut tasks: HashMap<String, BulkTask> = HashMap::new();
        let mut pending: Vec<String> = task_ids.to_vec();
        let mut changed: u64 = 0;
        let mut backoff = self.config.initial_backoff;
        let mut first_round = true;

        while !pending.is_empty() {
            if !first_round {
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(self.config.max_backoff);
            }
            first_round = false;

            let polls = pending.iter().enumerate().map(|(order, id)| async move {
                (id.clone(), self.poller.poll_task(id, order as u32).await)
            });
            let observations = join_all(polls).await;

            let mut still_pending = Vec::new();
            for (id, observation) in observations {
                match observation {
                    Ok(mut task) => {
                        if task.is_finished() {
                            changed += task.processed_accessible_issues.len() as u64;
                            task.progress_percent = 100;
                            debug!(task_id = %id, status = ?task.status, "task finished");
                        } else {
                            still_pending.push(id.clone());
                        }
                        tasks.insert(id, task);
                    }
                    Err(error) => {
                        warn!(task_id = %id, %error, "task poll failed; retrying next round");
                        still_pending.push(id);
                    }
                }
            }
            pending = still_pending;

            let aggregate: u64 = tasks
                .values()
                .map(|task| u64::from(task.progress_percent.min(100)))
                .sum();
            sink.set_completed(aggregate);

            if !pending.is_empty() && started.elapsed() >= self.config.deadline {
                return Err(DeadlineExceeded {
                    deadline: self.config.deadline,
                    pending,
                });
            }
        }

        Ok(changed)
    }
}
