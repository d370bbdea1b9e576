//! offtimer-core: task lifecycle orchestration.
//!
//! Composes the store, the platform translator and the scheduler gateway
//! into the create/enable/disable/delete operations, keeping the store
//! and the live OS scheduler in step on every mutation.

use chrono::{DateTime, Local, TimeZone};
use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use offtimer_gateway::{GatewayError, ProcessRunner, SchedulerGateway};
use offtimer_platform::{self as platform, Platform, TaskIntent, TranslateError};
use offtimer_store::{StoreError, TaskStore};
use offtimer_types::{Action, ScheduleType, ScheduledTask, TaskView, Weekday};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid task intent: {0}")]
    Translate(#[from] TranslateError),
    #[error("scheduler error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Parameters for creating a task.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub delay_minutes: u64,
    pub delay_hours: u64,
    pub delay_days: u64,
    pub action: Action,
    pub schedule_type: ScheduleType,
    pub days_of_week: Vec<Weekday>,
    /// Register with the OS scheduler immediately; `false` stores the
    /// record without creating a live OS entity.
    pub enabled: bool,
}

impl CreateRequest {
    fn delay_millis(&self) -> i64 {
        let seconds = self.delay_minutes * 60 + self.delay_hours * 3600 + self.delay_days * 86_400;
        seconds as i64 * 1000
    }
}

/// Orchestrates the task lifecycle over one store and one gateway.
pub struct TaskManager<R> {
    platform: Platform,
    store: TaskStore,
    gateway: SchedulerGateway<R>,
    task_prefix: String,
    windows_date_pattern: String,
}

impl<R: ProcessRunner> TaskManager<R> {
    /// Build a manager. `windows_date_pattern` is resolved by the caller
    /// (registry lookup on Windows, the default elsewhere).
    pub fn new(
        platform: Platform,
        store: TaskStore,
        gateway: SchedulerGateway<R>,
        task_prefix: impl Into<String>,
        windows_date_pattern: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            store,
            gateway,
            task_prefix: task_prefix.into(),
            windows_date_pattern: windows_date_pattern.into(),
        }
    }

    /// Create a task `delay` in the future and, unless the request says
    /// otherwise, register it with the OS scheduler. The record is
    /// persisted only after the registration succeeds.
    pub async fn create_task(&self, req: CreateRequest) -> Result<ScheduledTask> {
        let delay = req.delay_millis();
        if delay <= 0 {
            return Err(TranslateError::NonPositiveDelay.into());
        }
        if req.schedule_type == ScheduleType::Weekly && req.days_of_week.is_empty() {
            return Err(TranslateError::EmptyWeekdays.into());
        }

        let timestamp = Local::now().timestamp_millis() + delay;
        let mut task = ScheduledTask {
            task_name: format!("{}_{timestamp}", self.task_prefix),
            action: req.action,
            schedule_type: req.schedule_type,
            days_of_week: req.days_of_week,
            timestamp,
            enabled: req.enabled,
            platform_job_id: None,
        };

        if req.enabled {
            task.platform_job_id = self.register(&task).await?;
            info!("Task {} registered for {}", task.task_name, format_local(timestamp));
        } else {
            info!("Task {} saved but not registered", task.task_name);
        }

        let mut tasks = self.store.load()?;
        tasks.push(task.clone());
        self.store.save(&tasks)?;
        Ok(task)
    }

    /// Remove a task from the OS scheduler and the store. Unknown names
    /// are a logged no-op, so a second delete of the same task is safe.
    /// An explicit `platform_job_id` overrides the stored one.
    pub async fn delete_task(&self, task_name: &str, platform_job_id: Option<&str>) -> Result<()> {
        let mut tasks = self.store.load()?;
        let Some(idx) = tasks.iter().position(|t| t.task_name == task_name) else {
            warn!("No task named {task_name}; nothing to delete");
            return Ok(());
        };

        let job_id = platform_job_id
            .map(str::to_string)
            .or_else(|| tasks[idx].platform_job_id.clone());
        if let Some(plan) = platform::plan_removal(
            self.platform,
            task_name,
            tasks[idx].schedule_type,
            job_id.as_deref(),
        ) {
            self.gateway.remove(&plan).await?;
        }

        tasks.remove(idx);
        self.store.save(&tasks)?;
        info!("Task {task_name} deleted");
        Ok(())
    }

    /// Best-effort bulk clear: every `at` job is removed individually
    /// (the removals are causally independent and run concurrently), one
    /// crontab rewrite drops every owned block, Windows tasks are deleted
    /// by name, and the store is reset regardless of individual outcomes.
    pub async fn delete_all_tasks(&self) -> Result<()> {
        let tasks = self.store.load()?;

        if self.platform.is_windows() {
            for task in &tasks {
                if let Some(plan) =
                    platform::plan_removal(self.platform, &task.task_name, task.schedule_type, None)
                {
                    if let Err(e) = self.gateway.remove(&plan).await {
                        warn!("Could not remove {}: {e} (continuing)", task.task_name);
                    }
                }
            }
        } else {
            let removals: Vec<_> = tasks
                .iter()
                .filter(|t| t.schedule_type == ScheduleType::Once)
                .filter_map(|t| {
                    let job_id = t.platform_job_id.as_deref()?;
                    let plan = platform::plan_removal(
                        self.platform,
                        &t.task_name,
                        t.schedule_type,
                        Some(job_id),
                    )?;
                    Some((t.task_name.clone(), plan))
                })
                .collect();
            let results = join_all(removals.into_iter().map(|(name, plan)| async move {
                let result = self.gateway.remove(&plan).await;
                (name, result)
            }))
            .await;
            for (name, result) in results {
                if let Err(e) = result {
                    warn!("Could not remove at job for {name}: {e} (continuing)");
                }
            }

            if let Err(e) = self.gateway.purge_cron_prefix(&self.task_prefix).await {
                warn!("Could not purge cron entries: {e} (continuing)");
            }
        }

        self.store.save(&[])?;
        info!("Cleared {} task(s)", tasks.len());
        Ok(())
    }

    pub async fn enable_task(&self, task_name: &str) -> Result<()> {
        self.set_task_enabled(task_name, true).await
    }

    pub async fn disable_task(&self, task_name: &str) -> Result<()> {
        self.set_task_enabled(task_name, false).await
    }

    pub async fn enable_all_tasks(&self) -> Result<()> {
        self.set_all_enabled(true).await
    }

    pub async fn disable_all_tasks(&self) -> Result<()> {
        self.set_all_enabled(false).await
    }

    /// All records in store order, each with its derived human-readable
    /// scheduled time.
    pub async fn list_tasks(&self) -> Result<Vec<TaskView>> {
        let tasks = self.store.load()?;
        Ok(tasks
            .into_iter()
            .map(|task| {
                let scheduled_time = format_local(task.timestamp);
                TaskView {
                    task,
                    scheduled_time,
                }
            })
            .collect())
    }

    async fn register(&self, task: &ScheduledTask) -> Result<Option<String>> {
        let intent = TaskIntent {
            action: task.action,
            schedule_type: task.schedule_type,
            days_of_week: task.days_of_week.clone(),
            when: local_time(task.timestamp)?,
        };
        let plan = platform::plan_registration(
            self.platform,
            &task.task_name,
            &intent,
            &self.windows_date_pattern,
        )?;
        Ok(self.gateway.register(&plan).await?)
    }

    async fn set_task_enabled(&self, task_name: &str, enabled: bool) -> Result<()> {
        let mut tasks = self.store.load()?;
        let Some(idx) = tasks.iter().position(|t| t.task_name == task_name) else {
            warn!("No task named {task_name}; nothing to change");
            return Ok(());
        };

        let mut task = tasks[idx].clone();
        self.apply_toggle(&mut task, enabled).await?;
        task.enabled = enabled;
        tasks[idx] = task;
        self.store.save(&tasks)?;
        info!(
            "Task {task_name} {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    async fn set_all_enabled(&self, enabled: bool) -> Result<()> {
        let mut tasks = self.store.load()?;
        for task in tasks.iter_mut() {
            // Per-item failures do not stop the sweep; the flag flips
            // regardless and the store is saved once at the end.
            if let Err(e) = self.apply_toggle(task, enabled).await {
                warn!(
                    "Could not {} {}: {e} (continuing)",
                    if enabled { "enable" } else { "disable" },
                    task.task_name
                );
            }
            task.enabled = enabled;
        }
        self.store.save(&tasks)?;
        info!(
            "All tasks {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Gateway-side part of an enable/disable, including the deferred
    /// registration fallback. Store IO stays with the caller.
    async fn apply_toggle(&self, task: &mut ScheduledTask, enabled: bool) -> Result<()> {
        match platform::plan_set_enabled(
            self.platform,
            &task.task_name,
            task.schedule_type,
            enabled,
        ) {
            Some(plan) => match self.gateway.set_enabled(&plan).await {
                Ok(()) => Ok(()),
                // A record created disabled has no OS entity yet;
                // enabling it means registering it now
                Err(GatewayError::MissingEntity { .. }) if enabled => {
                    info!(
                        "No live scheduler entry for {}; registering it now",
                        task.task_name
                    );
                    task.platform_job_id = self.register(task).await?;
                    Ok(())
                }
                Err(e) => Err(e.into()),
            },
            // Unix one-time tasks: `at` has no toggle primitive.
            // Disable drops the job; enable registers a fresh one.
            None => {
                if enabled {
                    if task.platform_job_id.is_none() {
                        task.platform_job_id = self.register(task).await?;
                    }
                } else if let Some(job_id) = task.platform_job_id.clone() {
                    if let Some(plan) = platform::plan_removal(
                        self.platform,
                        &task.task_name,
                        task.schedule_type,
                        Some(&job_id),
                    ) {
                        self.gateway.remove(&plan).await?;
                    }
                    task.platform_job_id = None;
                }
                Ok(())
            }
        }
    }
}

fn local_time(timestamp_millis: i64) -> std::result::Result<DateTime<Local>, TranslateError> {
    Local
        .timestamp_millis_opt(timestamp_millis)
        .earliest()
        .ok_or(TranslateError::InvalidTimestamp(timestamp_millis))
}

fn format_local(timestamp_millis: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_millis).earliest() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "invalid time".to_string(),
    }
}
