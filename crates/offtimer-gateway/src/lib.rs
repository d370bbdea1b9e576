//! offtimer-gateway: executes translator plans against the real OS
//! scheduler binaries and reports what happened.
//!
//! All external processes go through the [`ProcessRunner`] trait so every
//! flow can be exercised in tests with a scripted runner instead of a
//! live scheduler.

pub mod crontab;

use std::process::{Output, Stdio};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use offtimer_platform::{RegisterPlan, RemovePlan, TogglePlan};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("could not extract an at job id from: {output:?}")]
    Parse { output: String },
    #[error("no scheduler entry found for {task_name}")]
    MissingEntity { task_name: String },
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Minimal interface to external processes.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, optionally feeding `stdin`, and capture
    /// the full output.
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> std::io::Result<Output>;
}

/// Runs commands on the real system.
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> std::io::Result<Output> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = cmd.spawn()?;
        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes()).await?;
                // Dropping the pipe closes it so the child sees EOF
            }
        }
        child.wait_with_output().await
    }
}

/// Gateway to the OS scheduler. Crontab rewrites are whole-table
/// read-modify-write, so they are serialized behind one mutex.
pub struct SchedulerGateway<R> {
    runner: R,
    crontab_lock: Mutex<()>,
}

impl<R: ProcessRunner> SchedulerGateway<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            crontab_lock: Mutex::new(()),
        }
    }

    /// Register a task with the OS scheduler. Returns the job id when the
    /// plan produces one (the Unix `at` path).
    pub async fn register(&self, plan: &RegisterPlan) -> Result<Option<String>> {
        match plan {
            RegisterPlan::Command(cmd) => {
                self.run_checked(&cmd.program, &cmd.args, None).await?;
                Ok(None)
            }
            RegisterPlan::AtPipe { payload, time_spec } => {
                let args: Vec<String> = time_spec.split_whitespace().map(String::from).collect();
                let output = self.run_checked("at", &args, Some(payload)).await?;
                let job_id = parse_at_job_id(&output)?;
                tracing::info!("at job {job_id} registered for {time_spec}");
                Ok(Some(job_id))
            }
            RegisterPlan::CronAppend { marker, entry } => {
                let _guard = self.crontab_lock.lock().await;
                let table = self.read_crontab().await?;
                let updated = crontab::append_block(&table, marker, entry);
                self.write_crontab(&updated).await?;
                Ok(None)
            }
        }
    }

    /// Remove a registered job.
    pub async fn remove(&self, plan: &RemovePlan) -> Result<()> {
        match plan {
            RemovePlan::Command(cmd) => {
                self.run_checked(&cmd.program, &cmd.args, None).await?;
                Ok(())
            }
            RemovePlan::CronRemove { task_name } => {
                let _guard = self.crontab_lock.lock().await;
                let table = self.read_crontab().await?;
                let updated = crontab::remove_block(&table, task_name);
                self.write_crontab(&updated).await
            }
        }
    }

    /// Toggle a registered job. Reports [`GatewayError::MissingEntity`]
    /// when a cron marker is absent, which the lifecycle layer uses to
    /// fall back to a fresh registration.
    pub async fn set_enabled(&self, plan: &TogglePlan) -> Result<()> {
        match plan {
            TogglePlan::Command(cmd) => {
                self.run_checked(&cmd.program, &cmd.args, None).await?;
                Ok(())
            }
            TogglePlan::CronToggle { task_name, enabled } => {
                let _guard = self.crontab_lock.lock().await;
                let table = self.read_crontab().await?;
                let updated = crontab::set_entry_enabled(&table, task_name, *enabled).ok_or(
                    GatewayError::MissingEntity {
                        task_name: task_name.clone(),
                    },
                )?;
                self.write_crontab(&updated).await
            }
        }
    }

    /// Drop every owned cron block in a single rewrite.
    pub async fn purge_cron_prefix(&self, prefix: &str) -> Result<()> {
        let _guard = self.crontab_lock.lock().await;
        let table = self.read_crontab().await?;
        let updated = crontab::purge_prefix(&table, prefix);
        self.write_crontab(&updated).await
    }

    /// Resolve the user's short-date pattern from the Windows registry.
    /// Best-effort: any failure falls back to the US default, matching
    /// what `schtasks` accepts on an untouched install.
    pub async fn windows_short_date_pattern(&self) -> String {
        let args: Vec<String> = [
            "query",
            r"HKCU\Control Panel\International",
            "/v",
            "sShortDate",
        ]
        .map(String::from)
        .to_vec();

        match self.runner.run("reg", &args, None).await {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                parse_reg_short_date(&stdout)
                    .unwrap_or_else(|| offtimer_platform::DEFAULT_SHORT_DATE_PATTERN.to_string())
            }
            _ => offtimer_platform::DEFAULT_SHORT_DATE_PATTERN.to_string(),
        }
    }

    async fn run_checked(
        &self,
        program: &str,
        args: &[String],
        stdin: Option<&str>,
    ) -> Result<Output> {
        tracing::debug!("exec: {program} {}", args.join(" "));
        let output =
            self.runner
                .run(program, args, stdin)
                .await
                .map_err(|source| GatewayError::Launch {
                    program: program.to_string(),
                    source,
                })?;

        if !output.status.success() {
            return Err(GatewayError::Exit {
                program: program.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Read the whole crontab. `crontab -l` exits nonzero with a
    /// "no crontab for <user>" diagnostic when the user has none; that is
    /// an empty table, not an error.
    async fn read_crontab(&self) -> Result<String> {
        let args = vec!["-l".to_string()];
        let output =
            self.runner
                .run("crontab", &args, None)
                .await
                .map_err(|source| GatewayError::Launch {
                    program: "crontab".to_string(),
                    source,
                })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("no crontab") {
            return Ok(String::new());
        }
        Err(GatewayError::Exit {
            program: "crontab".to_string(),
            status: output.status,
            stderr: stderr.trim().to_string(),
        })
    }

    async fn write_crontab(&self, table: &str) -> Result<()> {
        let args = vec!["-".to_string()];
        self.run_checked("crontab", &args, Some(table)).await?;
        Ok(())
    }
}

static AT_JOB_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"job\s+(\d+)").unwrap());
static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Extract the numeric job id from `at`'s diagnostic output.
///
/// `at` announces the job on stderr, e.g. `job 42 at Thu Nov 20 12:05:00
/// 2025`, usually after a "commands will be executed using /bin/sh"
/// warning. The exact wording is tool- and locale-dependent, so this is
/// best-effort: prefer a `job <n>` line, fall back to the first number
/// anywhere in stderr, then stdout.
pub fn parse_at_job_id(output: &Output) -> Result<String> {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    for text in [stderr.as_ref(), stdout.as_ref()] {
        if let Some(caps) = AT_JOB_LINE.captures(text) {
            return Ok(caps[1].to_string());
        }
    }
    for text in [stderr.as_ref(), stdout.as_ref()] {
        if let Some(m) = FIRST_NUMBER.find(text) {
            return Ok(m.as_str().to_string());
        }
    }

    Err(GatewayError::Parse {
        output: format!("{}{}", stderr.trim(), stdout.trim()),
    })
}

/// Pull the `sShortDate` value out of `reg query` output, e.g.
/// `    sShortDate    REG_SZ    M/d/yyyy`.
fn parse_reg_short_date(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find(|line| line.contains("sShortDate"))
        .and_then(|line| line.split_whitespace().last())
        .map(String::from)
}
