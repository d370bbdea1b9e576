//! offtimer-platform: pure translation from task intent to OS scheduler
//! command plans.
//!
//! Nothing in this crate touches the system. Each function maps an intent
//! to the literal invocation (or crontab text) that registers, removes or
//! toggles the corresponding job, so the whole mapping is unit-testable
//! without a live scheduler.

mod windate;

pub use windate::{DEFAULT_SHORT_DATE_PATTERN, format_short_date};

use chrono::{DateTime, Local, Timelike};
use thiserror::Error;

use offtimer_types::{Action, ScheduleType, Weekday};

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("weekly schedule requires at least one weekday")]
    EmptyWeekdays,
    #[error("total delay must be positive")]
    NonPositiveDelay,
    #[error("timestamp {0} is not a representable local time")]
    InvalidTimestamp(i64),
}

/// Platform family, selected once at startup.
///
/// macOS is split from the generic Unix branch because it cannot run
/// `poweroff`/`reboot` without elevation and goes through System Events
/// scripting instead; both share the `at`/cron scheduling paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Unix,
}

impl Platform {
    /// Detect the family of the running OS.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Unix
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }
}

/// A literal program and argument list, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    fn new(program: &str, args: impl IntoIterator<Item = String>) -> Self {
        Self {
            program: program.to_string(),
            args: args.into_iter().collect(),
        }
    }
}

/// How to register a task with the OS scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterPlan {
    /// Run a single command (Windows `schtasks /create`).
    Command(CommandLine),
    /// Pipe the payload into `at <time_spec>`; the job id comes back in
    /// the tool's diagnostic output.
    AtPipe { payload: String, time_spec: String },
    /// Append a marker line and an entry line to the crontab.
    CronAppend { marker: String, entry: String },
}

/// How to remove a registered job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovePlan {
    /// Run a single command (`schtasks /delete`, `atrm`).
    Command(CommandLine),
    /// Rewrite the crontab, dropping the block addressed by the marker.
    CronRemove { task_name: String },
}

/// How to toggle a registered job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TogglePlan {
    /// Run a single command (`schtasks /change`).
    Command(CommandLine),
    /// Rewrite the crontab, commenting or uncommenting the entry after
    /// the marker.
    CronToggle { task_name: String, enabled: bool },
}

/// Everything the translator needs to know about one task.
#[derive(Debug, Clone)]
pub struct TaskIntent {
    pub action: Action,
    pub schedule_type: ScheduleType,
    pub days_of_week: Vec<Weekday>,
    /// Local time of the first/anchor occurrence.
    pub when: DateTime<Local>,
}

/// The payload the scheduler runs when the task fires.
pub fn action_command(platform: Platform, action: Action) -> String {
    match platform {
        Platform::Windows => match action {
            Action::Shutdown => "shutdown -s -f".to_string(),
            Action::Reboot => "shutdown -r -f".to_string(),
        },
        Platform::MacOs => match action {
            Action::Shutdown => {
                r#"/usr/bin/osascript -e 'tell application "System Events" to shut down'"#
                    .to_string()
            }
            Action::Reboot => {
                r#"/usr/bin/osascript -e 'tell application "System Events" to restart'"#
                    .to_string()
            }
        },
        Platform::Unix => match action {
            Action::Shutdown => "poweroff".to_string(),
            Action::Reboot => "reboot".to_string(),
        },
    }
}

/// Plan the registration of a new task.
///
/// `windows_date_pattern` is the OS locale's short-date pattern (resolved
/// by the gateway at startup); it is only consulted on the Windows branch.
pub fn plan_registration(
    platform: Platform,
    task_name: &str,
    intent: &TaskIntent,
    windows_date_pattern: &str,
) -> Result<RegisterPlan, TranslateError> {
    if intent.schedule_type == ScheduleType::Weekly && intent.days_of_week.is_empty() {
        return Err(TranslateError::EmptyWeekdays);
    }

    let payload = action_command(platform, intent.action);

    match platform {
        Platform::Windows => Ok(RegisterPlan::Command(schtasks_create(
            task_name,
            intent,
            &payload,
            windows_date_pattern,
        ))),
        Platform::MacOs | Platform::Unix => match intent.schedule_type {
            ScheduleType::Once => Ok(RegisterPlan::AtPipe {
                payload,
                time_spec: at_time_spec(intent.when),
            }),
            ScheduleType::Daily | ScheduleType::Weekly => Ok(RegisterPlan::CronAppend {
                marker: format!("# {task_name}"),
                entry: cron_entry(intent, &payload),
            }),
        },
    }
}

/// Plan the removal of a registered job. Returns `None` when there is
/// nothing OS-side to remove (a Unix one-time task with no live at job).
pub fn plan_removal(
    platform: Platform,
    task_name: &str,
    schedule_type: ScheduleType,
    platform_job_id: Option<&str>,
) -> Option<RemovePlan> {
    match platform {
        Platform::Windows => Some(RemovePlan::Command(CommandLine::new(
            "schtasks",
            ["/delete", "/tn", task_name, "/f"].map(String::from),
        ))),
        Platform::MacOs | Platform::Unix => match schedule_type {
            ScheduleType::Once => platform_job_id.map(|job_id| {
                RemovePlan::Command(CommandLine::new("atrm", [job_id.to_string()]))
            }),
            ScheduleType::Daily | ScheduleType::Weekly => Some(RemovePlan::CronRemove {
                task_name: task_name.to_string(),
            }),
        },
    }
}

/// Plan an enable/disable toggle. Returns `None` where the scheduler has
/// no toggle primitive (Unix `at` jobs); the lifecycle layer handles that
/// case by deleting or re-registering the job.
pub fn plan_set_enabled(
    platform: Platform,
    task_name: &str,
    schedule_type: ScheduleType,
    enabled: bool,
) -> Option<TogglePlan> {
    match platform {
        Platform::Windows => {
            let toggle = if enabled { "/enable" } else { "/disable" };
            Some(TogglePlan::Command(CommandLine::new(
                "schtasks",
                ["/change", "/tn", task_name, toggle].map(String::from),
            )))
        }
        Platform::MacOs | Platform::Unix => match schedule_type {
            ScheduleType::Once => None,
            ScheduleType::Daily | ScheduleType::Weekly => Some(TogglePlan::CronToggle {
                task_name: task_name.to_string(),
                enabled,
            }),
        },
    }
}

/// `at` time argument: 24-hour clock with an explicit date, immune to
/// locale reinterpretation.
fn at_time_spec(when: DateTime<Local>) -> String {
    when.format("%H:%M %m/%d/%Y").to_string()
}

/// Cron entry for a recurring schedule. The anchor's hour is carried
/// over; the minute field stays 0.
fn cron_entry(intent: &TaskIntent, payload: &str) -> String {
    let hour = intent.when.hour();
    match intent.schedule_type {
        ScheduleType::Weekly => {
            let days = intent
                .days_of_week
                .iter()
                .map(|d| d.cron_abbrev())
                .collect::<Vec<_>>()
                .join(",");
            format!("0 {hour} * * {days} {payload}")
        }
        _ => format!("0 {hour} * * * {payload}"),
    }
}

fn schtasks_create(
    task_name: &str,
    intent: &TaskIntent,
    payload: &str,
    date_pattern: &str,
) -> CommandLine {
    let mut args: Vec<String> = ["/create", "/tn", task_name, "/tr", payload]
        .map(String::from)
        .to_vec();

    match intent.schedule_type {
        ScheduleType::Once => args.extend(["/sc".into(), "once".into()]),
        ScheduleType::Daily => args.extend(["/sc".into(), "daily".into()]),
        ScheduleType::Weekly => {
            let days = intent
                .days_of_week
                .iter()
                .map(|d| d.schtasks_code())
                .collect::<Vec<_>>()
                .join(",");
            args.extend(["/sc".into(), "weekly".into(), "/d".into(), days]);
        }
    }

    args.extend([
        "/st".into(),
        intent.when.format("%H:%M:%S").to_string(),
        "/sd".into(),
        format_short_date(date_pattern, intent.when.date_naive()),
    ]);

    CommandLine::new("schtasks", args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn intent(
        action: Action,
        schedule_type: ScheduleType,
        days: &[Weekday],
        when: DateTime<Local>,
    ) -> TaskIntent {
        TaskIntent {
            action,
            schedule_type,
            days_of_week: days.to_vec(),
            when,
        }
    }

    #[test]
    fn test_action_commands_per_platform() {
        assert_eq!(
            action_command(Platform::Windows, Action::Shutdown),
            "shutdown -s -f"
        );
        assert_eq!(
            action_command(Platform::Windows, Action::Reboot),
            "shutdown -r -f"
        );
        assert!(action_command(Platform::MacOs, Action::Shutdown).contains("System Events"));
        assert!(action_command(Platform::MacOs, Action::Reboot).contains("restart"));
        assert_eq!(action_command(Platform::Unix, Action::Shutdown), "poweroff");
        assert_eq!(action_command(Platform::Unix, Action::Reboot), "reboot");
    }

    #[test]
    fn test_unix_once_uses_at_pipe() {
        let when = local(2025, 11, 20, 12, 5);
        let plan = plan_registration(
            Platform::Unix,
            "OfftimerTask_1",
            &intent(Action::Shutdown, ScheduleType::Once, &[], when),
            DEFAULT_SHORT_DATE_PATTERN,
        )
        .unwrap();
        assert_eq!(
            plan,
            RegisterPlan::AtPipe {
                payload: "poweroff".into(),
                time_spec: "12:05 11/20/2025".into(),
            }
        );
    }

    #[test]
    fn test_weekly_cron_entry() {
        let when = local(2025, 11, 20, 9, 30);
        let plan = plan_registration(
            Platform::Unix,
            "OfftimerTask_7",
            &intent(
                Action::Reboot,
                ScheduleType::Weekly,
                &[Weekday::Mon, Weekday::Wed, Weekday::Fri],
                when,
            ),
            DEFAULT_SHORT_DATE_PATTERN,
        )
        .unwrap();
        assert_eq!(
            plan,
            RegisterPlan::CronAppend {
                marker: "# OfftimerTask_7".into(),
                entry: "0 9 * * mon,wed,fri reboot".into(),
            }
        );
    }

    #[test]
    fn test_daily_cron_entry() {
        let when = local(2025, 11, 20, 22, 15);
        let plan = plan_registration(
            Platform::MacOs,
            "OfftimerTask_2",
            &intent(Action::Shutdown, ScheduleType::Daily, &[], when),
            DEFAULT_SHORT_DATE_PATTERN,
        )
        .unwrap();
        match plan {
            RegisterPlan::CronAppend { marker, entry } => {
                assert_eq!(marker, "# OfftimerTask_2");
                assert!(entry.starts_with("0 22 * * * "));
                assert!(entry.ends_with("to shut down'"));
            }
            other => panic!("expected CronAppend, got {other:?}"),
        }
    }

    #[test]
    fn test_weekly_empty_days_rejected() {
        let when = local(2025, 11, 20, 9, 0);
        for platform in [Platform::Windows, Platform::MacOs, Platform::Unix] {
            let err = plan_registration(
                platform,
                "t",
                &intent(Action::Shutdown, ScheduleType::Weekly, &[], when),
                DEFAULT_SHORT_DATE_PATTERN,
            )
            .unwrap_err();
            assert!(matches!(err, TranslateError::EmptyWeekdays));
        }
    }

    #[test]
    fn test_schtasks_once() {
        let when = local(2025, 11, 20, 12, 5);
        let plan = plan_registration(
            Platform::Windows,
            "OfftimerTask_1",
            &intent(Action::Shutdown, ScheduleType::Once, &[], when),
            "M/d/yyyy",
        )
        .unwrap();
        match plan {
            RegisterPlan::Command(cmd) => {
                assert_eq!(cmd.program, "schtasks");
                assert_eq!(
                    cmd.args,
                    [
                        "/create",
                        "/tn",
                        "OfftimerTask_1",
                        "/tr",
                        "shutdown -s -f",
                        "/sc",
                        "once",
                        "/st",
                        "12:05:00",
                        "/sd",
                        "11/20/2025",
                    ]
                    .map(String::from)
                    .to_vec()
                );
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn test_schtasks_weekly_has_day_list_and_locale_date() {
        let when = local(2025, 11, 20, 8, 0);
        let plan = plan_registration(
            Platform::Windows,
            "OfftimerTask_3",
            &intent(
                Action::Reboot,
                ScheduleType::Weekly,
                &[Weekday::Mon, Weekday::Sun],
                when,
            ),
            "dd.MM.yyyy",
        )
        .unwrap();
        match plan {
            RegisterPlan::Command(cmd) => {
                let args = cmd.args.join(" ");
                assert!(args.contains("/tr shutdown -r -f"));
                assert!(args.contains("/sc weekly /d MON,SUN"));
                assert!(args.contains("/sd 20.11.2025"));
            }
            other => panic!("expected Command, got {other:?}"),
        }
    }

    #[test]
    fn test_removal_plans() {
        assert_eq!(
            plan_removal(Platform::Windows, "t_1", ScheduleType::Daily, None),
            Some(RemovePlan::Command(CommandLine::new(
                "schtasks",
                ["/delete", "/tn", "t_1", "/f"].map(String::from)
            )))
        );
        assert_eq!(
            plan_removal(Platform::Unix, "t_1", ScheduleType::Once, Some("42")),
            Some(RemovePlan::Command(CommandLine::new(
                "atrm",
                ["42".to_string()]
            )))
        );
        // No live at job, nothing to remove
        assert_eq!(
            plan_removal(Platform::Unix, "t_1", ScheduleType::Once, None),
            None
        );
        assert_eq!(
            plan_removal(Platform::MacOs, "t_1", ScheduleType::Weekly, None),
            Some(RemovePlan::CronRemove {
                task_name: "t_1".into()
            })
        );
    }

    #[test]
    fn test_toggle_plans() {
        match plan_set_enabled(Platform::Windows, "t_1", ScheduleType::Once, false) {
            Some(TogglePlan::Command(cmd)) => {
                assert_eq!(
                    cmd.args,
                    ["/change", "/tn", "t_1", "/disable"].map(String::from)
                );
            }
            other => panic!("expected Command, got {other:?}"),
        }
        assert_eq!(
            plan_set_enabled(Platform::Unix, "t_1", ScheduleType::Daily, true),
            Some(TogglePlan::CronToggle {
                task_name: "t_1".into(),
                enabled: true
            })
        );
        // at jobs have no toggle primitive
        assert_eq!(
            plan_set_enabled(Platform::Unix, "t_1", ScheduleType::Once, false),
            None
        );
    }
}
