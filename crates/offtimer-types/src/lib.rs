use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ──────────────────── Task Intent ────────────────────

/// What the machine does when a task fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Shutdown,
    Reboot,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shutdown" => Ok(Action::Shutdown),
            "reboot" => Ok(Action::Reboot),
            other => Err(format!("unknown action '{other}' (expected shutdown or reboot)")),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Shutdown => write!(f, "shutdown"),
            Action::Reboot => write!(f, "reboot"),
        }
    }
}

/// Recurrence of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Once,
    Daily,
    Weekly,
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "once" => Ok(ScheduleType::Once),
            "daily" => Ok(ScheduleType::Daily),
            "weekly" => Ok(ScheduleType::Weekly),
            other => Err(format!(
                "unknown schedule type '{other}' (expected once, daily or weekly)"
            )),
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleType::Once => write!(f, "once"),
            ScheduleType::Daily => write!(f, "daily"),
            ScheduleType::Weekly => write!(f, "weekly"),
        }
    }
}

/// Day-of-week tag carried by weekly schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Three-letter abbreviation used in cron day-of-week lists.
    pub fn cron_abbrev(&self) -> &'static str {
        match self {
            Weekday::Mon => "mon",
            Weekday::Tue => "tue",
            Weekday::Wed => "wed",
            Weekday::Thu => "thu",
            Weekday::Fri => "fri",
            Weekday::Sat => "sat",
            Weekday::Sun => "sun",
        }
    }

    /// Day code expected by `schtasks /d`.
    pub fn schtasks_code(&self) -> &'static str {
        match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        }
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mon" => Ok(Weekday::Mon),
            "tue" => Ok(Weekday::Tue),
            "wed" => Ok(Weekday::Wed),
            "thu" => Ok(Weekday::Thu),
            "fri" => Ok(Weekday::Fri),
            "sat" => Ok(Weekday::Sat),
            "sun" => Ok(Weekday::Sun),
            other => Err(format!("unknown weekday '{other}' (expected mon..sun)")),
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cron_abbrev())
    }
}

// ──────────────────── Persisted Record ────────────────────

/// A persisted shutdown/restart task.
///
/// Field names follow the on-disk JSON contract, so this struct serializes
/// in camelCase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    /// Unique name, `<prefix>_<millis>`. Immutable once created, and the
    /// handle by which the OS-side job is addressed.
    pub task_name: String,
    /// What happens when the task fires.
    pub action: Action,
    /// One-time or recurring.
    pub schedule_type: ScheduleType,
    /// Weekday tags; non-empty exactly when `schedule_type` is weekly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_week: Vec<Weekday>,
    /// Epoch millis of the first/anchor occurrence. For recurring tasks
    /// only the time-of-day component is authoritative.
    pub timestamp: i64,
    /// Whether the OS-side job is currently active.
    pub enabled: bool,
    /// `at` job id for Unix one-time jobs; absent for Windows tasks and
    /// cron-backed recurring jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_job_id: Option<String>,
}

/// A task paired with its derived human-readable scheduled time, as
/// returned by list operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    #[serde(flatten)]
    pub task: ScheduledTask,
    pub scheduled_time: String,
}
