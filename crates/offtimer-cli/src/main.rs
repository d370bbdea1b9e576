use std::str::FromStr;

use clap::{Parser, Subcommand};

use offtimer_config::OfftimerConfig;
use offtimer_core::{CreateRequest, TaskManager};
use offtimer_gateway::{SchedulerGateway, SystemRunner};
use offtimer_platform::{DEFAULT_SHORT_DATE_PATTERN, Platform};
use offtimer_store::TaskStore;
use offtimer_types::{Action, ScheduleType, Weekday};

#[derive(Parser)]
#[command(
    name = "offtimer",
    about = "Schedule machine shutdown/restart through the OS scheduler"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List scheduled tasks
    List,
    /// Schedule a new shutdown/restart task
    Create {
        /// Delay in minutes
        #[arg(long, default_value_t = 0)]
        minutes: u64,

        /// Delay in hours
        #[arg(long, default_value_t = 0)]
        hours: u64,

        /// Delay in days
        #[arg(long, default_value_t = 0)]
        days: u64,

        /// Action to perform: shutdown or reboot
        #[arg(long, default_value = "shutdown", value_parser = Action::from_str)]
        action: Action,

        /// Recurrence: once, daily or weekly
        #[arg(long, default_value = "once", value_parser = ScheduleType::from_str)]
        schedule: ScheduleType,

        /// Weekday for weekly schedules (repeat for several): mon..sun
        #[arg(long = "day", value_parser = Weekday::from_str)]
        days_of_week: Vec<Weekday>,

        /// Save the task without registering it with the OS scheduler
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a task by name
    Delete {
        task_name: String,

        /// Override the stored at job id
        #[arg(long)]
        job_id: Option<String>,
    },
    /// Remove every task
    DeleteAll,
    /// Enable a task by name
    Enable { task_name: String },
    /// Disable a task by name
    Disable { task_name: String },
    /// Enable every task
    EnableAll,
    /// Disable every task
    DisableAll,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = offtimer_config::load_config().unwrap_or_default();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, config))
}

async fn run(cli: Cli, config: OfftimerConfig) -> anyhow::Result<()> {
    let platform = Platform::current();
    let store = TaskStore::new(config.store_path()?);
    let gateway = SchedulerGateway::new(SystemRunner);

    // The locale short-date pattern only matters for schtasks /sd
    let date_pattern = if platform.is_windows() {
        gateway.windows_short_date_pattern().await
    } else {
        DEFAULT_SHORT_DATE_PATTERN.to_string()
    };

    let manager = TaskManager::new(platform, store, gateway, config.task_prefix, date_pattern);

    match cli.command {
        Commands::List => {
            let views = manager.list_tasks().await?;
            if views.is_empty() {
                println!("No scheduled tasks.");
                return Ok(());
            }
            for view in views {
                let state = if view.task.enabled { "enabled" } else { "disabled" };
                let job = view
                    .task
                    .platform_job_id
                    .as_deref()
                    .map(|id| format!(" (at job {id})"))
                    .unwrap_or_default();
                println!(
                    "{}  {}  {} {}  {}{}",
                    view.task.task_name,
                    view.scheduled_time,
                    view.task.schedule_type,
                    view.task.action,
                    state,
                    job
                );
            }
        }
        Commands::Create {
            minutes,
            hours,
            days,
            action,
            schedule,
            days_of_week,
            disabled,
        } => {
            let task = manager
                .create_task(CreateRequest {
                    delay_minutes: minutes,
                    delay_hours: hours,
                    delay_days: days,
                    action,
                    schedule_type: schedule,
                    days_of_week,
                    enabled: !disabled,
                })
                .await?;
            println!("Created task {}", task.task_name);
        }
        Commands::Delete { task_name, job_id } => {
            manager.delete_task(&task_name, job_id.as_deref()).await?;
            println!("Deleted task {task_name}");
        }
        Commands::DeleteAll => {
            manager.delete_all_tasks().await?;
            println!("Deleted all tasks");
        }
        Commands::Enable { task_name } => {
            manager.enable_task(&task_name).await?;
            println!("Enabled task {task_name}");
        }
        Commands::Disable { task_name } => {
            manager.disable_task(&task_name).await?;
            println!("Disabled task {task_name}");
        }
        Commands::EnableAll => {
            manager.enable_all_tasks().await?;
            println!("Enabled all tasks");
        }
        Commands::DisableAll => {
            manager.disable_all_tasks().await?;
            println!("Disabled all tasks");
        }
    }

    Ok(())
}
