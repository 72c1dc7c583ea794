use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use thiserror::Error;

use crate::clock::{Clock, ManualClock, SystemClock};
use crate::config::Config;
use crate::models::{EntityExport, Note};
use crate::notify::{Notifier, Permission, TerminalNotifier};
use crate::reminder::ReminderSpec;
use crate::scheduler::{FireOutcome, ReminderScheduler, ScheduleOutcome, SchedulerEvent};
use crate::utils::{expand_path, format_instant, format_relative};

#[derive(Parser)]
#[command(name = "ingetin")]
#[command(about = "IngetinAja - reminders for your notes and tasks")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show when a reminder would fire and which alerts it would raise
    Check {
        /// ISO-8601 time, epoch milliseconds, or a date when --time is given
        reminder: String,
        /// Clock time (HH:MM) to pair with a date
        #[arg(long)]
        time: Option<String>,
    },
    /// List the alerts an exported entity list would arm
    Plan {
        /// JSON file with "notes" and "tasks" arrays
        file: String,
    },
    /// Schedule an exported entity list and deliver alerts until none are left
    Watch {
        /// JSON file with "notes" and "tasks" arrays
        file: String,
        /// Fast-forward through time instead of waiting on the wall clock
        #[arg(long)]
        simulate: bool,
    },
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Failed to read {0}: {1}")]
    ReadError(String, String),
    #[error("Failed to parse entity export: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Interpret a command-line reminder argument
pub fn parse_reminder_arg(reminder: &str, time: Option<&str>) -> ReminderSpec {
    match time {
        Some(time) => ReminderSpec::date_time(reminder, time),
        None => match reminder.trim().parse::<i64>() {
            Ok(ms) => ReminderSpec::epoch_ms(ms),
            Err(_) => ReminderSpec::iso(reminder),
        },
    }
}

/// Load an entity export from a JSON file
pub fn load_export(path: &str) -> Result<EntityExport, CliError> {
    let path = expand_path(path);
    let contents = fs::read_to_string(&path)
        .map_err(|e| CliError::ReadError(path.display().to_string(), e.to_string()))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Handle the check command
pub fn handle_check(reminder: String, time: Option<String>, config: &Config) -> Result<(), CliError> {
    let spec = parse_reminder_arg(&reminder, time.as_deref());
    let clock = SystemClock;
    let now = clock.now_ms();
    let mut scheduler = ReminderScheduler::new(
        clock,
        TerminalNotifier::new(Permission::Denied, false),
        config.reminders.clone(),
    );

    let probe = Note::new("check", reminder.clone());
    let outcome = scheduler.schedule_reminder(&probe, &spec);
    print_outcome("reminder", &outcome, now);
    for trigger in scheduler.triggers() {
        println!("    {}", trigger.alert().title);
    }
    scheduler.stop();
    Ok(())
}

/// Handle the plan command
pub fn handle_plan(file: String, config: &Config) -> Result<(), CliError> {
    let export = load_export(&file)?;
    let clock = SystemClock;
    let now = clock.now_ms();
    let mut scheduler = ReminderScheduler::new(
        clock,
        TerminalNotifier::new(Permission::Denied, false),
        config.reminders.clone(),
    );

    let outcomes = scheduler.reschedule_all(export.entities());
    for (entity_id, outcome) in &outcomes {
        print_outcome(entity_id.as_str(), outcome, now);
    }

    println!();
    println!("{} alert(s) would be armed:", scheduler.scheduled_count());
    let mut pending: Vec<_> = scheduler.triggers().collect();
    pending.sort_by_key(|t| t.fire_at);
    for trigger in pending {
        println!(
            "  {}  {:<14} {}",
            format_instant(trigger.fire_at),
            trigger.kind,
            trigger.alert().title
        );
    }

    scheduler.stop();
    Ok(())
}

/// Handle the watch command
pub fn handle_watch(file: String, simulate: bool, config: &Config) -> Result<(), CliError> {
    let export = load_export(&file)?;
    let notifier = TerminalNotifier::new(
        config.notifications.permission,
        config.notifications.bell && !simulate,
    );

    if simulate {
        watch(ManualClock::starting_now(), notifier, &export, config);
    } else {
        watch(SystemClock, notifier, &export, config);
    }
    Ok(())
}

fn watch<C: Clock, N: Notifier>(clock: C, notifier: N, export: &EntityExport, config: &Config) {
    let mut scheduler = ReminderScheduler::new(clock, notifier, config.reminders.clone());

    if !scheduler.request_permission() {
        println!("Notifikasi tidak diizinkan; reminder tetap dijadwalkan tanpa tampilan.");
    }

    let outcomes = scheduler.reschedule_all(export.entities());
    let armed: usize = outcomes.iter().map(|(_, outcome)| outcome.armed_count()).sum();
    info!(
        "Watching {} entities with reminders, {} alert(s) armed",
        outcomes.len(),
        armed
    );
    scheduler.start_background_sweep();

    let mut delivered = 0;
    let mut suppressed = 0;
    scheduler.run_until_idle_with(|event| match event {
        SchedulerEvent::Fired { entity_id, kind, outcome, fire_at } => match outcome {
            FireOutcome::Displayed => {
                delivered += 1;
                info!("[{}] {} {} delivered", format_instant(*fire_at), entity_id, kind);
            }
            other => {
                suppressed += 1;
                info!("[{}] {} {} not shown: {:?}", format_instant(*fire_at), entity_id, kind, other);
            }
        },
        SchedulerEvent::AutoDismissed { tag } => info!("Alert {} closed", tag),
        SchedulerEvent::Swept { removed } if *removed > 0 => {
            info!("Sweep removed {} stale alert(s)", removed)
        }
        SchedulerEvent::Swept { .. } => {}
    });

    scheduler.stop();
    println!(
        "Done: {} alert(s) delivered, {} not shown.",
        delivered, suppressed
    );
}

fn print_outcome(label: &str, outcome: &ScheduleOutcome, now: i64) {
    match outcome {
        ScheduleOutcome::Invalid(e) => println!("{}: invalid reminder ({})", label, e),
        ScheduleOutcome::Elapsed { target } => println!(
            "{}: {} already passed ({})",
            label,
            format_instant(*target),
            format_relative(*target, now)
        ),
        ScheduleOutcome::Scheduled { target, armed, skipped } => {
            println!(
                "{}: {} ({}), {} alert(s)",
                label,
                format_instant(*target),
                format_relative(*target, now),
                armed.len()
            );
            for trigger in armed {
                println!(
                    "    {:<14} {} ({})",
                    trigger.kind,
                    format_instant(trigger.fire_at),
                    format_relative(trigger.fire_at, now)
                );
            }
            for kind in skipped {
                println!("    {:<14} skipped, already past", kind);
            }
        }
    }
}
