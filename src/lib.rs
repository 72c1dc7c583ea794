pub mod cli;
pub mod clock;
pub mod config;
pub mod models;
pub mod notify;
pub mod reminder;
pub mod scheduler;
pub mod timer;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use models::{EntityId, Note, Remindable, Task};
pub use notify::{Alert, Notifier, Permission, TerminalNotifier};
pub use reminder::ReminderSpec;
pub use scheduler::{ReminderScheduler, ScheduleOutcome, SchedulerEvent};
pub use utils::Profile;
