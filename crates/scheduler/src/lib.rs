//! Scheduler (spec §4.4) and Reminder Engine (spec §4.5): resolves "what to
//! practice today" per user timezone and generates/dispatches the escalating
//! reminder sequence for a drill's spark.

pub mod dispatch;
pub mod error;
pub mod notification;
pub mod reminder_schedule;
pub mod today;

pub use dispatch::{DispatchOutcome, ReminderDispatcher};
pub use error::SchedulerError;
pub use notification::NotificationChannel;
pub use reminder_schedule::{ReminderConfig, ReminderSlot, generate_schedule_for_date};
pub use today::{TodayForUser, resolve_today_for_user};
