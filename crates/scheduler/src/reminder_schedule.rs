//! Per-day reminder slot generation (spec §4.5). Pure and deterministic:
//! `generate_schedule_for_date(date, cfg)` depends on nothing but its
//! arguments, so the same inputs always produce the same slots (spec §8
//! "Round-trip and idempotence").

use chrono::{DateTime, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use practice_domain::{SparkVariant, Tone};

use crate::error::SchedulerError;

/// Reminder schedule configuration for a single user (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    pub enabled: bool,
    pub timezone: String,
    pub first_hour: u32,
    pub last_hour: u32,
    pub interval_hours: u32,
    pub max_per_day: u32,
    pub quiet_days: Vec<Weekday>,
    pub shrink_on_escalation: bool,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timezone: "UTC".to_string(),
            first_hour: 9,
            last_hour: 19,
            interval_hours: 4,
            max_per_day: 4,
            quiet_days: Vec::new(),
            shrink_on_escalation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderSlot {
    pub scheduled_time: DateTime<Utc>,
    pub escalation_level: u8,
    pub spark_variant: SparkVariant,
    pub tone: Tone,
}

fn level_to_variant(level: u8, shrink_on_escalation: bool) -> SparkVariant {
    if !shrink_on_escalation {
        return SparkVariant::Full;
    }
    match level {
        0 | 1 => SparkVariant::Full,
        2 => SparkVariant::Reduced,
        _ => SparkVariant::Minimal,
    }
}

fn level_to_tone(level: u8) -> Tone {
    match level {
        0 => Tone::Encouraging,
        1 | 2 => Tone::Gentle,
        _ => Tone::LastChance,
    }
}

/// Generates the reminder slots for `date` under `cfg` (spec §4.5). No
/// slots on a disabled schedule, a quiet weekday, or past `lastHour`/
/// `maxPerDay`/the hard cap of 3 (spec: "count ≤ 3").
pub fn generate_schedule_for_date(
    date: NaiveDate,
    cfg: &ReminderConfig,
) -> Result<Vec<ReminderSlot>, SchedulerError> {
    if !cfg.enabled {
        return Ok(Vec::new());
    }
    let tz: Tz = cfg
        .timezone
        .parse()
        .map_err(|_| SchedulerError::InvalidDate(format!("unknown timezone {}", cfg.timezone)))?;

    if cfg.quiet_days.contains(&date.weekday()) {
        return Ok(Vec::new());
    }

    let interval = cfg.interval_hours.max(1);
    let mut slots = Vec::new();
    let mut hour = cfg.first_hour;
    let mut count: u32 = 0;
    let mut level: u8 = 0;

    while hour <= cfg.last_hour && count < cfg.max_per_day && count <= 3 {
        let naive = date
            .and_hms_opt(hour % 24, 0, 0)
            .ok_or_else(|| SchedulerError::InvalidDate(format!("invalid hour {hour}")))?;
        let local = tz
            .from_local_datetime(&naive)
            .single()
            .ok_or_else(|| SchedulerError::InvalidDate(format!("ambiguous local time {naive} in {tz}")))?;
        slots.push(ReminderSlot {
            scheduled_time: local.with_timezone(&Utc),
            escalation_level: level,
            spark_variant: level_to_variant(level, cfg.shrink_on_escalation),
            tone: level_to_tone(level),
        });
        count += 1;
        level = level.saturating_add(1);
        hour += interval;
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ReminderConfig {
        ReminderConfig {
            enabled: true,
            timezone: "America/New_York".to_string(),
            first_hour: 9,
            last_hour: 19,
            interval_hours: 4,
            max_per_day: 4,
            quiet_days: Vec::new(),
            shrink_on_escalation: true,
        }
    }

    /// Scenario B: slots at 09:00, 13:00, 17:00 (no 21:00 — exceeds lastHour).
    #[test]
    fn scenario_b_escalating_reminders() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let slots = generate_schedule_for_date(date, &cfg()).unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(
            slots.iter().map(|s| s.escalation_level).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            slots.iter().map(|s| s.spark_variant).collect::<Vec<_>>(),
            vec![SparkVariant::Full, SparkVariant::Full, SparkVariant::Reduced]
        );
        assert_eq!(
            slots.iter().map(|s| s.tone).collect::<Vec<_>>(),
            vec![Tone::Encouraging, Tone::Gentle, Tone::Gentle]
        );
    }

    #[test]
    fn disabled_schedule_yields_no_slots() {
        let mut c = cfg();
        c.enabled = false;
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert!(generate_schedule_for_date(date, &c).unwrap().is_empty());
    }

    #[test]
    fn quiet_day_yields_no_slots() {
        let mut c = cfg();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(); // a Wednesday
        c.quiet_days.push(date.weekday());
        assert!(generate_schedule_for_date(date, &c).unwrap().is_empty());
    }

    /// Boundary: firstHour=lastHour=19 yields exactly one slot (spec §8).
    #[test]
    fn single_hour_window_yields_one_slot() {
        let mut c = cfg();
        c.first_hour = 19;
        c.last_hour = 19;
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let slots = generate_schedule_for_date(date, &c).unwrap();
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn shrink_disabled_keeps_full_variant_throughout() {
        let mut c = cfg();
        c.shrink_on_escalation = false;
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let slots = generate_schedule_for_date(date, &c).unwrap();
        assert!(slots.iter().all(|s| s.spark_variant == SparkVariant::Full));
    }

    #[test]
    fn pure_function_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let a = generate_schedule_for_date(date, &cfg()).unwrap();
        let b = generate_schedule_for_date(date, &cfg()).unwrap();
        assert_eq!(a, b);
    }
}
