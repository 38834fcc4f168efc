// Service timer domain model - elapsed time per service line
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timing facts for a single service line.
///
/// Built fresh from backend rows on every request; never written back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerServiceItem {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub timer_stopped_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ticket_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ticket_closed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl TimerServiceItem {
    pub fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(started_at),
            ..Self::default()
        }
    }
}

impl TimerServiceItem {
    /// First end marker present, in precedence order:
    /// item stop > item completion > ticket completion > ticket closure.
    pub fn end_marker(&self) -> Option<DateTime<Utc>> {
        self.timer_stopped_at
            .or(self.completed_at)
            .or(self.ticket_completed_at)
            .or(self.ticket_closed_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerStatus {
    None,
    Active,
    Stopped,
}

/// Whole minutes between two instants, floored at zero.
pub fn whole_minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let millis = (end - start).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    u32::try_from(millis / 60_000).unwrap_or(u32::MAX)
}

/// Elapsed minutes for one service line. Running timers measure up to `now`.
pub fn compute_elapsed_minutes(item: &TimerServiceItem, now: DateTime<Utc>) -> u32 {
    let Some(start) = item.started_at else {
        return 0;
    };
    let end = item.end_marker().unwrap_or(now);
    whole_minutes_between(start, end)
}

pub fn compute_aggregate_minutes<'a, I>(items: I, now: DateTime<Utc>) -> u32
where
    I: IntoIterator<Item = &'a TimerServiceItem>,
{
    items
        .into_iter()
        .map(|item| compute_elapsed_minutes(item, now))
        .fold(0u32, |total, minutes| total.saturating_add(minutes))
}

pub fn classify_timer_status(item: &TimerServiceItem) -> TimerStatus {
    if item.started_at.is_none() {
        return TimerStatus::None;
    }
    if item.end_marker().is_some() {
        TimerStatus::Stopped
    } else {
        TimerStatus::Active
    }
}

pub fn has_active_timer(item: &TimerServiceItem) -> bool {
    classify_timer_status(item) == TimerStatus::Active
}

/// Short display label: "23m", "1h", "1h 15m".
pub fn format_minutes(minutes: u32) -> String {
    if minutes < 60 {
        return format!("{}m", minutes);
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 {
        format!("{}h {}m", hours, mins)
    } else {
        format!("{}h", hours)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerReading {
    pub elapsed_minutes: u32,
    pub status: TimerStatus,
    pub label: String,
}

impl TimerReading {
    pub fn of(item: &TimerServiceItem, now: DateTime<Utc>) -> Self {
        let elapsed_minutes = compute_elapsed_minutes(item, now);
        Self {
            elapsed_minutes,
            status: classify_timer_status(item),
            label: format_minutes(elapsed_minutes),
        }
    }
}

/// Readings for a set of service lines evaluated against a single `now`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub evaluated_at: DateTime<Utc>,
    pub items: Vec<TimerReading>,
    pub total_minutes: u32,
    pub total_label: String,
    pub any_active: bool,
}

impl TimerSnapshot {
    pub fn evaluate(items: &[TimerServiceItem], now: DateTime<Utc>) -> Self {
        let readings: Vec<TimerReading> = items.iter().map(|i| TimerReading::of(i, now)).collect();
        let total_minutes = compute_aggregate_minutes(items, now);
        let any_active = readings.iter().any(|r| r.status == TimerStatus::Active);

        Self {
            evaluated_at: now,
            items: readings,
            total_minutes,
            total_label: format_minutes(total_minutes),
            any_active,
        }
    }
}
