// Completion classifier - actual vs expected service duration
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timer::whole_minutes_between;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    OnTime,
    ModerateDeviation,
    ExtremeDeviation,
    Unknown,
}

// Percent-of-expected bounds. Lower bounds are exclusive, upper bounds inclusive.
const EXTREME_FAST_BELOW: i64 = 70;
const MODERATE_FAST_BELOW: i64 = 90;
const ON_TIME_UP_TO: i64 = 110;
const MODERATE_SLOW_UP_TO: i64 = 130;

/// Bucket `actual / expected` into a timeliness tag.
///
/// Returns `Unknown` when there is no standard duration, no completion
/// signal, or no measurable actual time.
pub fn classify_completion(
    expected_minutes: i64,
    actual_minutes: i64,
    has_completion_signal: bool,
) -> CompletionStatus {
    if expected_minutes <= 0 || !has_completion_signal || actual_minutes <= 0 {
        return CompletionStatus::Unknown;
    }

    // percentage < p  <=>  actual * 100 < expected * p
    let scaled_actual = i128::from(actual_minutes) * 100;
    let expected = i128::from(expected_minutes);
    let below = |percent: i64| scaled_actual < expected * i128::from(percent);
    let at_most = |percent: i64| scaled_actual <= expected * i128::from(percent);

    if below(EXTREME_FAST_BELOW) {
        CompletionStatus::ExtremeDeviation
    } else if below(MODERATE_FAST_BELOW) {
        CompletionStatus::ModerateDeviation
    } else if at_most(ON_TIME_UP_TO) {
        CompletionStatus::OnTime
    } else if at_most(MODERATE_SLOW_UP_TO) {
        CompletionStatus::ModerateDeviation
    } else {
        CompletionStatus::ExtremeDeviation
    }
}

/// Timing facts used by the reports to judge a finished service line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceItemDetail {
    pub duration_min: i64,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ticket_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Actual minutes spent, from the most specific pair of instants available:
/// item start/complete, then ticket opened/completed, then ticket opened/closed.
pub fn completion_duration_minutes(detail: &ServiceItemDetail) -> u32 {
    let pairs = [
        (detail.started_at, detail.completed_at),
        (detail.opened_at, detail.ticket_completed_at),
        (detail.opened_at, detail.closed_at),
    ];

    pairs
        .into_iter()
        .find_map(|pair| match pair {
            (Some(start), Some(end)) => Some(whole_minutes_between(start, end)),
            _ => None,
        })
        .unwrap_or(0)
}

pub fn has_completion_signal(detail: &ServiceItemDetail) -> bool {
    detail.completed_at.is_some() || detail.ticket_completed_at.is_some() || detail.closed_at.is_some()
}

pub fn item_completion_status(detail: &ServiceItemDetail) -> CompletionStatus {
    classify_completion(
        detail.duration_min,
        i64::from(completion_duration_minutes(detail)),
        has_completion_signal(detail),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_reference_classifications() {
        assert_eq!(classify_completion(60, 54, true), CompletionStatus::OnTime);
        assert_eq!(classify_completion(60, 50, true), CompletionStatus::ModerateDeviation);
        assert_eq!(classify_completion(60, 41, true), CompletionStatus::ExtremeDeviation);
        assert_eq!(classify_completion(60, 30, true), CompletionStatus::ExtremeDeviation);
        assert_eq!(classify_completion(60, 75, true), CompletionStatus::ModerateDeviation);
        assert_eq!(classify_completion(60, 80, true), CompletionStatus::ExtremeDeviation);
    }

    #[test]
    fn test_boundaries_use_exact_inequalities() {
        let cases = [
            (69, CompletionStatus::ExtremeDeviation),
            (70, CompletionStatus::ModerateDeviation),
            (89, CompletionStatus::ModerateDeviation),
            (90, CompletionStatus::OnTime),
            (100, CompletionStatus::OnTime),
            (110, CompletionStatus::OnTime),
            (111, CompletionStatus::ModerateDeviation),
            (130, CompletionStatus::ModerateDeviation),
            (131, CompletionStatus::ExtremeDeviation),
        ];
        for (actual, expected) in cases {
            assert_eq!(classify_completion(100, actual, true), expected, "actual = {}", actual);
        }
    }

    #[test]
    fn test_boundaries_hold_for_non_decimal_ratios() {
        // 33/30 = 110% exactly, 21/30 = 70% exactly
        assert_eq!(classify_completion(30, 33, true), CompletionStatus::OnTime);
        assert_eq!(classify_completion(30, 21, true), CompletionStatus::ModerateDeviation);
        assert_eq!(classify_completion(30, 39, true), CompletionStatus::ModerateDeviation);
        assert_eq!(classify_completion(30, 40, true), CompletionStatus::ExtremeDeviation);
    }

    #[test]
    fn test_unknown_preconditions() {
        assert_eq!(classify_completion(0, 50, true), CompletionStatus::Unknown);
        assert_eq!(classify_completion(-5, 50, true), CompletionStatus::Unknown);
        assert_eq!(classify_completion(60, 50, false), CompletionStatus::Unknown);
        assert_eq!(classify_completion(60, 0, true), CompletionStatus::Unknown);
    }

    #[test]
    fn test_item_pair_preferred_over_ticket_pairs() {
        let detail = ServiceItemDetail {
            duration_min: 30,
            started_at: Some(at(10, 10)),
            completed_at: Some(at(10, 40)),
            opened_at: Some(at(10, 0)),
            ticket_completed_at: Some(at(11, 0)),
            closed_at: Some(at(11, 30)),
        };
        assert_eq!(completion_duration_minutes(&detail), 30);
        assert_eq!(item_completion_status(&detail), CompletionStatus::OnTime);
    }

    #[test]
    fn test_falls_back_to_ticket_completion_then_closure() {
        let mut detail = ServiceItemDetail {
            duration_min: 45,
            started_at: Some(at(10, 10)),
            opened_at: Some(at(10, 0)),
            ticket_completed_at: Some(at(10, 40)),
            closed_at: Some(at(11, 0)),
            ..Default::default()
        };
        assert_eq!(completion_duration_minutes(&detail), 40);

        detail.ticket_completed_at = None;
        assert_eq!(completion_duration_minutes(&detail), 60);
        assert_eq!(item_completion_status(&detail), CompletionStatus::ExtremeDeviation);
    }

    #[test]
    fn test_open_ticket_is_unknown() {
        let detail = ServiceItemDetail {
            duration_min: 45,
            started_at: Some(at(10, 10)),
            opened_at: Some(at(10, 0)),
            ..Default::default()
        };
        assert!(!has_completion_signal(&detail));
        assert_eq!(completion_duration_minutes(&detail), 0);
        assert_eq!(item_completion_status(&detail), CompletionStatus::Unknown);
    }

    #[test]
    fn test_custom_service_without_duration_is_unknown() {
        let detail = ServiceItemDetail {
            duration_min: 0,
            started_at: Some(at(10, 0)),
            completed_at: Some(at(10, 30)),
            ..Default::default()
        };
        assert_eq!(item_completion_status(&detail), CompletionStatus::Unknown);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&CompletionStatus::ModerateDeviation).unwrap();
        assert_eq!(json, "\"moderate_deviation\"");
    }
}
