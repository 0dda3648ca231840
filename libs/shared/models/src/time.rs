// libs/shared/models/src/time.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchedulingError;

/// A half-open interval `[start, end)` in UTC. The constructor is the only
/// way to build one, so `start < end` holds everywhere downstream.
///
/// All availability and conflict logic is written against the four
/// primitives here (`overlaps`, `contains`, `subtract`, `union`), which
/// keeps the touching/containment/zero-length edge cases in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SchedulingError> {
        if start >= end {
            return Err(SchedulingError::InvalidRange(format!(
                "start {} must be strictly before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True iff the two ranges share at least one instant. Ranges that
    /// merely touch (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True iff `inner` lies entirely within `self`.
    pub fn contains(&self, inner: &TimeRange) -> bool {
        self.start <= inner.start && inner.end <= self.end
    }

    /// The portion of both ranges, if any.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(TimeRange { start, end })
    }

    /// The parts of `self` not covered by `other`: zero, one, or two
    /// pieces depending on where `other` cuts.
    pub fn subtract(&self, other: &TimeRange) -> Vec<TimeRange> {
        if !self.overlaps(other) {
            return vec![*self];
        }

        let mut pieces = Vec::with_capacity(2);
        if self.start < other.start {
            pieces.push(TimeRange { start: self.start, end: other.start });
        }
        if other.end < self.end {
            pieces.push(TimeRange { start: other.end, end: self.end });
        }
        pieces
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Merge a set of ranges into the minimal sorted sequence of
/// non-overlapping ranges. Touching ranges are coalesced.
pub fn union(ranges: &[TimeRange]) -> Vec<TimeRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| r.start);

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => {
                if range.end > last.end {
                    last.end = range.end;
                }
            }
            _ => merged.push(range),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range(start_hour: u32, end_hour: u32) -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2026, 3, 2, start_hour, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 2, end_hour, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        let t = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        assert!(TimeRange::new(t, t).is_err());
        assert!(TimeRange::new(t, t - Duration::minutes(1)).is_err());
    }

    #[test]
    fn duration_spans_start_to_end() {
        assert_eq!(range(9, 17).duration(), Duration::hours(8));

        let pieces = range(9, 17).subtract(&range(12, 13));
        assert_eq!(pieces[0].duration() + pieces[1].duration(), Duration::hours(7));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        assert!(!range(9, 10).overlaps(&range(10, 11)));
        assert!(range(9, 10).overlaps(&range(9, 10)));
        assert!(range(9, 11).overlaps(&range(10, 12)));
    }

    #[test]
    fn containment_includes_boundaries() {
        assert!(range(9, 17).contains(&range(9, 17)));
        assert!(range(9, 17).contains(&range(9, 10)));
        assert!(range(9, 17).contains(&range(16, 17)));
        assert!(!range(9, 17).contains(&range(8, 10)));
    }

    #[test]
    fn subtract_splits_on_interior_cut() {
        let pieces = range(9, 17).subtract(&range(12, 13));
        assert_eq!(pieces, vec![range(9, 12), range(13, 17)]);
    }

    #[test]
    fn subtract_of_disjoint_range_is_identity() {
        assert_eq!(range(9, 12).subtract(&range(13, 14)), vec![range(9, 12)]);
        // Touching ranges share no instant
        assert_eq!(range(9, 12).subtract(&range(12, 14)), vec![range(9, 12)]);
    }

    #[test]
    fn subtract_of_covering_range_is_empty() {
        assert!(range(10, 11).subtract(&range(9, 12)).is_empty());
        assert!(range(9, 12).subtract(&range(9, 12)).is_empty());
    }

    #[test]
    fn subtract_trims_edges() {
        assert_eq!(range(9, 12).subtract(&range(8, 10)), vec![range(10, 12)]);
        assert_eq!(range(9, 12).subtract(&range(11, 13)), vec![range(9, 11)]);
    }

    #[test]
    fn union_merges_overlapping_and_touching() {
        let merged = union(&[range(13, 14), range(9, 10), range(10, 11), range(9, 12)]);
        assert_eq!(merged, vec![range(9, 12), range(13, 14)]);
    }

    #[test]
    fn union_of_empty_set_is_empty() {
        assert!(union(&[]).is_empty());
    }

    #[test]
    fn serde_round_trip_preserves_instants() {
        let original = range(9, 17);
        let json = serde_json::to_string(&original).unwrap();
        let back: TimeRange = serde_json::from_str(&json).unwrap();
        assert_eq!(original, back);
    }
}
