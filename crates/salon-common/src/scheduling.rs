//! Slot availability and slot-number sequencing.
//!
//! A branch's working day is cut into back-to-back slots the length of the
//! requested service. Each slot is checked against the active appointments of
//! that branch and day: a slot is full once the number of appointments whose
//! interval overlaps it reaches the branch's slot capacity. Slots that already
//! started are reported as past regardless of load.
//!
//! Slot numbers are the queue position of active appointments within a
//! (branch, day). They are recomputed wholesale on every status or branch
//! change so the sequence stays `1..=k` without gaps.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::SalonError;

/// Bookable hours of a branch day. Slots never run past `close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingWindow {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl WorkingWindow {
    pub fn from_hours(opening_hour: u32, closing_hour: u32) -> Result<Self, SalonError> {
        let open = NaiveTime::from_hms_opt(opening_hour, 0, 0);
        let close = NaiveTime::from_hms_opt(closing_hour, 0, 0);
        match (open, close) {
            (Some(open), Some(close)) if open < close => Ok(Self { open, close }),
            _ => Err(SalonError::validation(format!(
                "Invalid working hours {opening_hour}:00-{closing_hour}:00"
            ))),
        }
    }

    /// Whether `[start, start + duration)` lies inside the window on its own day.
    pub fn contains(&self, start: NaiveDateTime, duration_minutes: i32) -> bool {
        let end = start + Duration::minutes(i64::from(duration_minutes));
        start.time() >= self.open && end.date() == start.date() && end.time() <= self.close
    }
}

impl Default for WorkingWindow {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Time range occupied by an existing active appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedInterval {
    pub start: NaiveDateTime,
    pub duration_minutes: i32,
}

impl BookedInterval {
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Half-open interval overlap: `[a_start, a_end)` vs `[b_start, b_end)`.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Number of booked intervals that overlap `[start, start + duration)`.
pub fn count_overlapping(
    start: NaiveDateTime,
    duration_minutes: i32,
    booked: &[BookedInterval],
) -> usize {
    let end = start + Duration::minutes(i64::from(duration_minutes));
    booked
        .iter()
        .filter(|b| overlaps(start, end, b.start, b.end()))
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotStatus {
    Available,
    NotAvailable,
    PastTime,
}

/// One bookable window as returned by the availability endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    /// `HH:MM`, 24-hour clock
    pub start_time: String,
    pub end_time: String,
    /// `hh:MM AM`, 12-hour clock
    pub start_time_12h: String,
    pub end_time_12h: String,
    pub status: SlotStatus,
    /// Active appointments overlapping this window
    pub booked: usize,
    pub capacity: i32,
}

fn fmt_24h(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

fn fmt_12h(t: NaiveTime) -> String {
    t.format("%I:%M %p").to_string()
}

/// Partition `window` on `date` into consecutive `duration_minutes` slots and
/// classify each one.
pub fn build_slots(
    date: NaiveDate,
    window: &WorkingWindow,
    duration_minutes: i32,
    capacity: i32,
    booked: &[BookedInterval],
    now: NaiveDateTime,
) -> Result<Vec<Slot>, SalonError> {
    if duration_minutes <= 0 {
        return Err(SalonError::validation("Service duration must be positive"));
    }
    if capacity <= 0 {
        return Err(SalonError::validation("Branch slot capacity must be positive"));
    }

    let step = Duration::minutes(i64::from(duration_minutes));
    let close = date.and_time(window.close);
    let mut current = date.and_time(window.open);
    let mut slots = Vec::new();

    while current + step <= close {
        let slot_end = current + step;
        let taken = count_overlapping(current, duration_minutes, booked);

        let status = if current < now {
            SlotStatus::PastTime
        } else if taken >= capacity as usize {
            SlotStatus::NotAvailable
        } else {
            SlotStatus::Available
        };

        slots.push(Slot {
            start_time: fmt_24h(current.time()),
            end_time: fmt_24h(slot_end.time()),
            start_time_12h: fmt_12h(current.time()),
            end_time_12h: fmt_12h(slot_end.time()),
            status,
            booked: taken,
            capacity,
        });

        current = slot_end;
    }

    Ok(slots)
}

/// Parse a `YYYY-MM-DD` query value.
pub fn parse_date(raw: &str) -> Result<NaiveDate, SalonError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| SalonError::validation("Invalid date format, expected YYYY-MM-DD"))
}

/// Slot number for a new active appointment given the day's current maximum.
pub fn next_slot_number(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}

/// An active appointment awaiting a queue position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: Uuid,
    pub status_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    fn queued_at(&self) -> DateTime<Utc> {
        self.status_updated_at.unwrap_or(self.created_at)
    }
}

/// Assign contiguous slot numbers `1..=k` by ascending
/// `status_updated_at`, falling back to `created_at`. Ties break on ID.
pub fn resequence(entries: &[QueueEntry]) -> Vec<(Uuid, i32)> {
    let mut ordered: Vec<&QueueEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| a.queued_at().cmp(&b.queued_at()).then(a.id.cmp(&b.id)));
    ordered
        .into_iter()
        .zip(1..)
        .map(|(entry, number)| (entry.id, number))
        .collect()
}

/// A (branch, day) queue.
pub type QueueKey = (Uuid, NaiveDate);

/// How an appointment edit touches the slot queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueChange {
    pub from: QueueKey,
    pub to: QueueKey,
    pub status_changed: bool,
    pub start_changed: bool,
    /// Status after the edit is one that holds a slot.
    pub active_after: bool,
}

impl QueueChange {
    /// The appointment leaves its (branch, day) queue.
    pub fn moved(&self) -> bool {
        self.from != self.to
    }

    /// Queues to lock, sorted so concurrent movers take them in the same order.
    pub fn lock_order(&self) -> Vec<QueueKey> {
        let mut keys = vec![self.from, self.to];
        keys.sort();
        keys.dedup();
        keys
    }

    /// Whether the target slot must be checked against branch capacity.
    pub fn needs_capacity_check(&self) -> bool {
        self.active_after && (self.moved() || self.start_changed)
    }

    /// Queues to renumber after the write, source first.
    pub fn to_resequence(&self) -> Vec<QueueKey> {
        if self.moved() {
            vec![self.from, self.to]
        } else if self.status_changed {
            vec![self.from]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    fn early_morning() -> NaiveDateTime {
        at(6, 0)
    }

    #[test]
    fn partitions_window_into_whole_slots() {
        let slots =
            build_slots(day(), &WorkingWindow::default(), 60, 2, &[], early_morning()).unwrap();
        assert_eq!(slots.len(), 7);
        assert_eq!(slots[0].start_time, "10:00");
        assert_eq!(slots[0].start_time_12h, "10:00 AM");
        assert_eq!(slots[6].end_time, "17:00");
        assert_eq!(slots[6].end_time_12h, "05:00 PM");
    }

    #[test]
    fn trailing_partial_slot_is_dropped() {
        // 7 hours / 90 minutes = 4 whole slots, the fifth would end at 17:30
        let slots =
            build_slots(day(), &WorkingWindow::default(), 90, 1, &[], early_morning()).unwrap();
        assert_eq!(slots.len(), 4);
        assert_eq!(slots.last().unwrap().end_time, "16:00");
    }

    #[test]
    fn non_overlapping_bookings_leave_every_slot_available() {
        // Bookings never overlap one another, so no slot sees more than one
        let booked: Vec<BookedInterval> = [(10, 0), (12, 0), (14, 0)]
            .iter()
            .map(|&(h, m)| BookedInterval {
                start: at(h, m),
                duration_minutes: 60,
            })
            .collect();

        let slots =
            build_slots(day(), &WorkingWindow::default(), 60, 2, &booked, early_morning())
                .unwrap();
        assert!(slots.iter().all(|s| s.status == SlotStatus::Available));
    }

    #[test]
    fn capacity_reached_marks_covering_slot_not_available() {
        let booked = vec![
            BookedInterval { start: at(11, 0), duration_minutes: 60 },
            BookedInterval { start: at(11, 30), duration_minutes: 30 },
        ];
        let slots =
            build_slots(day(), &WorkingWindow::default(), 60, 2, &booked, early_morning())
                .unwrap();

        let eleven = slots.iter().find(|s| s.start_time == "11:00").unwrap();
        assert_eq!(eleven.booked, 2);
        assert_eq!(eleven.status, SlotStatus::NotAvailable);

        let ten = slots.iter().find(|s| s.start_time == "10:00").unwrap();
        assert_eq!(ten.status, SlotStatus::Available);
    }

    #[test]
    fn partial_overlap_counts_against_whole_slot() {
        // A 15 minute booking at the tail of a 60 minute slot still fills it
        let booked = vec![BookedInterval { start: at(13, 45), duration_minutes: 15 }];
        let slots =
            build_slots(day(), &WorkingWindow::default(), 60, 1, &booked, early_morning())
                .unwrap();
        let one_pm = slots.iter().find(|s| s.start_time == "13:00").unwrap();
        assert_eq!(one_pm.status, SlotStatus::NotAvailable);
    }

    #[test]
    fn past_slots_win_over_capacity() {
        let booked = vec![
            BookedInterval { start: at(10, 0), duration_minutes: 60 },
            BookedInterval { start: at(10, 0), duration_minutes: 60 },
        ];
        let now = at(12, 10);
        let slots =
            build_slots(day(), &WorkingWindow::default(), 60, 1, &booked, now).unwrap();

        assert_eq!(slots[0].status, SlotStatus::PastTime);
        assert_eq!(slots[1].status, SlotStatus::PastTime);
        // 12:00 already started
        assert_eq!(slots[2].status, SlotStatus::PastTime);
        assert_eq!(slots[3].status, SlotStatus::Available);
    }

    #[test]
    fn rejects_non_positive_inputs() {
        let w = WorkingWindow::default();
        assert!(build_slots(day(), &w, 0, 1, &[], early_morning()).is_err());
        assert!(build_slots(day(), &w, 30, 0, &[], early_morning()).is_err());
    }

    #[test]
    fn window_containment() {
        let w = WorkingWindow::default();
        assert!(w.contains(at(10, 0), 60));
        assert!(w.contains(at(16, 0), 60));
        assert!(!w.contains(at(16, 30), 60));
        assert!(!w.contains(at(9, 30), 30));
    }

    #[test]
    fn working_window_rejects_inverted_hours() {
        assert!(WorkingWindow::from_hours(17, 10).is_err());
        assert!(WorkingWindow::from_hours(10, 25).is_err());
        assert_eq!(WorkingWindow::from_hours(10, 17).unwrap(), WorkingWindow::default());
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(parse_date("2026-03-14").unwrap(), day());
        assert!(parse_date("14/03/2026").is_err());
        assert!(parse_date("2026-02-30").is_err());
    }

    #[test]
    fn next_number_starts_at_one() {
        assert_eq!(next_slot_number(None), 1);
        assert_eq!(next_slot_number(Some(4)), 5);
    }

    #[test]
    fn resequence_yields_contiguous_numbers_in_queue_order() {
        let t = |s: i64| Utc.timestamp_opt(1_700_000_000 + s, 0).unwrap();
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let c = Uuid::from_u128(3);
        let entries = vec![
            // created first but re-queued latest
            QueueEntry { id: a, status_updated_at: Some(t(500)), created_at: t(0) },
            QueueEntry { id: b, status_updated_at: None, created_at: t(100) },
            QueueEntry { id: c, status_updated_at: Some(t(200)), created_at: t(50) },
        ];

        let numbered = resequence(&entries);
        assert_eq!(numbered, vec![(b, 1), (c, 2), (a, 3)]);
    }

    #[test]
    fn resequence_breaks_ties_by_id() {
        let t = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let low = Uuid::from_u128(7);
        let high = Uuid::from_u128(9);
        let entries = vec![
            QueueEntry { id: high, status_updated_at: None, created_at: t },
            QueueEntry { id: low, status_updated_at: None, created_at: t },
        ];
        assert_eq!(resequence(&entries), vec![(low, 1), (high, 2)]);
    }

    #[test]
    fn resequence_of_empty_day_is_empty() {
        assert!(resequence(&[]).is_empty());
    }

    fn change(from: QueueKey, to: QueueKey) -> QueueChange {
        QueueChange {
            from,
            to,
            status_changed: false,
            start_changed: false,
            active_after: true,
        }
    }

    #[test]
    fn notes_only_edit_touches_no_queue() {
        let key = (Uuid::from_u128(1), day());
        let c = change(key, key);
        assert!(!c.moved());
        assert_eq!(c.lock_order(), vec![key]);
        assert!(c.to_resequence().is_empty());
        assert!(!c.needs_capacity_check());
    }

    #[test]
    fn status_change_renumbers_own_queue() {
        let key = (Uuid::from_u128(1), day());
        let c = QueueChange {
            status_changed: true,
            ..change(key, key)
        };
        assert_eq!(c.to_resequence(), vec![key]);
        assert!(!c.needs_capacity_check());
    }

    #[test]
    fn same_day_reschedule_checks_capacity_only() {
        let key = (Uuid::from_u128(1), day());
        let c = QueueChange {
            start_changed: true,
            ..change(key, key)
        };
        assert!(c.needs_capacity_check());
        assert!(c.to_resequence().is_empty());
    }

    #[test]
    fn move_renumbers_both_queues_and_locks_sorted() {
        let later = (Uuid::from_u128(1), day().succ_opt().unwrap());
        let earlier = (Uuid::from_u128(1), day());
        let c = QueueChange {
            start_changed: true,
            ..change(later, earlier)
        };
        assert!(c.moved());
        assert_eq!(c.lock_order(), vec![earlier, later]);
        assert_eq!(c.to_resequence(), vec![later, earlier]);
        assert!(c.needs_capacity_check());

        let other_branch = (Uuid::from_u128(2), day());
        let c = change(other_branch, earlier);
        assert_eq!(c.lock_order(), vec![earlier, other_branch]);
    }

    #[test]
    fn cancelling_while_moving_skips_capacity() {
        let c = QueueChange {
            status_changed: true,
            start_changed: true,
            active_after: false,
            ..change((Uuid::from_u128(1), day()), (Uuid::from_u128(2), day()))
        };
        assert!(!c.needs_capacity_check());
        assert_eq!(c.to_resequence().len(), 2);
    }
}
