/*!
 * Programmed recording timers.
 *
 * Timers are ordered by start time, then duration, record source type and recording sequence.
 * Two timers that agree on these four fields are the same timer, even if their
 * record sources differ in detail.
 */
use crate::{
    operand::{RecordSource, RecordSourceType},
    types::RecordingSequence,
};
use std::{
    cmp::Ordering,
    collections::BTreeSet,
    time::{Duration, SystemTime},
};
use time::OffsetDateTime;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// One scheduled recording
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    pub start: SystemTime,
    /// whole seconds
    pub duration: Duration,
    /// weekdays on which the recording repeats
    pub recording_seq: RecordingSequence,
    pub source: RecordSource,
}

impl Timer {
    #[inline]
    pub fn end(&self) -> SystemTime {
        self.start + self.duration
    }
    /// the half open intervals `[start, end)` intersect
    pub fn overlaps(&self, other: &Timer) -> bool {
        self.start < other.end() && other.start < self.end()
    }
    /// is `now` inside `[start, end)`
    pub fn is_running(&self, now: SystemTime) -> bool {
        self.start <= now && now < self.end()
    }
    /// The key a Clear Timer message has to match
    pub fn is_job(&self, start: SystemTime, duration: Duration, source: &RecordSource) -> bool {
        self.start == start && self.duration == duration && self.source == *source
    }
    /// The next run of a repeating timer, after this one.
    pub fn next_occurrence(&self) -> Option<Timer> {
        if self.recording_seq.is_empty() {
            return None;
        }
        let weekday = OffsetDateTime::from(self.start)
            .weekday()
            .number_days_from_sunday();
        (1..=7u8)
            .find(|d| {
                self.recording_seq
                    .contains(RecordingSequence::day(weekday + d))
            })
            .map(|d| Timer {
                start: self.start + DAY * d as u32,
                ..*self
            })
    }

    fn key(&self) -> (SystemTime, Duration, RecordSourceType, u8) {
        (
            self.start,
            self.duration,
            self.source.source_type(),
            self.recording_seq.bits(),
        )
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}
impl Eq for Timer {}
impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Result of [TimerSet::insert]
#[derive(Debug, PartialEq, Eq)]
pub enum Insert {
    Accepted,
    /// An existing timer is equal or overlaps. Nothing was changed.
    Conflict(Timer),
}

/// All programmed timers of a device
#[derive(Debug, Default, Clone)]
pub struct TimerSet {
    timers: BTreeSet<Timer>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }
    /// Add `timer` unless it duplicates or overlaps an existing one.
    pub fn insert(&mut self, timer: Timer) -> Insert {
        if let Some(existing) = self
            .timers
            .iter()
            .find(|t| **t == timer || t.overlaps(&timer))
        {
            return Insert::Conflict(*existing);
        }
        self.timers.insert(timer);
        Insert::Accepted
    }
    /// Remove the timer programmed for exactly this job.
    pub fn remove(
        &mut self,
        start: SystemTime,
        duration: Duration,
        source: &RecordSource,
    ) -> Option<Timer> {
        let found = *self
            .timers
            .iter()
            .find(|t| t.is_job(start, duration, source))?;
        self.timers.remove(&found);
        Some(found)
    }
    /// Take out every timer that ended at or before `now`, earliest end first.
    pub fn expired(&mut self, now: SystemTime) -> Vec<Timer> {
        let mut done: Vec<Timer> = self
            .timers
            .iter()
            .filter(|t| t.end() <= now)
            .copied()
            .collect();
        for t in &done {
            self.timers.remove(t);
        }
        // stable: equal ends stay in timer order
        done.sort_by_key(|t| t.end());
        done
    }
    /// the timer recording right now
    pub fn active(&self, now: SystemTime) -> Option<&Timer> {
        self.timers.iter().find(|t| t.is_running(now))
    }
    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.timers.iter()
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.timers.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
    /// recording time of all programmed timers
    pub fn total_duration(&self) -> Duration {
        self.timers.iter().map(|t| t.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::{AnalogueBroadcastType, AnalogueService, BroadcastSystem};

    // 2024-01-01 00:00:00 UTC, a monday
    const BASE: u64 = 1_704_067_200;

    fn at(min: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(BASE + min * 60)
    }
    fn timer(start_min: u64, dur_min: u64, source: RecordSource) -> Timer {
        Timer {
            start: at(start_min),
            duration: Duration::from_secs(dur_min * 60),
            recording_seq: RecordingSequence::empty(),
            source,
        }
    }
    fn analogue() -> RecordSource {
        RecordSource::Analogue(AnalogueService {
            bcast_type: AnalogueBroadcastType::Cable,
            freq: 0x1000,
            system: BroadcastSystem::PalBg,
        })
    }

    #[test]
    fn ordered_iteration() {
        let mut set = TimerSet::new();
        let late = timer(600, 30, RecordSource::Own);
        let early = timer(60, 30, RecordSource::ExtPlug(1));
        let same_start_shorter = timer(600 - 120, 10, analogue());
        assert_eq!(set.insert(late), Insert::Accepted);
        assert_eq!(set.insert(early), Insert::Accepted);
        assert_eq!(set.insert(same_start_shorter), Insert::Accepted);
        let order: Vec<_> = set.iter().copied().collect();
        assert_eq!(order, vec![early, same_start_shorter, late]);
    }

    #[test]
    fn order_breaks_ties_by_source_then_sequence() {
        let a = timer(0, 30, RecordSource::Own);
        let b = timer(0, 30, analogue());
        assert!(a < b);
        let mut c = b;
        c.recording_seq = RecordingSequence::MONDAY;
        assert!(b < c);
        // different channel but same type: same timer
        let mut d = b;
        d.source = RecordSource::Analogue(AnalogueService {
            freq: 0x2000,
            ..match analogue() {
                RecordSource::Analogue(a) => a,
                _ => unreachable!(),
            }
        });
        assert_eq!(b, d);
    }

    #[test]
    fn overlap_is_rejected_without_change() {
        let mut set = TimerSet::new();
        let first = timer(600, 30, RecordSource::Own);
        assert_eq!(set.insert(first), Insert::Accepted);
        let second = timer(615, 30, analogue());
        assert_eq!(set.insert(second), Insert::Conflict(first));
        assert_eq!(set.insert(second), Insert::Conflict(first));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next(), Some(&first));
        // touching intervals do not overlap
        assert_eq!(set.insert(timer(630, 30, analogue())), Insert::Accepted);
    }

    #[test]
    fn remove_needs_exact_job() {
        let mut set = TimerSet::new();
        let t = timer(10, 20, RecordSource::ExtPlug(2));
        set.insert(t);
        assert_eq!(
            set.remove(t.start, t.duration, &RecordSource::ExtPlug(3)),
            None
        );
        assert_eq!(set.remove(t.start, t.duration, &t.source), Some(t));
        assert!(set.is_empty());
        assert_eq!(set.remove(t.start, t.duration, &t.source), None);
    }

    #[test]
    fn expiry_is_delivered_once() {
        let mut set = TimerSet::new();
        let a = timer(0, 60, RecordSource::Own);
        let b = timer(60, 10, analogue());
        let c = timer(200, 10, RecordSource::ExtPlug(1));
        set.insert(c);
        set.insert(b);
        set.insert(a);

        assert!(set.expired(at(59)).is_empty());
        assert_eq!(set.expired(at(70)), vec![a, b]);
        assert!(set.expired(at(70)).is_empty());
        assert!(set.expired(at(100)).is_empty());
        assert_eq!(set.active(at(205)), Some(&c));
        assert_eq!(set.expired(at(1000)), vec![c]);
        assert!(set.expired(at(2000)).is_empty());
    }

    #[test]
    fn repeating_timer_moves_to_next_weekday() {
        let mut t = timer(8 * 60, 30, RecordSource::Own);
        t.recording_seq = RecordingSequence::MONDAY | RecordingSequence::THURSDAY;
        let next = t.next_occurrence().unwrap();
        assert_eq!(next.start, at((3 * 24 + 8) * 60));
        let after = next.next_occurrence().unwrap();
        assert_eq!(after.start, at((7 * 24 + 8) * 60));
        assert_eq!(timer(0, 1, RecordSource::Own).next_occurrence(), None);
    }

    #[test]
    fn total_duration_sums() {
        let mut set = TimerSet::new();
        set.insert(timer(0, 30, RecordSource::Own));
        set.insert(timer(100, 45, RecordSource::Own));
        assert_eq!(set.total_duration(), Duration::from_secs(75 * 60));
    }
}
