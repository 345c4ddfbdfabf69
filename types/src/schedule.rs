//! Weekly access schedules attached to out-of-schedule permission denials.
//!
//! A schedule has one entry per weekday (Monday first). Each entry is an
//! ordered list of disjoint `[start, end)` ranges in seconds since midnight.
//! The wire shape is `{"weekdays": [{"ranges": [{"start": .., "end": ..}]}]}`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SECONDS_PER_DAY: u32 = 86_400;
pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("schedule must have {DAYS_PER_WEEK} weekdays, got {0}")]
    WeekdayCount(usize),
    #[error("range [{start}, {end}) is empty or extends past the end of the day")]
    InvalidRange { start: u32, end: u32 },
    #[error("ranges [{prev_start}, {prev_end}) and [{start}, {end}) overlap or are out of order")]
    Unordered {
        prev_start: u32,
        prev_end: u32,
        start: u32,
        end: u32,
    },
}

/// Day of the week, Monday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; DAYS_PER_WEEK] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
        }
    }
}

/// Allowed time range, in seconds since midnight. `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct ScheduleRange {
    start: u32,
    end: u32,
}

#[derive(Deserialize)]
struct RawRange {
    start: u32,
    end: u32,
}

impl TryFrom<RawRange> for ScheduleRange {
    type Error = ScheduleError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl ScheduleRange {
    pub fn new(start: u32, end: u32) -> Result<Self, ScheduleError> {
        if start >= end || end > SECONDS_PER_DAY {
            return Err(ScheduleError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn start(self) -> u32 {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> u32 {
        self.end
    }

    #[must_use]
    pub const fn contains(self, second_of_day: u32) -> bool {
        second_of_day >= self.start && second_of_day < self.end
    }
}

/// Allowed ranges for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWeekday")]
pub struct ScheduleWeekday {
    ranges: Vec<ScheduleRange>,
}

#[derive(Deserialize)]
struct RawWeekday {
    #[serde(default)]
    ranges: Vec<ScheduleRange>,
}

impl TryFrom<RawWeekday> for ScheduleWeekday {
    type Error = ScheduleError;

    fn try_from(raw: RawWeekday) -> Result<Self, Self::Error> {
        Self::new(raw.ranges)
    }
}

impl ScheduleWeekday {
    pub fn new(ranges: Vec<ScheduleRange>) -> Result<Self, ScheduleError> {
        for pair in ranges.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            if next.start < prev.end {
                return Err(ScheduleError::Unordered {
                    prev_start: prev.start,
                    prev_end: prev.end,
                    start: next.start,
                    end: next.end,
                });
            }
        }
        Ok(Self { ranges })
    }

    #[must_use]
    pub fn ranges(&self) -> &[ScheduleRange] {
        &self.ranges
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.ranges.is_empty()
    }

    #[must_use]
    pub fn allows(&self, second_of_day: u32) -> bool {
        self.ranges.iter().any(|r| r.contains(second_of_day))
    }
}

/// Member's weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchedule")]
pub struct Schedule {
    weekdays: Vec<ScheduleWeekday>,
}

#[derive(Deserialize)]
struct RawSchedule {
    weekdays: Vec<ScheduleWeekday>,
}

impl TryFrom<RawSchedule> for Schedule {
    type Error = ScheduleError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        Self::new(raw.weekdays)
    }
}

impl Schedule {
    pub fn new(weekdays: Vec<ScheduleWeekday>) -> Result<Self, ScheduleError> {
        if weekdays.len() != DAYS_PER_WEEK {
            return Err(ScheduleError::WeekdayCount(weekdays.len()));
        }
        Ok(Self { weekdays })
    }

    /// A schedule that never allows access.
    #[must_use]
    pub fn closed() -> Self {
        Self {
            weekdays: vec![ScheduleWeekday::default(); DAYS_PER_WEEK],
        }
    }

    #[must_use]
    pub fn weekdays(&self) -> &[ScheduleWeekday] {
        &self.weekdays
    }

    #[must_use]
    pub fn day(&self, day: Weekday) -> &ScheduleWeekday {
        &self.weekdays[day.index()]
    }

    #[must_use]
    pub fn allows(&self, day: Weekday, second_of_day: u32) -> bool {
        self.day(day).allows(second_of_day)
    }
}
