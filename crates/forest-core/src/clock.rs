//! Clock capability. "Today" always comes from here so day rollover can be simulated.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, Timelike, Utc};
use std::sync::Mutex;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current time in the user's local offset.
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Calendar date of `ts` in this clock's local offset.
    fn local_date(&self, ts: &DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(self.now().offset()).date_naive()
    }
}

/// Wall-clock time in the machine's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Mar–May spring, Jun–Aug summer, Sep–Nov autumn, Dec–Feb winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        }
    }

    pub fn of(date: &impl Datelike) -> Self {
        Self::from_month(date.month())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Before 12 morning, before 18 afternoon, otherwise evening.
    pub fn from_hour(hour: u32) -> Self {
        if hour < 12 {
            Self::Morning
        } else if hour < 18 {
            Self::Afternoon
        } else {
            Self::Evening
        }
    }

    pub fn of(time: &impl Timelike) -> Self {
        Self::from_hour(time.hour())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
        }
    }
}
