use chrono::{DateTime, TimeZone};

use crate::core::calendar::add_days;

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum Day {
    Today,
    Tomorrow,
}

impl Day {
    pub const ALL: [Self; 2] = [Self::Today, Self::Tomorrow];

    pub const fn offset(self) -> i64 {
        match self {
            Self::Today => 0,
            Self::Tomorrow => 1,
        }
    }

    /// Path segment in the published state tree.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
        }
    }

    /// Local midnight at which the day starts.
    #[must_use]
    pub fn start<Tz: TimeZone>(self, now: &DateTime<Tz>) -> DateTime<Tz> {
        add_days(now, self.offset())
    }
}
