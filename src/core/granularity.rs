use std::fmt::{Display, Formatter};

use chrono::TimeDelta;

#[derive(Debug, Hash, clap::ValueEnum, enumset::EnumSetType)]
pub enum Granularity {
    /// 24 slots per day.
    Hourly,

    /// 96 slots of 15 minutes per day.
    QuarterHourly,
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::QuarterHourly => write!(f, "quarter-hourly"),
        }
    }
}

impl Granularity {
    /// Number of slots in a regular day, the divisor of the daily average.
    pub const fn n_slots(self) -> u32 {
        match self {
            Self::Hourly => 24,
            Self::QuarterHourly => 96,
        }
    }

    pub const fn slot_duration(self) -> TimeDelta {
        match self {
            Self::Hourly => TimeDelta::hours(1),
            Self::QuarterHourly => TimeDelta::minutes(15),
        }
    }

    /// Root of the published state tree.
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Hourly => "marketprice",
            Self::QuarterHourly => "marketprice_quarter_hourly",
        }
    }

    /// Name of the entry count field in the threshold maps.
    pub const fn count_field(self) -> &'static str {
        match self {
            Self::Hourly => "numberOfHours",
            Self::QuarterHourly => "numberOfSlots",
        }
    }

    /// Sources switch to quarter-hourly data above this many points per day.
    pub const fn detect(n_points: usize) -> Self {
        if n_points > 50 { Self::QuarterHourly } else { Self::Hourly }
    }
}
