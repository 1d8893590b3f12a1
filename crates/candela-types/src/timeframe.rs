//! Aggregation timeframe definitions.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

const MINUTES_IN_DAY: u32 = 1440;
const HOURS_IN_DAY: u32 = 24;
const DAYS_IN_YEAR: u32 = 365;
const MONTHS_IN_YEAR: u32 = 12;

/// Time unit of a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeframeUnit {
    /// Minute bars.
    Minute,
    /// Hour bars.
    Hour,
    /// Day bars.
    Day,
    /// Week bars.
    Week,
    /// Month bars.
    Month,
    /// Year bars.
    Year,
}

impl TimeframeUnit {
    /// Returns the unit as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// The single-character prefix used in timeframe names.
    ///
    /// Minute is lowercase `m` and Month uppercase `M`; the grammar is
    /// case-sensitive.
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Minute => 'm',
            Self::Hour => 'H',
            Self::Day => 'D',
            Self::Week => 'W',
            Self::Month => 'M',
            Self::Year => 'Y',
        }
    }
}

impl std::fmt::Display for TimeframeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregation timeframe: a time unit and a length expressed in that unit.
///
/// Construction is validated so that every calendar day, year, or month holds
/// a whole number of buckets:
///
/// - Minute: length must divide 1440 and be shorter than a day
/// - Hour: length must divide 24 and be shorter than a day
/// - Day: length must be shorter than a year
/// - Week: only length 1 is supported
/// - Month: length must divide 12 and be shorter than a year
/// - Year: only length 1 is supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    unit: TimeframeUnit,
    length: u32,
}

impl Timeframe {
    /// Creates a validated timeframe.
    ///
    /// # Errors
    ///
    /// Returns [`TimeframeError::InvalidLength`] if the unit/length
    /// combination violates the rules above.
    pub const fn new(unit: TimeframeUnit, length: u32) -> Result<Self, TimeframeError> {
        let valid = length > 0
            && match unit {
                TimeframeUnit::Minute => length < MINUTES_IN_DAY && MINUTES_IN_DAY % length == 0,
                TimeframeUnit::Hour => length < HOURS_IN_DAY && HOURS_IN_DAY % length == 0,
                TimeframeUnit::Day => length < DAYS_IN_YEAR,
                TimeframeUnit::Week | TimeframeUnit::Year => length == 1,
                TimeframeUnit::Month => length < MONTHS_IN_YEAR && MONTHS_IN_YEAR % length == 0,
            };
        if valid {
            Ok(Self { unit, length })
        } else {
            Err(TimeframeError::InvalidLength { unit, length })
        }
    }

    /// Returns the time unit.
    #[must_use]
    pub const fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// Returns the length expressed in units.
    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Returns the bucket length in seconds, or `None` for calendar-sized
    /// units (week, month, year).
    #[must_use]
    pub const fn length_seconds(&self) -> Option<i64> {
        let length = self.length as i64;
        match self.unit {
            TimeframeUnit::Minute => Some(length * 60),
            TimeframeUnit::Hour => Some(length * 3600),
            TimeframeUnit::Day => Some(length * 86_400),
            TimeframeUnit::Week | TimeframeUnit::Month | TimeframeUnit::Year => None,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.unit.prefix(), self.length)
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let unit = match chars.next() {
            None => return Err(TimeframeError::Empty),
            Some('m') => TimeframeUnit::Minute,
            Some('H') => TimeframeUnit::Hour,
            Some('D') => TimeframeUnit::Day,
            Some('W') => TimeframeUnit::Week,
            Some('M') => TimeframeUnit::Month,
            Some('Y') => TimeframeUnit::Year,
            Some(c) => return Err(TimeframeError::InvalidUnit(c)),
        };
        let length = chars
            .as_str()
            .parse::<u32>()
            .map_err(|_| TimeframeError::BadLength(s.to_string()))?;
        Self::new(unit, length)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Timeframe> for String {
    fn from(timeframe: Timeframe) -> Self {
        timeframe.to_string()
    }
}

/// Error returned for an invalid timeframe name or unit/length combination.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeframeError {
    /// The timeframe name was empty.
    #[error("empty timeframe name")]
    Empty,

    /// The name did not start with a known unit character.
    #[error("invalid timeframe unit '{0}', the name must start with m, H, D, W, M or Y")]
    InvalidUnit(char),

    /// The length part of the name was not a positive integer.
    #[error("invalid timeframe length in '{0}'")]
    BadLength(String),

    /// The length is not valid for the unit.
    #[error("length {length} is not valid for a {unit} timeframe")]
    InvalidLength {
        /// The time unit.
        unit: TimeframeUnit,
        /// The rejected length.
        length: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let tf = "H4".parse::<Timeframe>().unwrap();
        assert_eq!(tf.unit(), TimeframeUnit::Hour);
        assert_eq!(tf.length(), 4);

        let tf = "m1".parse::<Timeframe>().unwrap();
        assert_eq!(tf.unit(), TimeframeUnit::Minute);
        assert_eq!(tf.length(), 1);

        assert_eq!(
            "X1".parse::<Timeframe>(),
            Err(TimeframeError::InvalidUnit('X'))
        );
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!("M1".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Month);
        assert_eq!("m1".parse::<Timeframe>().unwrap().unit(), TimeframeUnit::Minute);
        assert!("h1".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_parse_bad_length() {
        assert!(matches!(
            "m".parse::<Timeframe>(),
            Err(TimeframeError::BadLength(_))
        ));
        assert!(matches!(
            "Hx".parse::<Timeframe>(),
            Err(TimeframeError::BadLength(_))
        ));
        assert_eq!("".parse::<Timeframe>(), Err(TimeframeError::Empty));
    }

    #[test]
    fn test_length_validation() {
        // 7 does not divide 1440 minutes
        assert!(Timeframe::new(TimeframeUnit::Minute, 7).is_err());
        assert!(Timeframe::new(TimeframeUnit::Minute, 30).is_ok());
        assert!(Timeframe::new(TimeframeUnit::Minute, 1440).is_err());

        assert!(Timeframe::new(TimeframeUnit::Hour, 5).is_err());
        assert!(Timeframe::new(TimeframeUnit::Hour, 4).is_ok());
        assert!(Timeframe::new(TimeframeUnit::Hour, 24).is_err());

        assert!(Timeframe::new(TimeframeUnit::Day, 364).is_ok());
        assert!(Timeframe::new(TimeframeUnit::Day, 365).is_err());

        assert!(Timeframe::new(TimeframeUnit::Week, 1).is_ok());
        assert!(Timeframe::new(TimeframeUnit::Week, 2).is_err());

        assert!(Timeframe::new(TimeframeUnit::Month, 5).is_err());
        assert!(Timeframe::new(TimeframeUnit::Month, 6).is_ok());

        assert!(Timeframe::new(TimeframeUnit::Year, 1).is_ok());
        assert!(Timeframe::new(TimeframeUnit::Year, 2).is_err());

        assert!(Timeframe::new(TimeframeUnit::Minute, 0).is_err());
    }

    #[test]
    fn test_name_round_trip() {
        for name in ["m1", "m15", "H4", "D1", "W1", "M3", "Y1"] {
            let tf = name.parse::<Timeframe>().unwrap();
            assert_eq!(tf.to_string(), name);
        }
    }

    #[test]
    fn test_length_seconds() {
        assert_eq!("m5".parse::<Timeframe>().unwrap().length_seconds(), Some(300));
        assert_eq!("H4".parse::<Timeframe>().unwrap().length_seconds(), Some(14_400));
        assert_eq!("D1".parse::<Timeframe>().unwrap().length_seconds(), Some(86_400));
        assert_eq!("W1".parse::<Timeframe>().unwrap().length_seconds(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let tf = "H4".parse::<Timeframe>().unwrap();
        let json = serde_json::to_string(&tf).unwrap();
        assert_eq!(json, "\"H4\"");
        assert_eq!(serde_json::from_str::<Timeframe>(&json).unwrap(), tf);

        assert!(serde_json::from_str::<Timeframe>("\"m7\"").is_err());
    }
}
