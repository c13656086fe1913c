//! Durations with calendar-dependent unit conversion.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl TimeUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Minutes => "m",
            TimeUnit::Hours => "h",
            TimeUnit::Days => "d",
            TimeUnit::Weeks => "w",
            TimeUnit::Months => "mo",
            TimeUnit::Years => "y",
        }
    }
}

/// Working minutes in each calendar period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinutesPerPeriod {
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: u32,
}

impl Default for MinutesPerPeriod {
    fn default() -> Self {
        Self {
            day: 480,
            week: 2400,
            month: 9600,
            year: 115_200,
        }
    }
}

impl MinutesPerPeriod {
    fn minutes_in(&self, unit: TimeUnit) -> f64 {
        let m = match unit {
            TimeUnit::Minutes => 1,
            TimeUnit::Hours => 60,
            TimeUnit::Days => self.day,
            TimeUnit::Weeks => self.week,
            TimeUnit::Months => self.month,
            TimeUnit::Years => self.year,
        };
        f64::from(m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Duration {
    pub value: f64,
    pub unit: TimeUnit,
}

impl Duration {
    pub fn new(value: f64, unit: TimeUnit) -> Self {
        Self { value, unit }
    }

    pub fn hours(value: f64) -> Self {
        Self::new(value, TimeUnit::Hours)
    }

    pub fn minutes(value: f64) -> Self {
        Self::new(value, TimeUnit::Minutes)
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    pub fn is_negative(&self) -> bool {
        self.value < 0.0
    }

    /// Express in another unit. A period with zero minutes leaves the value
    /// unconverted.
    pub fn convert(self, unit: TimeUnit, minutes: &MinutesPerPeriod) -> Duration {
        if self.unit == unit {
            return self;
        }
        let to = minutes.minutes_in(unit);
        if to == 0.0 {
            return self;
        }
        Duration::new(self.value * minutes.minutes_in(self.unit) / to, unit)
    }

    pub fn in_hours(self, minutes: &MinutesPerPeriod) -> f64 {
        self.convert(TimeUnit::Hours, minutes).value
    }

    /// Null-safe sum in the unit of the first present operand.
    pub fn add(a: Option<Duration>, b: Option<Duration>, minutes: &MinutesPerPeriod) -> Option<Duration> {
        match (a, b) {
            (None, None) => None,
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (Some(a), Some(b)) => {
                let b = b.convert(a.unit, minutes);
                Some(Duration::new(a.value + b.value, a.unit))
            }
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.fract() == 0.0 {
            write!(f, "{}{}", self.value, self.unit.suffix())
        } else {
            write!(f, "{:.2}{}", self.value, self.unit.suffix())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_days_to_hours() {
        let m = MinutesPerPeriod::default();
        let d = Duration::new(2.0, TimeUnit::Days).convert(TimeUnit::Hours, &m);
        assert_eq!(d, Duration::hours(16.0));
    }

    #[test]
    fn test_add_uses_first_unit() {
        let m = MinutesPerPeriod {
            day: 600,
            ..Default::default()
        };
        let sum = Duration::add(
            Some(Duration::new(1.0, TimeUnit::Days)),
            Some(Duration::hours(5.0)),
            &m,
        )
        .unwrap();
        assert_eq!(sum, Duration::new(1.5, TimeUnit::Days));
    }

    #[test]
    fn test_add_is_null_safe() {
        let m = MinutesPerPeriod::default();
        assert_eq!(Duration::add(None, None, &m), None);
        assert_eq!(
            Duration::add(None, Some(Duration::hours(2.0)), &m),
            Some(Duration::hours(2.0))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Duration::hours(8.0).to_string(), "8h");
        assert_eq!(Duration::new(1.5, TimeUnit::Days).to_string(), "1.50d");
    }
}
