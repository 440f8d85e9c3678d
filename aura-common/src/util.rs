use thiserror::Error;
use time::{Duration, UtcDateTime, macros::format_description};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Default, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn new_unchecked(duration: Duration) -> Self {
        Self::new(duration).expect("Duration was not positive.")
    }

    #[must_use]
    pub fn from_secs(secs: u32) -> Option<Self> {
        Self::new(Duration::seconds(secs.into()))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    #[must_use]
    pub fn to_std(&self) -> std::time::Duration {
        self.0.unsigned_abs()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

const RELATIVE_UNITS: [(&str, i64); 6] = [
    ("year", 31_536_000),
    ("month", 2_592_000),
    ("day", 86_400),
    ("hour", 3_600),
    ("minute", 60),
    ("second", 1),
];

/// "3 hours ago" style label for the largest whole unit between `then` and
/// `now`.
#[must_use]
pub fn format_relative(then: UtcDateTime, now: UtcDateTime) -> String {
    let elapsed = (now - then).whole_seconds();

    for (label, unit_secs) in RELATIVE_UNITS {
        let count = elapsed / unit_secs;
        if count >= 1 {
            let plural = if count > 1 { "s" } else { "" };
            return format!("{count} {label}{plural} ago");
        }
    }

    "just now".to_owned()
}

/// "October 5, 2025".
#[must_use]
pub fn format_calendar_date(date_time: UtcDateTime) -> String {
    date_time
        .format(format_description!(
            "[month repr:long] [day padding:none], [year]"
        ))
        .unwrap_or_else(|_| date_time.date().to_string())
}
