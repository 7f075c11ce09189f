use thiserror::Error;
use time::Duration;

/// A strictly positive duration, used for token lifetimes and cache expiry.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn from_seconds(seconds: u64) -> Option<Self> {
        i64::try_from(seconds)
            .ok()
            .and_then(|seconds| Self::new(Duration::seconds(seconds)))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    /// Whole seconds, rounded up so that sub-second durations still expire.
    #[must_use]
    pub fn whole_seconds_ceil(&self) -> u64 {
        let seconds = self.0.whole_seconds().cast_unsigned();
        if self.0.subsec_nanoseconds() > 0 {
            seconds + 1
        } else {
            seconds
        }
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
