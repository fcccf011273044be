use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::predict::error::PredictError;

pub const DEFAULT_SAMPLES: usize = 288;
pub const DEFAULT_PAST_SPAN: Duration = Duration::minutes(30);
pub const DEFAULT_FUTURE_SPAN: Duration = Duration::hours(12);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    pub samples: usize,
    pub past_span: Duration,
    pub future_span: Duration,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            past_span: DEFAULT_PAST_SPAN,
            future_span: DEFAULT_FUTURE_SPAN,
        }
    }
}

/// Sample instants bracketing the current time.
///
/// `past` ends at `current_time` and `future` starts at it, so the two
/// windows share one boundary sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeWindows {
    pub current_time: DateTime<Utc>,
    pub past: Vec<DateTime<Utc>>,
    pub future: Vec<DateTime<Utc>>,
}

impl TimeWindows {
    pub fn generate(now: DateTime<Utc>, config: &WindowConfig) -> Result<Self, PredictError> {
        if config.samples < 2 {
            return Err(PredictError::InvalidWindow(format!(
                "need at least 2 samples per window, got {}",
                config.samples
            )));
        }
        if config.past_span <= Duration::zero() || config.future_span <= Duration::zero() {
            return Err(PredictError::InvalidWindow(
                "window spans must be positive".into(),
            ));
        }

        let current_time = now.trunc_subsecs(0);
        let start = current_time
            .checked_sub_signed(config.past_span)
            .ok_or_else(|| PredictError::InvalidWindow("past span out of range".into()))?;
        let end = current_time
            .checked_add_signed(config.future_span)
            .ok_or_else(|| PredictError::InvalidWindow("future span out of range".into()))?;
        let past = linspace(start, current_time, config.samples)?;
        let future = linspace(current_time, end, config.samples)?;

        Ok(Self {
            current_time,
            past,
            future,
        })
    }
}

/// `count` evenly spaced instants from `start` to `end`, both included.
fn linspace(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    count: usize,
) -> Result<Vec<DateTime<Utc>>, PredictError> {
    let total_ns = (end - start)
        .num_nanoseconds()
        .ok_or_else(|| PredictError::InvalidWindow("window span too large".into()))?;
    let intervals = (count - 1) as i128;

    Ok((0..count)
        .map(|i| {
            let offset = (total_ns as i128 * i as i128 / intervals) as i64;
            start + Duration::nanoseconds(offset)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 3, 8, 15, 42).unwrap() + Duration::milliseconds(731)
    }

    #[test]
    fn windows_share_the_current_instant() {
        let windows = TimeWindows::generate(now(), &WindowConfig::default()).unwrap();
        let current = Utc.with_ymd_and_hms(2024, 11, 3, 8, 15, 42).unwrap();

        assert_eq!(windows.current_time, current);
        assert_eq!(windows.past.len(), DEFAULT_SAMPLES);
        assert_eq!(windows.future.len(), DEFAULT_SAMPLES);
        assert_eq!(windows.past[0], current - Duration::minutes(30));
        assert_eq!(*windows.past.last().unwrap(), current);
        assert_eq!(windows.future[0], current);
        assert_eq!(*windows.future.last().unwrap(), current + Duration::hours(12));
    }

    #[test]
    fn samples_are_evenly_spaced_and_ordered() {
        let config = WindowConfig {
            samples: 5,
            past_span: Duration::minutes(20),
            future_span: Duration::hours(2),
        };
        let windows = TimeWindows::generate(now(), &config).unwrap();

        for pair in windows.past.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::minutes(5));
        }
        for pair in windows.future.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::minutes(30));
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let a = TimeWindows::generate(now(), &WindowConfig::default()).unwrap();
        let b = TimeWindows::generate(now(), &WindowConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_degenerate_configs() {
        let single = WindowConfig {
            samples: 1,
            ..WindowConfig::default()
        };
        assert!(TimeWindows::generate(now(), &single).is_err());

        let empty_span = WindowConfig {
            past_span: Duration::zero(),
            ..WindowConfig::default()
        };
        assert!(TimeWindows::generate(now(), &empty_span).is_err());
    }

    #[test]
    fn spans_past_the_calendar_are_rejected() {
        let far_future = WindowConfig {
            future_span: Duration::days(365 * 1_000_000),
            ..WindowConfig::default()
        };
        assert!(matches!(
            TimeWindows::generate(now(), &far_future),
            Err(PredictError::InvalidWindow(_))
        ));

        let far_past = WindowConfig {
            past_span: Duration::days(365 * 1_000_000),
            ..WindowConfig::default()
        };
        assert!(matches!(
            TimeWindows::generate(now(), &far_past),
            Err(PredictError::InvalidWindow(_))
        ));
    }
}
