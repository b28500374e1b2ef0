use std::ops::{Add, AddAssign, Sub, SubAssign};

use chrono::{Local, Timelike};
use thiserror::Error;

/// A point in time expressed as seconds since local midnight.
///
/// GTFS allows `hours` to exceed 23 to represent post-midnight service that still
/// belongs to the previous day's schedule (e.g. a night bus departing at `25:30:00`
/// means 01:30 the following calendar day). Values are therefore plain `u32` seconds,
/// never wrapped modulo 86 400.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u32);

/// An elapsed span of seconds, distinct from [`Time`] so the type system catches
/// "point in time" vs. "duration" mixups (waiting time, walk time, leg duration).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(u32);

/// Earliest representable time, used as the "unset" sentinel for latest-departure
/// style comparisons.
pub const MIN: Time = Time(0);
/// Effectively-unreachable sentinel arrival time, standing in for `+infinity` in
/// comparisons (`arrivals[r][s] = ∞` in spec terms).
pub const MAX: Time = Time(u32::MAX);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseTimeError {
    #[error("time `{0}` does not match H[H]:MM[:SS]")]
    BadFormat(String),
}

impl From<u32> for Time {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Time {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0
    }
}

impl Time {
    pub fn now() -> Self {
        let now = Local::now();
        Self(now.num_seconds_from_midnight())
    }

    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    /// Formats as `HH:MM`, truncating seconds. Values beyond `24:00` are not wrapped;
    /// this mirrors GTFS's own post-midnight convention and is a display-only
    /// concern — the engine itself only ever consumes integer seconds.
    pub fn format_hhmm(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        format!("{h:02}:{m:02}")
    }

    pub fn format_hhmmss(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        format!("{h:02}:{m:02}:{s:02}")
    }

    /// Parses `H:M`, `HH:MM`, or `HH:MM:SS`. Hours may exceed 23 per GTFS convention.
    pub fn parse(text: &str) -> Result<Self, ParseTimeError> {
        let mut parts = text.split(':');
        let err = || ParseTimeError::BadFormat(text.to_string());

        let hours: u32 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let minutes: u32 = parts.next().ok_or_else(err)?.parse().map_err(|_| err())?;
        let seconds: u32 = match parts.next() {
            Some(s) => s.parse().map_err(|_| err())?,
            None => 0,
        };
        if parts.next().is_some() || minutes >= 60 || seconds >= 60 {
            return Err(err());
        }

        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }
}

impl From<u32> for Duration {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Duration {
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes * 60)
    }

    pub const fn from_hours(hours: u32) -> Self {
        Self(hours * 60 * 60)
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    /// Duration as a floating-point number of seconds, used by footpath construction
    /// where `distance / walking_speed` is inherently fractional before rounding.
    pub const fn as_seconds_f64(&self) -> f64 {
        self.0 as f64
    }

    pub fn from_seconds_f64(secs: f64) -> Self {
        Self(secs.round().max(0.0) as u32)
    }
}

impl Sub for Duration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0)
    }
}

impl Add for Duration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0
    }
}
