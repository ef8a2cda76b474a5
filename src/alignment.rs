use chrono::{DateTime, Duration, FixedOffset, Timelike};
use chrono_tz::Tz;

use crate::domain::AlignedHour;

/// Hours shown in the chart and the schedule table.
pub const DISPLAY_WINDOW_HOURS: usize = 24;

/// Indices past the end of a series are read again this many hours earlier,
/// i.e. the series behaves as if concatenated with its own second day.
pub const WRAPAROUND_OFFSET_HOURS: usize = 24;

/// Maps display positions to slots of the day-anchored optimizer arrays.
///
/// "Now" is always the server timestamp handed in, never the local clock:
/// the dashboard can run on a machine with a different zone or a skewed clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAligner {
    time_zone: Tz,
}

impl TimeAligner {
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone }
    }

    /// Viewer-local hour of day of the server timestamp.
    pub fn current_hour(&self, server_timestamp: DateTime<FixedOffset>) -> usize {
        server_timestamp.with_timezone(&self.time_zone).hour() as usize
    }

    /// Start of the viewer-local hour containing the server timestamp.
    pub fn hour_start(&self, server_timestamp: DateTime<FixedOffset>) -> DateTime<Tz> {
        let local = server_timestamp.with_timezone(&self.time_zone);
        local
            - Duration::minutes(i64::from(local.minute()))
            - Duration::seconds(i64::from(local.second()))
            - Duration::nanoseconds(i64::from(local.nanosecond()))
    }

    pub fn align(
        &self,
        server_timestamp: DateTime<FixedOffset>,
        window_hours: usize,
    ) -> Vec<AlignedHour> {
        let current_hour = self.current_hour(server_timestamp);
        let first = self.hour_start(server_timestamp);
        (0..window_hours)
            .map(|i| AlignedHour {
                starts_at: first + Duration::hours(i as i64),
                source_index: current_hour + i,
            })
            .collect()
    }
}

/// Resolve an index into a series of `len` entries, wrapping indices past
/// the end back by `wraparound_offset` hours.
pub fn wrapped_index(len: usize, index: usize, wraparound_offset: usize) -> Option<usize> {
    let mut idx = index;
    while idx >= len {
        if wraparound_offset == 0 {
            return None;
        }
        idx = idx.checked_sub(wraparound_offset)?;
    }
    Some(idx)
}

/// Look up a day-anchored series with wraparound. NaN when nothing can be read.
pub fn value_at(series: &[f64], index: usize, wraparound_offset: usize) -> f64 {
    wrapped_index(series.len(), index, wraparound_offset).map_or(f64::NAN, |idx| series[idx])
}

/// Flag counterpart of [`value_at`]. False when nothing can be read.
pub fn flag_at(series: &[bool], index: usize, wraparound_offset: usize) -> bool {
    wrapped_index(series.len(), index, wraparound_offset).is_some_and(|idx| series[idx])
}
