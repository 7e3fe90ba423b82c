use std::time::Duration;

// xs:duration, the lexical form used by MPD@mediaPresentationDuration:
//
// PT0H0M30.030S => 30.03 seconds
// PT1M30.5S     => 1 minute, 30.5 seconds
// P1DT2H        => 1 day, 2 hours
// P0Y20M0D      => 20 months (converted with 31-day months)
pub fn parse_xs_duration(s: &str) -> Option<Duration> {
    match iso8601::duration(s.trim()) {
        Ok(iso8601::Duration::Weeks(w)) => Some(Duration::from_secs(w as u64 * 60 * 60 * 24 * 7)),
        Ok(iso8601::Duration::YMDHMS {
            year,
            month,
            day,
            hour,
            minute,
            second,
            millisecond,
        }) => {
            let mut secs: u64 = second.into();
            secs += minute as u64 * 60;
            secs += hour as u64 * 60 * 60;
            secs += day as u64 * 60 * 60 * 24;
            secs += month as u64 * 60 * 60 * 24 * 31;
            secs += year as u64 * 60 * 60 * 24 * 365;
            Some(Duration::from_secs(secs) + Duration::from_millis(millisecond as u64))
        }
        Err(e) => {
            tracing::warn!(value = s, error = %e, "Could not parse xs:duration");
            None
        }
    }
}
