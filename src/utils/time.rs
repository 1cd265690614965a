use chrono::{DateTime, SecondsFormat, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Second-precision UTC stamp written into merged artifacts.
pub fn artifact_stamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn stamp_drops_subseconds() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 5).unwrap();
        assert_eq!(artifact_stamp(dt), "2026-03-01T08:30:05Z");
    }
}
