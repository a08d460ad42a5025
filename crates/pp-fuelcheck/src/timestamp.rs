//! FuelCheck wall-clock timestamps: `DD/MM/YYYY hh:mm:ss AM` in the
//! configured zone.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::FuelCheckError;

pub const FORMAT: &str = "%d/%m/%Y %I:%M:%S %p";

/// Parse an upstream timestamp. During a DST fold the earlier instant wins;
/// a wall time skipped by DST is rejected.
pub fn parse(s: &str, tz: Tz) -> Result<DateTime<Utc>, FuelCheckError> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), FORMAT)
        .map_err(|e| FuelCheckError::Decode(format!("timestamp '{s}': {e}")))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| FuelCheckError::Decode(format!("timestamp '{s}' does not exist in {tz}")))
}

pub fn format(dt: DateTime<Utc>, tz: Tz) -> String {
    dt.with_timezone(&tz).format(FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYDNEY: Tz = chrono_tz::Australia::Sydney;

    #[test]
    fn parses_afternoon_in_sydney_standard_time() {
        // AEST is UTC+10 in June.
        let dt = parse("15/06/2024 02:30:00 PM", SYDNEY).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 6, 15, 4, 30, 0).unwrap());
    }

    #[test]
    fn parses_daylight_saving_offset() {
        // AEDT is UTC+11 in January.
        let dt = parse("10/01/2024 09:00:00 AM", SYDNEY).unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 9, 22, 0, 0).unwrap());
    }

    #[test]
    fn format_round_trips() {
        let dt = Utc.with_ymd_and_hms(2024, 6, 15, 4, 30, 0).unwrap();
        let s = format(dt, SYDNEY);
        assert_eq!(s, "15/06/2024 02:30:00 PM");
        assert_eq!(parse(&s, SYDNEY).unwrap(), dt);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(
            parse("yesterday", SYDNEY),
            Err(FuelCheckError::Decode(_))
        ));
    }
}
