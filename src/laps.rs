//! Lap boundary extraction.
//!
//! The lap stream is line oriented: a time-of-day stamp immediately followed
//! by a JSON object, with no separator. Only payloads carrying `CurrentLap`
//! produce a boundary; everything malformed is dropped, because partial lap
//! data is still usable for the lap axis.

use chrono::{NaiveTime, Timelike};
use log::debug;
use serde::Deserialize;

/// A "current lap changed" event. Timestamps are time-of-day only, there is
/// no date component in the source stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LapBoundary {
    pub timestamp: NaiveTime,
    pub lap: u32,
}

#[derive(Deserialize)]
struct LapCountPayload {
    #[serde(rename = "CurrentLap")]
    current_lap: Option<u32>,
}

/// Parses `HH:MM:SS` optionally followed by `.` and 1-3 fractional digits.
/// The fraction is right-padded to exactly 3 digits and read as milliseconds.
/// Anything else yields `None`.
pub fn parse_lap_time(raw: &str) -> Option<NaiveTime> {
    let bytes = raw.as_bytes();
    if bytes.len() < 8 || bytes[2] != b':' || bytes[5] != b':' {
        return None;
    }
    for (i, b) in bytes[..8].iter().enumerate() {
        if i == 2 || i == 5 {
            continue;
        }
        if !b.is_ascii_digit() {
            return None;
        }
    }
    // The first 8 bytes are ASCII, so the split cannot land inside a
    // multi-byte code point.
    let (main, frac) = raw.split_at(8);

    let millis = match frac {
        "" => 0,
        f => {
            let rest = f.strip_prefix('.')?;
            if rest.is_empty() || rest.len() > 3 || !rest.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            format!("{rest:0<3}").parse::<u32>().ok()?
        }
    };

    let hours: u32 = main[0..2].parse().ok()?;
    let minutes: u32 = main[3..5].parse().ok()?;
    let seconds: u32 = main[6..8].parse().ok()?;
    NaiveTime::from_hms_milli_opt(hours, minutes, seconds, millis)
}

/// Milliseconds since midnight, the comparable form used by the axis mapper.
pub fn ms_of_day(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * 1000 + (time.nanosecond() / 1_000_000) as i64
}

/// Parses the raw lap stream into boundaries sorted ascending by timestamp.
/// The sort is stable, so boundaries sharing a timestamp keep parse order.
pub fn extract_lap_boundaries(raw: &str) -> Vec<LapBoundary> {
    let mut boundaries = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(brace) = line.find('{') else {
            debug!("dropping lap line without payload: {line}");
            continue;
        };
        let (stamp, payload) = line.split_at(brace);
        let parsed: LapCountPayload = match serde_json::from_str(payload) {
            Ok(p) => p,
            Err(e) => {
                debug!("dropping unparseable lap payload: {e}");
                continue;
            }
        };
        let Some(lap) = parsed.current_lap else {
            continue;
        };
        let Some(timestamp) = parse_lap_time(stamp) else {
            debug!("dropping lap line with bad timestamp: {stamp}");
            continue;
        };
        boundaries.push(LapBoundary { timestamp, lap });
    }
    boundaries.sort_by_key(|b| b.timestamp);
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn time(h: u32, m: u32, s: u32, ms: u32) -> NaiveTime {
        NaiveTime::from_hms_milli_opt(h, m, s, ms).unwrap()
    }

    #[test]
    fn parses_plain_and_fractional_times() {
        assert_eq!(parse_lap_time("00:10:00"), Some(time(0, 10, 0, 0)));
        assert_eq!(parse_lap_time("13:02:59.5"), Some(time(13, 2, 59, 500)));
        assert_eq!(parse_lap_time("13:02:59.50"), Some(time(13, 2, 59, 500)));
        assert_eq!(parse_lap_time("13:02:59.505"), Some(time(13, 2, 59, 505)));
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in [
            "",
            "13:02",
            "13-02-59",
            "13:02:59.",
            "13:02:59.1234",
            "13:02:59.ab",
            "25:00:00",
            "13:61:00",
            "1:02:03",
            "13:02:59 ",
            "aa:bb:cc",
        ] {
            assert_eq!(parse_lap_time(bad), None, "accepted {bad:?}");
        }
    }

    #[test]
    fn multibyte_characters_in_the_timestamp_are_rejected_not_fatal() {
        // 'é' is two bytes, the second landing at byte offset 8.
        assert_eq!(parse_lap_time("12:34:5é"), None);
        assert_eq!(parse_lap_time("12:34:56.é"), None);
        assert!(extract_lap_boundaries("12:34:5é{\"CurrentLap\": 3}\n").is_empty());
    }

    #[test]
    fn extracts_sorted_boundaries_and_drops_bad_lines() {
        let raw = concat!(
            "00:12:00.250{\"CurrentLap\": 2}\n",
            "\n",
            "00:10:00{\"CurrentLap\": 1}\n",
            "no braces here\n",
            "00:11:00{not json}\n",
            "00:13:00{\"TotalLaps\": 57}\n",
            "bad stamp{\"CurrentLap\": 9}\n",
        );
        let boundaries = extract_lap_boundaries(raw);
        assert_eq!(
            boundaries,
            vec![
                LapBoundary {
                    timestamp: time(0, 10, 0, 0),
                    lap: 1
                },
                LapBoundary {
                    timestamp: time(0, 12, 0, 250),
                    lap: 2
                },
            ]
        );
    }

    #[test]
    fn duplicate_timestamps_keep_parse_order() {
        let raw = "00:10:00{\"CurrentLap\": 3}\n00:10:00{\"CurrentLap\": 4}\n";
        let boundaries = extract_lap_boundaries(raw);
        assert_eq!(boundaries[0].lap, 3);
        assert_eq!(boundaries[1].lap, 4);
    }

    #[test]
    fn empty_or_unparseable_input_yields_empty_sequence() {
        assert!(extract_lap_boundaries("").is_empty());
        assert!(extract_lap_boundaries("garbage\nmore garbage\n").is_empty());
    }

    #[test]
    fn ms_of_day_has_millisecond_precision() {
        assert_eq!(ms_of_day(time(0, 0, 0, 1)), 1);
        assert_eq!(ms_of_day(time(1, 2, 3, 450)), 3_723_450);
    }

    proptest! {
        #[test]
        fn valid_times_parse_to_padded_millis(
            h in 0u32..24, m in 0u32..60, s in 0u32..60,
            frac in proptest::option::of("[0-9]{1,3}"),
        ) {
            let raw = match &frac {
                Some(f) => format!("{h:02}:{m:02}:{s:02}.{f}"),
                None => format!("{h:02}:{m:02}:{s:02}"),
            };
            let expected_ms: u32 = frac
                .map(|f| format!("{f:0<3}").parse().unwrap())
                .unwrap_or(0);
            let parsed = parse_lap_time(&raw).expect("valid time must parse");
            prop_assert_eq!(parsed, time(h, m, s, expected_ms));
        }

        #[test]
        fn arbitrary_strings_never_panic(raw in ".{0,16}") {
            let _ = parse_lap_time(&raw);
        }
    }
}
