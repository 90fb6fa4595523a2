//! Axis mapping: wall-clock time or lap number per sample.
//!
//! Lap assignment is an interval search over the sorted boundary sequence.
//! Boundary timestamps carry no date, so samples are compared by their
//! millisecond-of-day. The mapper never emits a mixed series: any fault
//! degrades the whole mapping to the time domain with a flag the UI turns
//! into a warning.

use log::{debug, warn};

use crate::cardata::CarSample;
use crate::laps::{LapBoundary, ms_of_day};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisMode {
    Time,
    Lap,
}

/// The domain the mapping actually ended up in. Differs from the requested
/// mode only when the lap mapping degraded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisDomain {
    Time,
    Lap,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AxisMapping {
    pub domain: AxisDomain,
    /// One x value per sample: epoch milliseconds in the time domain, lap
    /// numbers in the lap domain.
    pub xs: Vec<f64>,
    pub degraded: bool,
}

fn time_xs(samples: &[CarSample]) -> Vec<f64> {
    samples
        .iter()
        .map(|s| s.utc.timestamp_millis() as f64)
        .collect()
}

fn assign_lap(sample_ms: i64, boundaries: &[LapBoundary]) -> u32 {
    for (i, boundary) in boundaries.iter().enumerate() {
        if sample_ms >= ms_of_day(boundary.timestamp) {
            let is_last = i + 1 == boundaries.len();
            if is_last || sample_ms < ms_of_day(boundaries[i + 1].timestamp) {
                return boundary.lap;
            }
        } else {
            // Before the first recorded boundary: out-lap / warm-up.
            return boundaries[0].lap.saturating_sub(1);
        }
    }
    // Unreachable with a sorted, non-empty boundary sequence; assign the
    // last known lap rather than crash on odd source data.
    debug!("sample at {sample_ms}ms fell through the boundary scan");
    boundaries[boundaries.len() - 1].lap
}

/// Pure function of its (sorted) inputs; mapping twice yields the same
/// output in either mode.
pub fn map_axis(samples: &[CarSample], boundaries: &[LapBoundary], mode: AxisMode) -> AxisMapping {
    match mode {
        AxisMode::Time => AxisMapping {
            domain: AxisDomain::Time,
            xs: time_xs(samples),
            degraded: false,
        },
        AxisMode::Lap => {
            if boundaries.is_empty() {
                warn!("no lap boundaries available, falling back to time axis");
                return AxisMapping {
                    domain: AxisDomain::Time,
                    xs: time_xs(samples),
                    degraded: true,
                };
            }
            let xs: Vec<f64> = samples
                .iter()
                .map(|s| assign_lap(ms_of_day(s.utc.time()), boundaries) as f64)
                .collect();
            if xs.len() != samples.len() {
                // Consistency fault: never render a partially mapped series.
                warn!(
                    "lap mapping produced {} x values for {} samples, reverting to time axis",
                    xs.len(),
                    samples.len()
                );
                return AxisMapping {
                    domain: AxisDomain::Time,
                    xs: time_xs(samples),
                    degraded: true,
                };
            }
            AxisMapping {
                domain: AxisDomain::Lap,
                xs,
                degraded: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn sample_at(h: u32, m: u32, s: u32) -> CarSample {
        CarSample {
            utc: Utc.with_ymd_and_hms(2025, 5, 25, h, m, s).unwrap(),
            channels: BTreeMap::new(),
        }
    }

    fn boundary(h: u32, m: u32, s: u32, lap: u32) -> LapBoundary {
        LapBoundary {
            timestamp: NaiveTime::from_hms_opt(h, m, s).unwrap(),
            lap,
        }
    }

    #[test]
    fn interval_assignment_matches_the_boundary_containing_the_sample() {
        let boundaries = vec![boundary(0, 10, 0, 1), boundary(0, 12, 0, 2)];
        let samples = vec![
            sample_at(0, 9, 0),  // before first boundary -> out-lap
            sample_at(0, 11, 0), // inside [10:00, 12:00)
            sample_at(0, 13, 0), // after last boundary
        ];
        let mapping = map_axis(&samples, &boundaries, AxisMode::Lap);
        assert_eq!(mapping.domain, AxisDomain::Lap);
        assert!(!mapping.degraded);
        assert_eq!(mapping.xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn out_lap_never_goes_below_zero() {
        let boundaries = vec![boundary(0, 10, 0, 0)];
        let mapping = map_axis(&[sample_at(0, 9, 0)], &boundaries, AxisMode::Lap);
        assert_eq!(mapping.xs, vec![0.0]);
    }

    #[test]
    fn boundary_start_is_inclusive_next_start_is_exclusive() {
        let boundaries = vec![boundary(0, 10, 0, 1), boundary(0, 12, 0, 2)];
        let on_first = map_axis(&[sample_at(0, 10, 0)], &boundaries, AxisMode::Lap);
        assert_eq!(on_first.xs, vec![1.0]);
        let on_second = map_axis(&[sample_at(0, 12, 0)], &boundaries, AxisMode::Lap);
        assert_eq!(on_second.xs, vec![2.0]);
    }

    #[test]
    fn time_mode_uses_epoch_millis() {
        let samples = vec![sample_at(13, 0, 1)];
        let mapping = map_axis(&samples, &[], AxisMode::Time);
        assert_eq!(mapping.domain, AxisDomain::Time);
        assert_eq!(mapping.xs[0], samples[0].utc.timestamp_millis() as f64);
        assert!(!mapping.degraded);
    }

    #[test]
    fn empty_boundaries_degrade_lap_mode_to_time() {
        let samples = vec![sample_at(13, 0, 1), sample_at(13, 0, 2)];
        let lap = map_axis(&samples, &[], AxisMode::Lap);
        let time = map_axis(&samples, &[], AxisMode::Time);
        assert_eq!(lap.domain, AxisDomain::Time);
        assert!(lap.degraded);
        assert_eq!(lap.xs, time.xs);
    }

    #[test]
    fn mapping_is_idempotent() {
        let boundaries = vec![boundary(0, 10, 0, 1), boundary(0, 12, 0, 2)];
        let samples = vec![sample_at(0, 9, 30), sample_at(0, 11, 59), sample_at(0, 12, 0)];
        for mode in [AxisMode::Time, AxisMode::Lap] {
            let first = map_axis(&samples, &boundaries, mode);
            let second = map_axis(&samples, &boundaries, mode);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn date_component_does_not_leak_into_lap_comparison() {
        // Boundaries are time-of-day only; a sample on any calendar date
        // must land in the interval its clock time falls in.
        let boundaries = vec![boundary(13, 0, 0, 10)];
        let mapping = map_axis(&[sample_at(13, 30, 0)], &boundaries, AxisMode::Lap);
        assert_eq!(mapping.xs, vec![10.0]);
    }

    proptest! {
        #[test]
        fn every_sample_lands_in_its_containing_interval(
            starts in proptest::collection::vec(0i64..86_000_000, 1..20),
            sample_ms in 0i64..86_000_000,
        ) {
            let mut starts = starts;
            starts.sort();
            starts.dedup();
            let boundaries: Vec<LapBoundary> = starts
                .iter()
                .enumerate()
                .map(|(i, ms)| LapBoundary {
                    timestamp: NaiveTime::from_num_seconds_from_midnight_opt(
                        (*ms / 1000) as u32,
                        ((*ms % 1000) * 1_000_000) as u32,
                    )
                    .unwrap(),
                    lap: i as u32 + 1,
                })
                .collect();
            let assigned = super::assign_lap(sample_ms, &boundaries);
            let expected = if sample_ms < starts[0] {
                boundaries[0].lap - 1
            } else {
                let idx = starts.iter().rposition(|s| sample_ms >= *s).unwrap();
                boundaries[idx].lap
            };
            prop_assert_eq!(assigned, expected);
        }
    }
}
