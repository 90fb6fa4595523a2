use chrono::{NaiveTime, TimeZone, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::collections::BTreeMap;

use pitview::axis::{AxisMode, map_axis};
use pitview::cardata::CarSample;
use pitview::laps::LapBoundary;

fn sample_session(samples: usize, laps: usize) -> (Vec<CarSample>, Vec<LapBoundary>) {
    // ~4 samples/second from 13:00:00, 90-second laps.
    let start = Utc.with_ymd_and_hms(2025, 5, 25, 13, 0, 0).unwrap();
    let samples: Vec<CarSample> = (0..samples)
        .map(|i| CarSample {
            utc: start + chrono::Duration::milliseconds(i as i64 * 250),
            channels: BTreeMap::from([(2, 200.0 + (i % 120) as f64)]),
        })
        .collect();
    let boundaries: Vec<LapBoundary> = (0..laps)
        .map(|lap| LapBoundary {
            timestamp: NaiveTime::from_num_seconds_from_midnight_opt(
                13 * 3600 + lap as u32 * 90,
                0,
            )
            .unwrap(),
            lap: lap as u32 + 1,
        })
        .collect();
    (samples, boundaries)
}

fn bench_axis_mapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("axis_mapping");

    let (samples, boundaries) = sample_session(10_000, 60);

    group.bench_function("map_10k_samples_time", |b| {
        b.iter(|| black_box(map_axis(&samples, &boundaries, AxisMode::Time)));
    });

    group.bench_function("map_10k_samples_60_laps", |b| {
        b.iter(|| black_box(map_axis(&samples, &boundaries, AxisMode::Lap)));
    });

    group.finish();
}

criterion_group!(benches, bench_axis_mapping);
criterion_main!(benches);
