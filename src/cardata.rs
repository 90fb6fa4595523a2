//! Telemetry stream decoder.
//!
//! CarData.jsonl carries one self-contained JSON record per line; each record
//! nests per-car channel readings keyed by racing number. Decoding selects a
//! single car and flattens its readings into time-ordered samples. Malformed
//! lines are dropped, only a whole-document failure aborts a load.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;

/// One reporting event for one car. Channel readings may be absent for any
/// given sample; null and non-numeric readings are dropped at decode.
#[derive(Clone, Debug, PartialEq)]
pub struct CarSample {
    pub utc: DateTime<Utc>,
    pub channels: BTreeMap<u32, f64>,
}

#[derive(Deserialize)]
struct CarDataLine {
    data: CarDataPayload,
}

#[derive(Deserialize)]
struct CarDataPayload {
    #[serde(rename = "Entries", default)]
    entries: Vec<CarDataEntry>,
}

#[derive(Deserialize)]
struct CarDataEntry {
    #[serde(rename = "Utc")]
    utc: DateTime<Utc>,
    #[serde(rename = "Cars", default)]
    cars: HashMap<String, CarChannels>,
}

#[derive(Deserialize)]
struct CarChannels {
    #[serde(rename = "Channels", default)]
    channels: BTreeMap<u32, serde_json::Value>,
}

/// Decodes every sample for `racing_number`, sorted ascending by UTC. The
/// source claims to be time ordered, but that is not trusted.
pub fn decode_car_stream(raw: &str, racing_number: &str) -> Vec<CarSample> {
    let mut samples = Vec::new();
    let mut dropped = 0usize;
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: CarDataLine = match serde_json::from_str(line) {
            Ok(p) => p,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        for entry in parsed.data.entries {
            if let Some(car) = entry.cars.get(racing_number) {
                let channels = car
                    .channels
                    .iter()
                    .filter_map(|(id, value)| value.as_f64().map(|v| (*id, v)))
                    .collect();
                samples.push(CarSample {
                    utc: entry.utc,
                    channels,
                });
            }
        }
    }
    if dropped > 0 {
        debug!("dropped {dropped} malformed telemetry lines");
    }
    samples.sort_by_key(|s| s.utc);
    samples
}
