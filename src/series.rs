//! Chart series construction.
//!
//! One chart per chart kind, one series per channel. A sample contributes a
//! point only when its reading for that channel exists, so missing data
//! shows up as a gap in the line instead of an interpolated value.

use crate::cardata::CarSample;

/// Static channel table: id, display name, unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub id: u32,
    pub name: &'static str,
    pub unit: &'static str,
}

pub const CHANNELS: [ChannelDescriptor; 6] = [
    ChannelDescriptor {
        id: 0,
        name: "RPM",
        unit: "rpm",
    },
    ChannelDescriptor {
        id: 2,
        name: "Speed",
        unit: "km/h",
    },
    ChannelDescriptor {
        id: 3,
        name: "Gear",
        unit: "",
    },
    ChannelDescriptor {
        id: 4,
        name: "Throttle",
        unit: "%",
    },
    ChannelDescriptor {
        id: 5,
        name: "Brake",
        unit: "%",
    },
    ChannelDescriptor {
        id: 45,
        name: "DRS",
        unit: "state",
    },
];

pub fn channel_descriptor(id: u32) -> Option<&'static ChannelDescriptor> {
    CHANNELS.iter().find(|c| c.id == id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Speed,
    Rpm,
    Gear,
    ThrottleBrake,
    Drs,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Speed,
        ChartKind::Rpm,
        ChartKind::Gear,
        ChartKind::ThrottleBrake,
        ChartKind::Drs,
    ];

    pub fn channels(&self) -> &'static [u32] {
        match self {
            ChartKind::Speed => &[2],
            ChartKind::Rpm => &[0],
            ChartKind::Gear => &[3],
            ChartKind::ThrottleBrake => &[4, 5],
            ChartKind::Drs => &[45],
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::Speed => "Speed",
            ChartKind::Rpm => "RPM",
            ChartKind::Gear => "Gear",
            ChartKind::ThrottleBrake => "Throttle/Brake",
            ChartKind::Drs => "DRS",
        }
    }

    /// Gear and DRS are discrete channels, drawn as stepped lines.
    pub fn stepped(&self) -> bool {
        matches!(self, ChartKind::Gear | ChartKind::Drs)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartSeries {
    pub channel: u32,
    pub name: &'static str,
    pub unit: &'static str,
    /// (x, y) points, absent readings skipped. Relative sample order is
    /// preserved.
    pub points: Vec<[f64; 2]>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BuiltChart {
    pub kind: ChartKind,
    pub series: Vec<ChartSeries>,
    /// The exact x sequence used for hover lookup on this chart: the first
    /// non-empty series' x column.
    pub xs: Vec<f64>,
    /// Fixed y range, or None for auto-range.
    pub y_range: Option<(f64, f64)>,
}

impl BuiltChart {
    /// Charts without a single valid point render a "no data" placeholder.
    pub fn has_data(&self) -> bool {
        self.series.iter().any(|s| !s.points.is_empty())
    }
}

fn y_range_for(kind: ChartKind, series: &[ChartSeries]) -> Option<(f64, f64)> {
    let observed = || {
        series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p[1]))
            .fold(None::<(f64, f64)>, |acc, y| match acc {
                None => Some((y, y)),
                Some((lo, hi)) => Some((lo.min(y), hi.max(y))),
            })
    };
    match kind {
        ChartKind::Gear => observed().map(|(lo, hi)| (lo - 0.5, hi + 0.5)),
        ChartKind::Drs => Some(match observed() {
            Some((lo, hi)) => (lo - 0.5, hi + 0.5),
            None => (-0.5, 2.5),
        }),
        ChartKind::ThrottleBrake => Some((-5.0, 105.0)),
        _ => None,
    }
}

/// Builds one chart for `kind` from mapped samples. `xs` must be the axis
/// mapping for the same samples, one x per sample.
pub fn build_chart(kind: ChartKind, samples: &[CarSample], xs: &[f64]) -> BuiltChart {
    let series: Vec<ChartSeries> = kind
        .channels()
        .iter()
        .map(|channel| {
            const UNKNOWN_CHANNEL: ChannelDescriptor = ChannelDescriptor {
                id: u32::MAX,
                name: "?",
                unit: "",
            };
            let descriptor = channel_descriptor(*channel).unwrap_or(&UNKNOWN_CHANNEL);
            ChartSeries {
                channel: *channel,
                name: descriptor.name,
                unit: descriptor.unit,
                points: samples
                    .iter()
                    .zip(xs.iter())
                    .filter_map(|(sample, x)| {
                        sample.channels.get(channel).map(|y| [*x, *y])
                    })
                    .collect(),
            }
        })
        .collect();
    let xs = series
        .iter()
        .find(|s| !s.points.is_empty())
        .map(|s| s.points.iter().map(|p| p[0]).collect())
        .unwrap_or_default();
    let y_range = y_range_for(kind, &series);
    BuiltChart {
        kind,
        series,
        xs,
        y_range,
    }
}

/// Builds the full chart stack for one data load.
pub fn build_charts(samples: &[CarSample], xs: &[f64]) -> Vec<BuiltChart> {
    ChartKind::ALL
        .iter()
        .map(|kind| build_chart(*kind, samples, xs))
        .collect()
}
